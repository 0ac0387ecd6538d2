mod postgres;
mod sqlite;

pub use postgres::{PgStore, PgVoteTransaction};
pub use sqlite::{SqliteStore, SqliteVoteTransaction};

use crate::error::Result;
use crate::models::{ChatId, GameId, SessionSettings, UserId, Vote, VoteTarget};
use async_trait::async_trait;

pub type VoteId = i64;

#[async_trait]
pub trait VoteStore: Send + Sync {
    type Tx: VoteTransaction;

    // Whether `find_vote(.., lock = true)` serializes casts by the same user in the
    // same poll. When false the store must serialize writers itself (SQLite opens
    // every cast with BEGIN IMMEDIATE).
    fn supports_row_locking(&self) -> bool;

    async fn begin(&self) -> Result<Self::Tx>;

    async fn poll_votes(&self, poll_id: &str) -> Result<Vec<Vote>>;

    async fn starred_users(&self, game_id: GameId) -> Result<Vec<UserId>>;

    async fn session_settings(&self, chat_id: ChatId) -> Result<Option<SessionSettings>>;
}

// Dropping it without `commit` rolls everything back.
#[async_trait]
pub trait VoteTransaction: Send {
    async fn find_vote(
        &mut self,
        poll_id: &str,
        user_id: UserId,
        target: VoteTarget,
        lock: bool,
    ) -> Result<Option<VoteId>>;

    // Game and category votes alike.
    async fn count_user_votes(&mut self, poll_id: &str, user_id: UserId) -> Result<i64>;

    async fn insert_vote(&mut self, vote: &Vote) -> Result<()>;

    async fn delete_vote(&mut self, vote_id: VoteId) -> Result<()>;

    async fn commit(self) -> Result<()>;
}

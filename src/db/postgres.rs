use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};

use super::{VoteId, VoteStore, VoteTransaction};
use crate::error::Result;
use crate::models::{
    ChatId, GameId, GameState, SessionSettings, UserId, Vote, VoteKind, VoteLimit, VoteTarget,
};

// Postgres store. A locked existence check first takes a transaction-scoped
// advisory lock on (poll, user), then locks any matching vote row, so casts by
// the same user run one after another and the limit count stays accurate.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(pool: &PgPool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                chat_id BIGINT PRIMARY KEY,
                settings_weighted BOOLEAN NOT NULL DEFAULT FALSE,
                vote_limit TEXT NOT NULL DEFAULT 'auto'
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection (
                user_id BIGINT NOT NULL,
                game_id BIGINT NOT NULL,
                state TEXT NOT NULL DEFAULT 'included',
                PRIMARY KEY (user_id, game_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_votes (
                id BIGSERIAL PRIMARY KEY,
                poll_id TEXT NOT NULL,
                user_id BIGINT NOT NULL,
                vote_type TEXT NOT NULL,
                game_id BIGINT,
                category_level BIGINT,
                user_name TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS ux_poll_votes_game
            ON poll_votes (poll_id, user_id, game_id) WHERE vote_type = 'game'
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS ux_poll_votes_category
            ON poll_votes (poll_id, user_id, category_level) WHERE vote_type = 'category'
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn save_session_settings(&self, settings: &SessionSettings) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (chat_id, settings_weighted, vote_limit)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id)
            DO UPDATE SET
                settings_weighted = EXCLUDED.settings_weighted,
                vote_limit = EXCLUDED.vote_limit
            "#,
        )
        .bind(settings.chat_id)
        .bind(settings.weighted)
        .bind(settings.vote_limit.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_collection_state(
        &self,
        user_id: UserId,
        game_id: GameId,
        state: GameState,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collection (user_id, game_id, state)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, game_id)
            DO UPDATE SET state = EXCLUDED.state
            "#,
        )
        .bind(user_id)
        .bind(game_id)
        .bind(state.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn vote_from_row(row: &PgRow) -> Result<Vote> {
    let id: i64 = row.get("id");
    let kind: VoteKind = row.get::<String, _>("vote_type").parse()?;
    let target =
        VoteTarget::from_columns(id, kind, row.get("game_id"), row.get("category_level"))?;

    Ok(Vote {
        poll_id: row.get("poll_id"),
        user_id: row.get("user_id"),
        target,
        user_name: row.get("user_name"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

// Held until commit or rollback. Keyed on the poll id, seeded with the user id.
const USER_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, $2))";

fn find_vote_sql(target: VoteTarget, lock: bool) -> String {
    let column = match target {
        VoteTarget::Game(_) => "game_id",
        VoteTarget::Category(_) => "category_level",
    };
    format!(
        "SELECT id FROM poll_votes \
         WHERE poll_id = $1 AND user_id = $2 AND vote_type = $3 AND {} = $4{}",
        column,
        if lock { " FOR UPDATE" } else { "" }
    )
}

#[async_trait]
impl VoteStore for PgStore {
    type Tx = PgVoteTransaction;

    fn supports_row_locking(&self) -> bool {
        true
    }

    async fn begin(&self) -> Result<Self::Tx> {
        Ok(PgVoteTransaction { tx: self.pool.begin().await? })
    }

    async fn poll_votes(&self, poll_id: &str) -> Result<Vec<Vote>> {
        sqlx::query(
            r#"
            SELECT id, poll_id, user_id, vote_type, game_id, category_level, user_name, created_at
            FROM poll_votes
            WHERE poll_id = $1
            ORDER BY id
            "#,
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(vote_from_row)
        .collect()
    }

    async fn starred_users(&self, game_id: GameId) -> Result<Vec<UserId>> {
        let users = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM collection WHERE game_id = $1 AND state = $2 ORDER BY user_id",
        )
        .bind(game_id)
        .bind(GameState::Starred.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn session_settings(&self, chat_id: ChatId) -> Result<Option<SessionSettings>> {
        let row =
            sqlx::query("SELECT settings_weighted, vote_limit FROM sessions WHERE chat_id = $1")
                .bind(chat_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(Some(SessionSettings {
                chat_id,
                weighted: row.get("settings_weighted"),
                vote_limit: row.get::<String, _>("vote_limit").parse::<VoteLimit>()?,
            })),
            None => Ok(None),
        }
    }
}

pub struct PgVoteTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl VoteTransaction for PgVoteTransaction {
    async fn find_vote(
        &mut self,
        poll_id: &str,
        user_id: UserId,
        target: VoteTarget,
        lock: bool,
    ) -> Result<Option<VoteId>> {
        if lock {
            // FOR UPDATE alone only covers rows that already exist; the limit check
            // also needs casts to different targets to wait for each other.
            sqlx::query(USER_LOCK_SQL)
                .bind(poll_id)
                .bind(user_id)
                .execute(&mut *self.tx)
                .await?;
        }

        let value = match target {
            VoteTarget::Game(id) => id,
            VoteTarget::Category(level) => level,
        };
        let id = sqlx::query_scalar::<_, i64>(&find_vote_sql(target, lock))
            .bind(poll_id)
            .bind(user_id)
            .bind(target.kind().as_str())
            .bind(value)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn count_user_votes(&mut self, poll_id: &str, user_id: UserId) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM poll_votes WHERE poll_id = $1 AND user_id = $2",
        )
        .bind(poll_id)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn insert_vote(&mut self, vote: &Vote) -> Result<()> {
        let (game_id, category_level) = vote.target.columns();
        sqlx::query(
            r#"
            INSERT INTO poll_votes
                (poll_id, user_id, vote_type, game_id, category_level, user_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&vote.poll_id)
        .bind(vote.user_id)
        .bind(vote.target.kind().as_str())
        .bind(game_id)
        .bind(category_level)
        .bind(&vote.user_name)
        .bind(vote.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_vote(&mut self, vote_id: VoteId) -> Result<()> {
        sqlx::query("DELETE FROM poll_votes WHERE id = $1")
            .bind(vote_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, Transaction};

use super::{VoteId, VoteStore, VoteTransaction};
use crate::error::Result;
use crate::models::{
    ChatId, GameId, GameState, SessionSettings, UserId, Vote, VoteKind, VoteLimit, VoteTarget,
};

// SQLite store. No row locks, so every cast takes the database write lock when it
// begins (BEGIN IMMEDIATE) and concurrent casts queue on the busy timeout.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            info!("Creating SQLite database at {}", db_url);
            Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(db_url)
            .await?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    // A private in-memory database, gone when the store is dropped. Used by tests.
    pub async fn in_memory() -> Result<Self> {
        // A second connection would open a second, empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                chat_id INTEGER PRIMARY KEY,
                settings_weighted BOOLEAN NOT NULL DEFAULT FALSE,
                vote_limit TEXT NOT NULL DEFAULT 'auto'
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collection (
                user_id INTEGER NOT NULL,
                game_id INTEGER NOT NULL,
                state TEXT NOT NULL DEFAULT 'included',
                PRIMARY KEY (user_id, game_id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS poll_votes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                poll_id TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                vote_type TEXT NOT NULL,
                game_id INTEGER,
                category_level INTEGER,
                user_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS ux_poll_votes_game
            ON poll_votes (poll_id, user_id, game_id) WHERE vote_type = 'game';
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS ux_poll_votes_category
            ON poll_votes (poll_id, user_id, category_level) WHERE vote_type = 'category';
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
            VALUES (?, ?, ?)
            ON CONFLICT(chat_id)
            DO UPDATE SET
                settings_weighted = excluded.settings_weighted,
                vote_limit = excluded.vote_limit
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
            VALUES (?, ?, ?)
            ON CONFLICT(user_id, game_id)
            DO UPDATE SET state = excluded.state
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

fn vote_from_row(row: &SqliteRow) -> Result<Vote> {
    let id: i64 = row.get("id");
    let kind: VoteKind = row.get::<String, _>("vote_type").parse()?;
    let target =
        VoteTarget::from_columns(id, kind, row.get("game_id"), row.get("category_level"))?;
    let created_at = DateTime::parse_from_rfc3339(&row.get::<String, _>("created_at"))?
        .with_timezone(&Utc);

    Ok(Vote {
        poll_id: row.get("poll_id"),
        user_id: row.get("user_id"),
        target,
        user_name: row.get("user_name"),
        created_at,
    })
}

// Existence check for one (poll, user, kind, target) vote.
fn find_vote_sql(target: VoteTarget) -> String {
    let column = match target {
        VoteTarget::Game(_) => "game_id",
        VoteTarget::Category(_) => "category_level",
    };
    format!(
        "SELECT id FROM poll_votes \
         WHERE poll_id = ? AND user_id = ? AND vote_type = ? AND {} = ?",
        column
    )
}

#[async_trait]
impl VoteStore for SqliteStore {
    type Tx = SqliteVoteTransaction;

    fn supports_row_locking(&self) -> bool {
        false
    }

    async fn begin(&self) -> Result<Self::Tx> {
        // Take the write lock up front. A deferred transaction that reads first and
        // writes later fails with SQLITE_BUSY instead of waiting when casts overlap.
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(SqliteVoteTransaction { tx })
    }

    async fn poll_votes(&self, poll_id: &str) -> Result<Vec<Vote>> {
        sqlx::query(
            r#"
            SELECT id, poll_id, user_id, vote_type, game_id, category_level, user_name, created_at
            FROM poll_votes
            WHERE poll_id = ?
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
            "SELECT user_id FROM collection WHERE game_id = ? AND state = ? ORDER BY user_id",
        )
        .bind(game_id)
        .bind(GameState::Starred.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn session_settings(&self, chat_id: ChatId) -> Result<Option<SessionSettings>> {
        let row =
            sqlx::query("SELECT settings_weighted, vote_limit FROM sessions WHERE chat_id = ?")
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

pub struct SqliteVoteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl VoteTransaction for SqliteVoteTransaction {
    async fn find_vote(
        &mut self,
        poll_id: &str,
        user_id: UserId,
        target: VoteTarget,
        lock: bool,
    ) -> Result<Option<VoteId>> {
        if lock {
            // No row locks here; BEGIN IMMEDIATE already holds the write lock.
            debug!("Row lock requested on SQLite; ignoring");
        }

        let value = match target {
            VoteTarget::Game(id) => id,
            VoteTarget::Category(level) => level,
        };
        let id = sqlx::query_scalar::<_, i64>(&find_vote_sql(target))
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
            "SELECT COUNT(*) FROM poll_votes WHERE poll_id = ? AND user_id = ?",
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
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vote.poll_id)
        .bind(vote.user_id)
        .bind(vote.target.kind().as_str())
        .bind(game_id)
        .bind(category_level)
        .bind(&vote.user_name)
        .bind(vote.created_at.to_rfc3339())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_vote(&mut self, vote_id: VoteId) -> Result<()> {
        sqlx::query("DELETE FROM poll_votes WHERE id = ?")
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

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unknown vote type: {0}")]
    UnknownVoteKind(String),

    #[error("vote {0} has no game or category target")]
    MissingTarget(i64),

    #[error("invalid vote limit: {0} (expected auto, unlimited or a positive number)")]
    InvalidVoteLimit(String),

    #[error("unknown collection state: {0}")]
    UnknownGameState(String),

    #[error("failed to parse timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("unsupported database url: {0}")]
    UnsupportedDatabase(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// Game night voting: vote casting with per-poll limits, category votes that
// resolve to a shared random game, and weighted winner selection.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod voting;

pub use error::{Error, Result};
pub use models::{Game, VoteLimit, VoteOutcome, VoteTarget};
pub use service::{cast_or_toggle_vote, close_poll, close_poll_with};
pub use voting::PollResults;

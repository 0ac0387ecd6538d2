use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type GameId = i64;
pub type UserId = i64;
pub type ChatId = i64;
pub type CategoryLevel = i64;

// A game on a poll's candidate list. Immutable for the lifetime of the poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub complexity_level: CategoryLevel,
    pub base_max_players: i32,
    // Expansion-adjusted values supplied by the caller. Not used in scoring.
    pub effective_max_players: Option<i32>,
    pub effective_complexity: Option<f64>,
}

impl Game {
    pub fn new(
        id: GameId,
        name: impl Into<String>,
        complexity_level: CategoryLevel,
        base_max_players: i32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            complexity_level,
            base_max_players,
            effective_max_players: None,
            effective_complexity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteKind {
    Game,
    Category,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Game => "game",
            VoteKind::Category => "category",
        }
    }
}

impl FromStr for VoteKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "game" => Ok(VoteKind::Game),
            "category" => Ok(VoteKind::Category),
            other => Err(Error::UnknownVoteKind(other.to_string())),
        }
    }
}

// What a vote points at: a concrete game, or "any game" of a complexity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteTarget {
    Game(GameId),
    Category(CategoryLevel),
}

impl VoteTarget {
    pub fn kind(&self) -> VoteKind {
        match self {
            VoteTarget::Game(_) => VoteKind::Game,
            VoteTarget::Category(_) => VoteKind::Category,
        }
    }

    // Splits the target into its `(game_id, category_level)` storage columns.
    pub fn columns(&self) -> (Option<GameId>, Option<CategoryLevel>) {
        match *self {
            VoteTarget::Game(id) => (Some(id), None),
            VoteTarget::Category(level) => (None, Some(level)),
        }
    }

    pub fn from_columns(
        vote_id: i64,
        kind: VoteKind,
        game_id: Option<GameId>,
        category_level: Option<CategoryLevel>,
    ) -> Result<Self, Error> {
        match (kind, game_id, category_level) {
            (VoteKind::Game, Some(id), _) => Ok(VoteTarget::Game(id)),
            (VoteKind::Category, _, Some(level)) => Ok(VoteTarget::Category(level)),
            _ => Err(Error::MissingTarget(vote_id)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub poll_id: String,
    pub user_id: UserId,
    pub target: VoteTarget,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(poll_id: &str, user_id: UserId, target: VoteTarget, user_name: &str) -> Self {
        Self {
            poll_id: poll_id.to_string(),
            user_id,
            target,
            user_name: user_name.to_string(),
            created_at: Utc::now(),
        }
    }
}

// A vote flattened to the concrete game it ends up backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedVote {
    pub game_id: GameId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteLimit {
    Fixed(u32),
    Unlimited,
    #[default]
    Auto,
}

impl fmt::Display for VoteLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteLimit::Fixed(n) => write!(f, "{}", n),
            VoteLimit::Unlimited => f.write_str("unlimited"),
            VoteLimit::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for VoteLimit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(VoteLimit::Auto),
            "unlimited" => Ok(VoteLimit::Unlimited),
            other => match other.parse::<u32>() {
                Ok(n) if n > 0 => Ok(VoteLimit::Fixed(n)),
                _ => Err(Error::InvalidVoteLimit(s.to_string())),
            },
        }
    }
}

// Per-chat settings that shape how a poll is run and closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub chat_id: ChatId,
    pub weighted: bool,
    pub vote_limit: VoteLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Included,
    Excluded,
    Starred,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameState::Included => "included",
            GameState::Excluded => "excluded",
            GameState::Starred => "starred",
        }
    }
}

impl FromStr for GameState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "included" => Ok(GameState::Included),
            "excluded" => Ok(GameState::Excluded),
            "starred" => Ok(GameState::Starred),
            other => Err(Error::UnknownGameState(other.to_string())),
        }
    }
}

// Result of a cast or toggle. A rejected cast is `success == false`, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub success: bool,
    pub message: String,
    pub is_removal: bool,
}

impl VoteOutcome {
    pub fn recorded(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), is_removal: false }
    }

    pub fn removed() -> Self {
        Self { success: true, message: "Vote removed".to_string(), is_removal: true }
    }

    pub fn limit_reached(current: i64, limit: u32) -> Self {
        Self {
            success: false,
            message: format!("Vote limit reached ({}/{}). Remove a vote first!", current, limit),
            is_removal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_limit_parses_text_forms() {
        assert_eq!("auto".parse::<VoteLimit>().unwrap(), VoteLimit::Auto);
        assert_eq!("Unlimited".parse::<VoteLimit>().unwrap(), VoteLimit::Unlimited);
        assert_eq!(" 4 ".parse::<VoteLimit>().unwrap(), VoteLimit::Fixed(4));
        assert!("0".parse::<VoteLimit>().is_err());
        assert!("-2".parse::<VoteLimit>().is_err());
        assert!("lots".parse::<VoteLimit>().is_err());
    }

    #[test]
    fn vote_limit_display_parses_back() {
        for limit in [VoteLimit::Auto, VoteLimit::Unlimited, VoteLimit::Fixed(7)] {
            assert_eq!(limit.to_string().parse::<VoteLimit>().unwrap(), limit);
        }
    }

    #[test]
    fn target_columns_require_matching_kind() {
        assert_eq!(
            VoteTarget::from_columns(1, VoteKind::Category, None, Some(2)).unwrap(),
            VoteTarget::Category(2)
        );
        assert!(matches!(
            VoteTarget::from_columns(9, VoteKind::Game, None, Some(2)),
            Err(Error::MissingTarget(9))
        ));
    }
}

pub mod category;
pub mod limit;
pub mod plurality;
pub mod weighting;

use crate::models::GameId;
use std::collections::HashMap;

// Outcome of closing a poll
#[derive(Debug, Clone)]
pub struct PollResults {
    pub winners: Vec<String>,           // Names of every game on the top score
    pub winner_ids: Vec<GameId>,        // Same games, candidate order
    pub scores: HashMap<GameId, f64>,   // Final score for every candidate
    pub modifiers: Vec<String>,         // One line per weighting adjustment
    pub total_voters: usize,            // Distinct users behind the resolved votes
    pub raw_results: String,            // JSON [name, score] pairs, highest first
}

use crate::models::{CategoryLevel, Game, GameId, ResolvedVote, Vote, VoteTarget};
use log::{debug, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::{HashMap, HashSet};

pub fn group_games_by_complexity(games: &[Game]) -> HashMap<CategoryLevel, Vec<&Game>> {
    let mut groups: HashMap<CategoryLevel, Vec<&Game>> = HashMap::new();
    for game in games {
        groups.entry(game.complexity_level).or_default().push(game);
    }
    groups
}

// Flattens game and category votes into `(game, user)` pairs.
//
// Each category level is resolved to one random game from that level the first
// time it is seen, and every voter of that category backs the same game for the
// rest of this call. Category votes for a level with no candidate games are
// dropped, as are game votes for games not on the candidate list.
pub fn resolve_category_votes<R: Rng + ?Sized>(
    votes: &[Vote],
    games: &[Game],
    rng: &mut R,
) -> Vec<ResolvedVote> {
    let groups = group_games_by_complexity(games);
    let candidates: HashSet<GameId> = games.iter().map(|g| g.id).collect();

    // None marks a level we already found empty.
    let mut resolutions: HashMap<CategoryLevel, Option<GameId>> = HashMap::new();
    let mut resolved = Vec::with_capacity(votes.len());

    for vote in votes {
        let game_id = match vote.target {
            VoteTarget::Game(id) => {
                if !candidates.contains(&id) {
                    warn!(
                        "Dropping vote by {} in poll {}: game {} is not a candidate",
                        vote.user_id, vote.poll_id, id
                    );
                    continue;
                }
                id
            }
            VoteTarget::Category(level) => {
                let choice = *resolutions.entry(level).or_insert_with(|| {
                    let pick = groups
                        .get(&level)
                        .and_then(|group| group.choose(&mut *rng))
                        .map(|game| game.id);
                    match pick {
                        Some(id) => debug!("Category {} resolved to game {}", level, id),
                        None => warn!(
                            "Category {} has no candidate games in poll {}; dropping its votes",
                            level, vote.poll_id
                        ),
                    }
                    pick
                });
                match choice {
                    Some(id) => id,
                    None => continue,
                }
            }
        };

        resolved.push(ResolvedVote { game_id, user_id: vote.user_id });
    }

    resolved
}

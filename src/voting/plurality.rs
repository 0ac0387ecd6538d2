use crate::models::{Game, GameId, ResolvedVote, UserId};
use crate::voting::weighting::WeightingPolicy;
use crate::voting::PollResults;
use std::collections::{HashMap, HashSet};

// Counts one point per resolved vote and picks every game on the top score.
//
// `star_collections` is `Some` only for weighted polls; priority games then go
// through `policy`. Non-priority games keep their raw count.
pub fn calculate_poll_winner(
    games: &[Game],
    votes: &[ResolvedVote],
    priority_ids: &HashSet<GameId>,
    star_collections: Option<&HashMap<GameId, Vec<UserId>>>,
    policy: &dyn WeightingPolicy,
) -> PollResults {
    // Every candidate starts at zero so the map covers the whole poll.
    let mut scores: HashMap<GameId, f64> = games.iter().map(|g| (g.id, 0.0)).collect();

    for vote in votes {
        if let Some(score) = scores.get_mut(&vote.game_id) {
            *score += 1.0;
        }
    }

    let total_voters = votes
        .iter()
        .map(|v| v.user_id)
        .collect::<HashSet<UserId>>()
        .len();

    let mut modifiers = Vec::new();
    if let Some(collections) = star_collections {
        for game in games.iter().filter(|g| priority_ids.contains(&g.id)) {
            let starring = collections.get(&game.id).map(Vec::as_slice).unwrap_or(&[]);
            let raw = scores[&game.id];
            let adjustment = policy.adjust(&game.name, raw, starring, total_voters);
            scores.insert(game.id, adjustment.score);
            if let Some(line) = adjustment.log {
                modifiers.push(line);
            }
        }
    }

    let top_score = scores.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let winners: Vec<&Game> = games.iter().filter(|g| scores[&g.id] == top_score).collect();

    // Highest first; ties keep candidate order.
    let mut sorted: Vec<(String, f64)> = games
        .iter()
        .map(|g| (g.name.clone(), scores[&g.id]))
        .collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    PollResults {
        winners: winners.iter().map(|g| g.name.clone()).collect(),
        winner_ids: winners.iter().map(|g| g.id).collect(),
        scores,
        modifiers,
        total_voters,
        raw_results: serde_json::to_string(&sorted).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::weighting::StarBonus;

    fn games() -> Vec<Game> {
        vec![
            Game::new(1, "Catan", 1, 4),
            Game::new(2, "Wingspan", 1, 5),
            Game::new(3, "Gloomhaven", 3, 4),
        ]
    }

    fn votes(pairs: &[(GameId, UserId)]) -> Vec<ResolvedVote> {
        pairs
            .iter()
            .map(|&(game_id, user_id)| ResolvedVote { game_id, user_id })
            .collect()
    }

    #[test]
    fn most_votes_wins() {
        let votes = votes(&[(1, 1), (1, 2), (3, 3)]);
        let results =
            calculate_poll_winner(&games(), &votes, &HashSet::new(), None, &StarBonus::default());

        assert_eq!(results.winners, vec!["Catan".to_string()]);
        assert_eq!(results.winner_ids, vec![1]);
        assert_eq!(results.scores[&1], 2.0);
        assert_eq!(results.scores[&2], 0.0);
        assert_eq!(results.scores[&3], 1.0);
        assert_eq!(results.total_voters, 3);
        assert!(results.modifiers.is_empty());
    }

    #[test]
    fn ties_produce_every_top_game() {
        let votes = votes(&[(1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3), (3, 4)]);
        let results =
            calculate_poll_winner(&games(), &votes, &HashSet::new(), None, &StarBonus::default());

        assert_eq!(results.winners, vec!["Catan".to_string(), "Wingspan".to_string()]);
        assert_eq!(results.scores[&3], 1.0);
    }

    #[test]
    fn no_votes_ties_everything() {
        let results =
            calculate_poll_winner(&games(), &[], &HashSet::new(), None, &StarBonus::default());
        assert_eq!(results.winners.len(), 3);
        assert_eq!(results.scores.len(), 3);
        assert_eq!(results.total_voters, 0);
    }

    #[test]
    fn no_candidates_no_winner() {
        let results = calculate_poll_winner(&[], &[], &HashSet::new(), None, &StarBonus::default());
        assert!(results.winners.is_empty());
        assert!(results.scores.is_empty());
        assert_eq!(results.raw_results, "[]");
    }

    #[test]
    fn weighted_boosts_starred_priority_game_without_votes() {
        let votes = votes(&[(1, 1)]);
        let priority: HashSet<GameId> = [3].into_iter().collect();
        let stars: HashMap<GameId, Vec<UserId>> = [(3, vec![1, 2, 5])].into_iter().collect();

        let results = calculate_poll_winner(
            &games(),
            &votes,
            &priority,
            Some(&stars),
            &StarBonus::default(),
        );

        assert_eq!(results.scores[&3], 1.5);
        assert_eq!(results.scores[&1], 1.0);
        assert_eq!(results.winners, vec!["Gloomhaven".to_string()]);
        assert_eq!(results.modifiers.len(), 1);
        assert!(results.modifiers[0].contains("Gloomhaven"));
    }

    #[test]
    fn non_priority_games_are_not_weighted() {
        let votes = votes(&[(1, 1)]);
        // Stars exist for Wingspan, but it is not a priority game.
        let stars: HashMap<GameId, Vec<UserId>> = [(2, vec![1, 2])].into_iter().collect();

        let results = calculate_poll_winner(
            &games(),
            &votes,
            &HashSet::new(),
            Some(&stars),
            &StarBonus::default(),
        );

        assert_eq!(results.scores[&2], 0.0);
        assert!(results.modifiers.is_empty());
    }

    #[test]
    fn unweighted_ignores_priority() {
        let votes = votes(&[(1, 1)]);
        let priority: HashSet<GameId> = [2].into_iter().collect();
        let results =
            calculate_poll_winner(&games(), &votes, &priority, None, &StarBonus::default());

        assert_eq!(results.scores[&2], 0.0);
        assert_eq!(results.winners, vec!["Catan".to_string()]);
    }

    #[test]
    fn raw_results_are_sorted_by_score() {
        let votes = votes(&[(3, 1), (3, 2), (2, 3)]);
        let results =
            calculate_poll_winner(&games(), &votes, &HashSet::new(), None, &StarBonus::default());

        let parsed: Vec<(String, f64)> = serde_json::from_str(&results.raw_results).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("Gloomhaven".to_string(), 2.0),
                ("Wingspan".to_string(), 1.0),
                ("Catan".to_string(), 0.0),
            ]
        );
    }
}

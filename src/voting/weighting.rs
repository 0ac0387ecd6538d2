use crate::models::UserId;

// Adjusted score for one priority game, plus the line explaining the change.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    pub score: f64,
    pub log: Option<String>,
}

// How starred ("priority") games are boosted when a chat runs weighted polls.
pub trait WeightingPolicy: Send + Sync {
    fn adjust(
        &self,
        game_name: &str,
        raw_score: f64,
        starring_users: &[UserId],
        total_voters: usize,
    ) -> Adjustment;
}

// Adds a flat bonus for every user who starred the game.
#[derive(Debug, Clone, Copy)]
pub struct StarBonus {
    pub per_star: f64,
}

impl Default for StarBonus {
    fn default() -> Self {
        Self { per_star: 0.5 }
    }
}

impl WeightingPolicy for StarBonus {
    fn adjust(
        &self,
        game_name: &str,
        raw_score: f64,
        starring_users: &[UserId],
        total_voters: usize,
    ) -> Adjustment {
        if starring_users.is_empty() {
            return Adjustment { score: raw_score, log: None };
        }

        let bonus = self.per_star * starring_users.len() as f64;
        let score = raw_score + bonus;
        let log = format!(
            "⭐ {}: {:.1} → {:.1} (+{:.1} from {} star(s), {} voter(s))",
            game_name,
            raw_score,
            score,
            bonus,
            starring_users.len(),
            total_voters
        );
        Adjustment { score, log: Some(log) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_stars_leaves_score_alone() {
        let adjustment = StarBonus::default().adjust("Catan", 2.0, &[], 4);
        assert_eq!(adjustment, Adjustment { score: 2.0, log: None });
    }

    #[test]
    fn each_star_adds_a_bonus() {
        let adjustment = StarBonus::default().adjust("Catan", 1.0, &[10, 11], 3);
        assert_eq!(adjustment.score, 2.0);
        let log = adjustment.log.unwrap();
        assert!(log.contains("Catan"));
        assert!(log.contains("2 star(s)"));
    }

    #[test]
    fn zero_votes_still_get_the_bonus() {
        let adjustment = StarBonus { per_star: 1.5 }.adjust("Azul", 0.0, &[7], 0);
        assert_eq!(adjustment.score, 1.5);
        assert!(adjustment.log.is_some());
    }
}

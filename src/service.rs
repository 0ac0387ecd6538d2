use log::{debug, info};
use std::collections::{HashMap, HashSet};

use crate::db::{VoteStore, VoteTransaction};
use crate::error::Result;
use crate::models::{ChatId, Game, GameId, UserId, Vote, VoteLimit, VoteOutcome, VoteTarget};
use crate::voting::PollResults;
use crate::voting::category::resolve_category_votes;
use crate::voting::limit::effective_limit;
use crate::voting::plurality::calculate_poll_winner;
use crate::voting::weighting::{StarBonus, WeightingPolicy};

// Removing a held vote is always allowed; a new one is refused at the limit.
// Nothing is written unless the transaction commits.
pub async fn cast_or_toggle_vote<S: VoteStore>(
    store: &S,
    poll_id: &str,
    user_id: UserId,
    target: VoteTarget,
    user_name: &str,
    vote_limit: VoteLimit,
    candidate_count: usize,
) -> Result<VoteOutcome> {
    let mut tx = store.begin().await?;

    let existing = tx
        .find_vote(poll_id, user_id, target, store.supports_row_locking())
        .await?;
    if let Some(vote_id) = existing {
        tx.delete_vote(vote_id).await?;
        tx.commit().await?;
        debug!("User {} removed {:?} vote in poll {}", user_id, target, poll_id);
        return Ok(VoteOutcome::removed());
    }

    if let Some(limit) = effective_limit(vote_limit, candidate_count) {
        let current = tx.count_user_votes(poll_id, user_id).await?;
        if current >= i64::from(limit) {
            info!(
                "User {} hit the vote limit in poll {} ({}/{})",
                user_id, poll_id, current, limit
            );
            return Ok(VoteOutcome::limit_reached(current, limit));
        }
    }

    tx.insert_vote(&Vote::new(poll_id, user_id, target, user_name)).await?;
    tx.commit().await?;
    debug!("User {} cast {:?} vote in poll {}", user_id, target, poll_id);

    Ok(match target {
        VoteTarget::Category(level) => {
            VoteOutcome::recorded(format!("🎲 Voted on Category {}!", level))
        }
        VoteTarget::Game(_) => VoteOutcome::recorded("Vote recorded"),
    })
}

// Priority candidates only, mapped to the users who starred them.
pub async fn build_star_collections<S: VoteStore>(
    store: &S,
    games: &[Game],
    priority_ids: &HashSet<GameId>,
) -> Result<HashMap<GameId, Vec<UserId>>> {
    let mut collections = HashMap::new();
    for game in games.iter().filter(|g| priority_ids.contains(&g.id)) {
        collections.insert(game.id, store.starred_users(game.id).await?);
    }
    Ok(collections)
}

// Votes are left in place after closing.
pub async fn close_poll<S: VoteStore>(
    store: &S,
    poll_id: &str,
    chat_id: ChatId,
    games: &[Game],
    priority_ids: &HashSet<GameId>,
) -> Result<PollResults> {
    close_poll_with(store, poll_id, chat_id, games, priority_ids, &StarBonus::default()).await
}

pub async fn close_poll_with<S: VoteStore>(
    store: &S,
    poll_id: &str,
    chat_id: ChatId,
    games: &[Game],
    priority_ids: &HashSet<GameId>,
    policy: &dyn WeightingPolicy,
) -> Result<PollResults> {
    let votes = store.poll_votes(poll_id).await?;
    let resolved = resolve_category_votes(&votes, games, &mut rand::rng());

    let weighted = match store.session_settings(chat_id).await? {
        Some(settings) => settings.weighted,
        None => {
            info!("No session settings for chat {}; closing poll {} unweighted", chat_id, poll_id);
            false
        }
    };

    let star_collections = if weighted {
        Some(build_star_collections(store, games, priority_ids).await?)
    } else {
        None
    };

    let results = calculate_poll_winner(
        games,
        &resolved,
        priority_ids,
        star_collections.as_ref(),
        policy,
    );

    info!(
        "Closed poll {}: {} vote(s) from {} voter(s), winner(s): {}",
        poll_id,
        resolved.len(),
        results.total_voters,
        results.winners.join(", ")
    );
    Ok(results)
}

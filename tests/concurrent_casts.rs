use gamenight_vote::db::{SqliteStore, VoteStore};
use gamenight_vote::{VoteLimit, VoteOutcome, VoteTarget, cast_or_toggle_vote};
use std::sync::Arc;
use tempfile::TempDir;

const POLL: &str = "poll-1";

async fn file_store(dir: &TempDir) -> Arc<SqliteStore> {
    let url = format!("sqlite:{}", dir.path().join("votes.db").display());
    Arc::new(SqliteStore::connect(&url, 5).await.unwrap())
}

async fn cast_all(
    store: &Arc<SqliteStore>,
    casts: Vec<(i64, VoteTarget)>,
    limit: VoteLimit,
) -> Vec<VoteOutcome> {
    let handles: Vec<_> = casts
        .into_iter()
        .map(|(user_id, target)| {
            let store = Arc::clone(store);
            tokio::spawn(async move {
                let name = format!("user{}", user_id);
                cast_or_toggle_vote(&*store, POLL, user_id, target, &name, limit, 3).await
            })
        })
        .collect();

    let mut outcomes = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap();
        outcomes.push(outcome.unwrap_or_else(|e| panic!("cast failed: {}", e)));
    }
    outcomes
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_casts_from_many_users_all_land() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;

    let casts = (1..=8).map(|user_id| (user_id, VoteTarget::Game(1))).collect();
    let outcomes = cast_all(&store, casts, VoteLimit::Auto).await;

    assert!(outcomes.iter().all(|o| o.success && !o.is_removal));
    assert_eq!(store.poll_votes(POLL).await.unwrap().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_casts_from_one_user_respect_the_limit() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;

    let casts = (1..=8).map(|game_id| (1, VoteTarget::Game(game_id))).collect();
    let outcomes = cast_all(&store, casts, VoteLimit::Fixed(2)).await;

    assert_eq!(outcomes.iter().filter(|o| o.success).count(), 2);
    assert_eq!(store.poll_votes(POLL).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_identical_casts_never_duplicate() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;

    let casts = (0..4).map(|_| (1, VoteTarget::Category(2))).collect();
    let outcomes = cast_all(&store, casts, VoteLimit::Unlimited).await;

    // Casts run one after another, so they alternate between add and remove.
    assert_eq!(outcomes.iter().filter(|o| o.is_removal).count(), 2);
    assert!(store.poll_votes(POLL).await.unwrap().is_empty());
}

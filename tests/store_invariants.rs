use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use seen_ranking::error::AppError;
use seen_ranking::models::{ContentType, RatedTitle, StarRating, TitleId};
use seen_ranking::ranking::{plan_insertion, plan_removal, RankingState};
use seen_ranking::store::{MemoryRankingStore, RankingStore};

fn stars(n: u8) -> StarRating {
    StarRating::new(n).unwrap()
}

/// Small deterministic generator so the operation sequences are random-ish
/// but reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

/// After any operation sequence: every tier's positions are exactly
/// {1..N}, and sorting by (star desc, position asc) is the same order as
/// sorting by display score descending.
fn assert_tier_invariants(titles: &[RatedTitle]) {
    let mut tiers: BTreeMap<(ContentType, u8), Vec<i32>> = BTreeMap::new();
    for title in titles {
        tiers
            .entry((title.content_type, title.star_rating.get()))
            .or_default()
            .push(title.tier_position);
    }
    for ((content_type, star), mut positions) in tiers {
        positions.sort_unstable();
        let expected: Vec<i32> = (1..=positions.len() as i32).collect();
        assert_eq!(
            positions, expected,
            "tier ({:?}, {} stars) is not a dense permutation",
            content_type, star
        );
    }

    let mut by_rank: Vec<&RatedTitle> = titles.iter().collect();
    by_rank.sort_by(|a, b| {
        b.star_rating
            .get()
            .cmp(&a.star_rating.get())
            .then(a.tier_position.cmp(&b.tier_position))
    });
    let mut by_score: Vec<&RatedTitle> = titles.iter().collect();
    by_score.sort_by(|a, b| b.display_score.partial_cmp(&a.display_score).unwrap());

    let rank_ids: Vec<&str> = by_rank.iter().map(|t| t.title_id.as_str()).collect();
    let score_ids: Vec<&str> = by_score.iter().map(|t| t.title_id.as_str()).collect();
    assert_eq!(rank_ids, score_ids, "score ordering disagrees with rank ordering");
}

/// Ranks a title by simulating a full session against the stored tier, with
/// the answers derived from the desired insertion index, then committing.
async fn rank_at(
    store: &Arc<MemoryRankingStore>,
    user_id: Uuid,
    content_type: ContentType,
    id: &str,
    star_rating: StarRating,
    preferred_rank: usize,
) {
    let existing = store
        .fetch_rated_titles(user_id, content_type)
        .await
        .unwrap();
    let mut state = RankingState::initialize(
        TitleId::from(id),
        star_rating,
        content_type,
        &existing,
    );
    let tier: Vec<RatedTitle> = state.tier().to_vec();
    let true_rank = preferred_rank.min(tier.len());

    while !state.is_complete() {
        let comparison = state.current_comparison().unwrap();
        let mid = tier
            .iter()
            .position(|t| t.title_id == comparison.existing_title)
            .unwrap();
        state = state.process_comparison(true_rank <= mid).unwrap();
    }

    let position = state.tier_position().unwrap();
    let updates = plan_insertion(state.tier(), state.new_title(), position, star_rating).unwrap();
    store
        .apply_insertion(
            user_id,
            content_type,
            star_rating,
            state.tier().len(),
            &updates,
        )
        .await
        .unwrap();
}

async fn remove(
    store: &Arc<MemoryRankingStore>,
    user_id: Uuid,
    content_type: ContentType,
    title: &RatedTitle,
) {
    let titles = store
        .fetch_rated_titles(user_id, content_type)
        .await
        .unwrap();
    let tier: Vec<RatedTitle> = titles
        .iter()
        .filter(|t| t.star_rating == title.star_rating)
        .cloned()
        .collect();
    let (_removed, updates) = plan_removal(&tier, &title.title_id).unwrap();
    store
        .apply_removal(
            user_id,
            content_type,
            title.star_rating,
            &title.title_id,
            tier.len(),
            &updates,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn invariants_hold_across_random_save_remove_sequences() {
    let store = Arc::new(MemoryRankingStore::new());
    let user_id = Uuid::new_v4();
    let content_type = ContentType::Movie;
    let mut rng = Lcg(0x5eed);

    let mut next_id = 0usize;
    for step in 0..60 {
        let titles = store
            .fetch_rated_titles(user_id, content_type)
            .await
            .unwrap();

        // Mostly inserts, occasionally a removal once there is something
        // to remove
        if titles.len() > 3 && step % 4 == 3 {
            let victim = titles[rng.next(titles.len())].clone();
            remove(&store, user_id, content_type, &victim).await;
        } else {
            let star = stars(rng.next(5) as u8 + 1);
            let rank = rng.next(titles.len() + 1);
            let id = format!("m{}", next_id);
            next_id += 1;
            rank_at(&store, user_id, content_type, &id, star, rank).await;
        }

        let titles = store
            .fetch_rated_titles(user_id, content_type)
            .await
            .unwrap();
        assert_tier_invariants(&titles);
    }
}

#[tokio::test]
async fn abandoned_session_leaves_store_untouched() {
    let store = Arc::new(MemoryRankingStore::new());
    let user_id = Uuid::new_v4();

    for (index, id) in ["a", "b", "c"].iter().enumerate() {
        rank_at(&store, user_id, ContentType::Movie, id, stars(3), index).await;
    }
    let before = store
        .fetch_rated_titles(user_id, ContentType::Movie)
        .await
        .unwrap();

    // Run a session halfway and walk away without committing
    let state = RankingState::initialize(
        TitleId::from("abandoned"),
        stars(3),
        ContentType::Movie,
        &before,
    );
    let state = state.process_comparison(true).unwrap();
    drop(state);

    let after = store
        .fetch_rated_titles(user_id, ContentType::Movie)
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn star_rating_change_closes_old_tier_and_reinserts() {
    let store = Arc::new(MemoryRankingStore::new());
    let user_id = Uuid::new_v4();
    let content_type = ContentType::Movie;

    // Five titles in the 4-star tier, positions 1..5
    for (index, id) in ["v", "w", "x", "y", "z"].iter().enumerate() {
        rank_at(&store, user_id, content_type, id, stars(4), index).await;
    }
    // One resident of the 3-star tier
    rank_at(&store, user_id, content_type, "resident", stars(3), 0).await;

    // The user demotes the title at 4-star position 2 down to 3 stars
    let titles = store.fetch_rated_titles(user_id, content_type).await.unwrap();
    let demoted = titles
        .iter()
        .find(|t| t.star_rating == stars(4) && t.tier_position == 2)
        .cloned()
        .unwrap();
    remove(&store, user_id, content_type, &demoted).await;

    // Old tier positions 3,4,5 shifted to 2,3,4
    let titles = store.fetch_rated_titles(user_id, content_type).await.unwrap();
    let four_star_positions: Vec<i32> = titles
        .iter()
        .filter(|t| t.star_rating == stars(4))
        .map(|t| t.tier_position)
        .collect();
    assert_eq!(four_star_positions, vec![1, 2, 3, 4]);

    // Fresh session in the 3-star tier; the user prefers the demoted title
    // over the resident
    rank_at(
        &store,
        user_id,
        content_type,
        demoted.title_id.as_str(),
        stars(3),
        0,
    )
    .await;

    let titles = store.fetch_rated_titles(user_id, content_type).await.unwrap();
    let reinserted = titles
        .iter()
        .find(|t| t.title_id == demoted.title_id)
        .unwrap();
    assert_eq!(reinserted.star_rating, stars(3));
    assert_eq!(reinserted.tier_position, 1);
    assert_tier_invariants(&titles);
}

#[tokio::test]
async fn stale_insertion_is_rejected_and_changes_nothing() {
    let store = Arc::new(MemoryRankingStore::new());
    let user_id = Uuid::new_v4();

    rank_at(&store, user_id, ContentType::Movie, "a", stars(3), 0).await;
    let before = store
        .fetch_rated_titles(user_id, ContentType::Movie)
        .await
        .unwrap();

    // Planned against an empty tier that is no longer empty
    let updates = plan_insertion(&[], &TitleId::from("b"), 1, stars(3)).unwrap();
    let result = store
        .apply_insertion(user_id, ContentType::Movie, stars(3), 0, &updates)
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let after = store
        .fetch_rated_titles(user_id, ContentType::Movie)
        .await
        .unwrap();
    assert_eq!(before, after);
}

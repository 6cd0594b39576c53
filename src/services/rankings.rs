use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ContentType, RatedTitle, StarRating, TitleDetails, TitleId};
use crate::ranking::{display_score, plan_insertion, plan_removal, Comparison, RankingState};
use crate::services::providers::MetadataProvider;
use crate::store::RankingStore;

/// A pairwise comparison decorated with display metadata.
///
/// Metadata is best effort: if the catalog is unreachable the comparison
/// still goes out with bare title IDs, since the algorithm never depends on
/// it.
#[derive(Debug, Serialize)]
pub struct ComparisonView {
    #[serde(flatten)]
    pub comparison: Comparison,
    pub new_title_details: Option<TitleDetails>,
    pub existing_title_details: Option<TitleDetails>,
}

/// One step of a ranking session as returned to the client. The client
/// echoes `state` back verbatim on the next advance/commit call; the server
/// keeps no session storage.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub complete: bool,
    /// Final 1-based tier position, present once complete
    pub tier_position: Option<i32>,
    pub comparison: Option<ComparisonView>,
    pub state: RankingState,
}

/// Result of committing a completed session
#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub title_id: TitleId,
    pub content_type: ContentType,
    pub star_rating: StarRating,
    pub tier_position: i32,
    pub display_score: f64,
    /// Tier size after the insertion
    pub tier_size: usize,
}

/// Starts a ranking session for a newly star-rated title.
///
/// Fetches the user's rated titles, carves out the matching tier and
/// initializes the binary search. A title that is already ranked must go
/// through the rating-change flow instead.
pub async fn start_session(
    store: Arc<dyn RankingStore>,
    metadata: Arc<dyn MetadataProvider>,
    user_id: Uuid,
    title_id: TitleId,
    star_rating: StarRating,
    content_type: ContentType,
) -> AppResult<SessionResponse> {
    let existing = store.fetch_rated_titles(user_id, content_type).await?;

    if existing.iter().any(|t| t.title_id == title_id) {
        return Err(AppError::InvalidInput(format!(
            "Title {} is already ranked; change its rating instead",
            title_id
        )));
    }

    let state = RankingState::initialize(title_id, star_rating, content_type, &existing);

    tracing::info!(
        user_id = %user_id,
        new_title = %state.new_title(),
        star_rating = %star_rating,
        content_type = %content_type,
        tier_size = state.tier().len(),
        "Ranking session started"
    );

    session_response(&metadata, state).await
}

/// Applies one user answer to an in-flight session.
///
/// The state arrives from the client, so it is re-validated before the
/// engine touches it.
pub async fn advance_session(
    metadata: Arc<dyn MetadataProvider>,
    state: RankingState,
    prefers_new_title: bool,
) -> AppResult<SessionResponse> {
    state.validate()?;
    let next = state.process_comparison(prefers_new_title)?;
    session_response(&metadata, next).await
}

/// Commits a completed session: plans the insertion shift and persists it
/// atomically.
///
/// A persistence failure leaves the completed state untouched on the client,
/// so the same commit can simply be retried; a [`AppError::Conflict`] means
/// the tier changed underneath the session and a fresh session is needed.
pub async fn commit_ranking(
    store: Arc<dyn RankingStore>,
    user_id: Uuid,
    state: RankingState,
) -> AppResult<CommitResponse> {
    state.validate()?;
    let tier_position = state.tier_position().ok_or_else(|| {
        AppError::InvalidInput("Ranking session is not complete".to_string())
    })?;

    let updates = plan_insertion(
        state.tier(),
        state.new_title(),
        tier_position,
        state.star_rating(),
    )?;
    let tier_size = state.tier().len() + 1;

    store
        .apply_insertion(
            user_id,
            state.content_type(),
            state.star_rating(),
            state.tier().len(),
            &updates,
        )
        .await?;

    tracing::info!(
        user_id = %user_id,
        title_id = %state.new_title(),
        star_rating = %state.star_rating(),
        tier_position,
        tier_size,
        comparisons = state.comparisons_made(),
        "Ranking committed"
    );

    Ok(CommitResponse {
        title_id: state.new_title().clone(),
        content_type: state.content_type(),
        star_rating: state.star_rating(),
        tier_position,
        display_score: display_score(state.star_rating(), tier_position, tier_size),
        tier_size,
    })
}

/// Removes a title from the user's rankings, closing the gap it leaves in
/// its tier
pub async fn remove_ranking(
    store: Arc<dyn RankingStore>,
    user_id: Uuid,
    content_type: ContentType,
    title_id: &TitleId,
) -> AppResult<()> {
    let titles = store.fetch_rated_titles(user_id, content_type).await?;
    let ranked = titles
        .iter()
        .find(|t| &t.title_id == title_id)
        .ok_or_else(|| AppError::NotFound(format!("Title {} is not ranked", title_id)))?;

    let star_rating = ranked.star_rating;
    let tier: Vec<RatedTitle> = titles
        .iter()
        .filter(|t| t.star_rating == star_rating)
        .cloned()
        .collect();

    let (removed, updates) = plan_removal(&tier, title_id)?;
    store
        .apply_removal(
            user_id,
            content_type,
            star_rating,
            title_id,
            tier.len(),
            &updates,
        )
        .await?;

    tracing::info!(
        user_id = %user_id,
        title_id = %title_id,
        star_rating = %star_rating,
        old_position = removed.tier_position,
        "Ranking removed"
    );

    Ok(())
}

/// Changes a ranked title's star rating: removes it from its current tier,
/// then starts a fresh session in the new tier and returns it
pub async fn change_star_rating(
    store: Arc<dyn RankingStore>,
    metadata: Arc<dyn MetadataProvider>,
    user_id: Uuid,
    content_type: ContentType,
    title_id: TitleId,
    new_star_rating: StarRating,
) -> AppResult<SessionResponse> {
    remove_ranking(store.clone(), user_id, content_type, &title_id).await?;
    start_session(
        store,
        metadata,
        user_id,
        title_id,
        new_star_rating,
        content_type,
    )
    .await
}

/// Builds the client-facing view of a session step, decorating the current
/// comparison with metadata when the catalog cooperates
async fn session_response(
    metadata: &Arc<dyn MetadataProvider>,
    state: RankingState,
) -> AppResult<SessionResponse> {
    let comparison = match state.current_comparison() {
        Some(comparison) => {
            let new_title_details =
                fetch_details(metadata, &comparison.new_title, state.content_type()).await;
            let existing_title_details =
                fetch_details(metadata, &comparison.existing_title, state.content_type()).await;
            Some(ComparisonView {
                comparison,
                new_title_details,
                existing_title_details,
            })
        }
        None => None,
    };

    Ok(SessionResponse {
        complete: state.is_complete(),
        tier_position: state.tier_position(),
        comparison,
        state,
    })
}

async fn fetch_details(
    metadata: &Arc<dyn MetadataProvider>,
    title_id: &TitleId,
    content_type: ContentType,
) -> Option<TitleDetails> {
    match metadata.fetch_title(title_id, content_type).await {
        Ok(details) => Some(details),
        Err(e) => {
            tracing::warn!(
                error = %e,
                title_id = %title_id,
                provider = metadata.name(),
                "Metadata fetch failed, comparison degrades to title IDs"
            );
            None
        }
    }
}

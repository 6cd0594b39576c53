use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ContentType, RatedTitle, StarRating, TitleId},
    ranking::RankingState,
    routes::AppState,
    services::rankings,
};

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub user_id: Uuid,
    pub title_id: TitleId,
    pub star_rating: StarRating,
    pub content_type: ContentType,
}

#[derive(Debug, Deserialize)]
pub struct AdvanceSessionRequest {
    pub state: RankingState,
    /// true: the new title ranks ahead of the one it was compared against
    pub prefers_new_title: bool,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub user_id: Uuid,
    pub state: RankingState,
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub content_type: ContentType,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRatingRequest {
    pub content_type: ContentType,
    pub star_rating: StarRating,
}

/// Handler for starting a ranking session for a newly rated title
pub async fn start_session(
    State(state): State<AppState>,
    Json(request): Json<StartSessionRequest>,
) -> AppResult<Json<rankings::SessionResponse>> {
    let response = rankings::start_session(
        state.store.clone(),
        state.metadata.clone(),
        request.user_id,
        request.title_id,
        request.star_rating,
        request.content_type,
    )
    .await?;

    Ok(Json(response))
}

/// Handler for answering the current comparison of a session
pub async fn advance_session(
    State(state): State<AppState>,
    Json(request): Json<AdvanceSessionRequest>,
) -> AppResult<Json<rankings::SessionResponse>> {
    let response = rankings::advance_session(
        state.metadata.clone(),
        request.state,
        request.prefers_new_title,
    )
    .await?;

    Ok(Json(response))
}

/// Handler for committing a completed session
pub async fn commit_ranking(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> AppResult<(StatusCode, Json<rankings::CommitResponse>)> {
    let response =
        rankings::commit_ranking(state.store.clone(), request.user_id, request.state).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for listing a user's rated titles, best first
pub async fn list_rankings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<Vec<RatedTitle>>> {
    let titles = state
        .store
        .fetch_rated_titles(user_id, query.content_type)
        .await?;

    Ok(Json(titles))
}

/// Handler for deleting a ranking
pub async fn remove_ranking(
    State(state): State<AppState>,
    Path((user_id, title_id)): Path<(Uuid, String)>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<StatusCode> {
    rankings::remove_ranking(
        state.store.clone(),
        user_id,
        query.content_type,
        &TitleId(title_id),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for changing a ranked title's star rating; responds with the
/// fresh session that re-ranks it within its new tier
pub async fn change_star_rating(
    State(state): State<AppState>,
    Path((user_id, title_id)): Path<(Uuid, String)>,
    Json(request): Json<ChangeRatingRequest>,
) -> AppResult<Json<rankings::SessionResponse>> {
    let response = rankings::change_star_rating(
        state.store.clone(),
        state.metadata.clone(),
        user_id,
        request.content_type,
        TitleId(title_id),
        request.star_rating,
    )
    .await?;

    Ok(Json(response))
}

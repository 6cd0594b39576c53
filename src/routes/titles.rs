use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{error::AppResult, models::{ContentType, TitleDetails}, routes::AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    #[serde(default = "default_content_type")]
    content_type: ContentType,
}

fn default_content_type() -> ContentType {
    ContentType::Movie
}

/// Handler for title search against the metadata catalog
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<TitleDetails>>> {
    let titles = state
        .metadata
        .search_titles(&params.q, params.content_type)
        .await?;

    Ok(Json(titles))
}

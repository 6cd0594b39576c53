/// TMDB catalog provider
///
/// Search: /3/search/movie and /3/search/tv. Details: /3/movie/{id} and
/// /3/tv/{id}. Both go through the redis read-through cache; detail records
/// barely change, so they get a much longer TTL than search results.
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{ContentType, TitleDetails, TitleId, TmdbTitle},
    services::providers::MetadataProvider,
};
use reqwest::Client as HttpClient;
use serde::Deserialize;

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAILS_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Cache,
}

impl TmdbProvider {
    pub fn new(cache: Cache, api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            cache,
        }
    }

    /// TMDB path segment for a content type
    fn catalog_segment(content_type: ContentType) -> &'static str {
        match content_type {
            ContentType::Movie => "movie",
            ContentType::Show => "tv",
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let response = self.http_client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn search_titles(
        &self,
        query: &str,
        content_type: ContentType,
    ) -> AppResult<Vec<TitleDetails>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::TitleSearch(content_type, query.to_string()),
            SEARCH_CACHE_TTL,
            async move {
                let url = format!(
                    "{}/3/search/{}",
                    self.api_url,
                    Self::catalog_segment(content_type)
                );

                #[derive(Deserialize)]
                struct SearchResponse {
                    results: Vec<TmdbTitle>,
                }

                let response: SearchResponse = self
                    .get_json(&url, &[("api_key", self.api_key.as_str()), ("query", query)])
                    .await?;

                let titles: Vec<TitleDetails> = response
                    .results
                    .into_iter()
                    .map(|raw| raw.into_details(content_type))
                    .collect();

                tracing::info!(
                    query = %query,
                    content_type = %content_type,
                    results = titles.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                Ok::<_, AppError>(titles)
            }
        )
    }

    async fn fetch_title(
        &self,
        title_id: &TitleId,
        content_type: ContentType,
    ) -> AppResult<TitleDetails> {
        cached!(
            self.cache,
            CacheKey::TitleDetails(content_type, title_id.clone()),
            DETAILS_CACHE_TTL,
            async move {
                let url = format!(
                    "{}/3/{}/{}",
                    self.api_url,
                    Self::catalog_segment(content_type),
                    title_id
                );

                let raw: TmdbTitle = self
                    .get_json(&url, &[("api_key", self.api_key.as_str())])
                    .await?;

                tracing::debug!(
                    title_id = %title_id,
                    content_type = %content_type,
                    provider = "tmdb",
                    "Title details fetched"
                );

                Ok::<_, AppError>(raw.into_details(content_type))
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

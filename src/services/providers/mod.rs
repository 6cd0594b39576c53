/// Title metadata provider abstraction
///
/// The ranking engine never consults the catalog; metadata is fetched only
/// to decorate comparisons and search results shown to the user. Keeping the
/// provider behind a trait lets tests run against a stub and leaves room for
/// other catalogs besides TMDB.
use crate::{
    error::AppResult,
    models::{ContentType, TitleDetails, TitleId},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search the catalog by name within one content type
    async fn search_titles(
        &self,
        query: &str,
        content_type: ContentType,
    ) -> AppResult<Vec<TitleDetails>>;

    /// Fetch display details for a single title
    async fn fetch_title(
        &self,
        title_id: &TitleId,
        content_type: ContentType,
    ) -> AppResult<TitleDetails>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

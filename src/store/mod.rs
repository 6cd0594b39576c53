use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ContentType, RatedTitle, StarRating, TitleId};
use crate::ranking::RankUpdate;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRankingStore;
pub use postgres::PgRankingStore;

/// Persistence boundary for rank assignments.
///
/// Implementations must apply each insertion/removal atomically and
/// serialize writers per (user, content_type, star_rating) tier. The
/// `expected_tier_size` arguments carry the size of the tier snapshot the
/// caller planned against; a mismatch at apply time means the tier changed
/// under the session and must surface as [`crate::error::AppError::Conflict`]
/// so the caller can restart with a fresh snapshot.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RankingStore: Send + Sync {
    /// All titles the user has ranked in one catalog, ordered
    /// (star_rating desc, tier_position asc), i.e. best first
    async fn fetch_rated_titles(
        &self,
        user_id: Uuid,
        content_type: ContentType,
    ) -> AppResult<Vec<RatedTitle>>;

    /// Atomically applies a planned insertion: upserts every update row
    /// (the new title plus its shifted and rescored tier neighbors)
    async fn apply_insertion(
        &self,
        user_id: Uuid,
        content_type: ContentType,
        star_rating: StarRating,
        expected_tier_size: usize,
        updates: &[RankUpdate],
    ) -> AppResult<()>;

    /// Atomically applies a planned removal: deletes the title's row and
    /// rewrites the remaining tier members
    async fn apply_removal(
        &self,
        user_id: Uuid,
        content_type: ContentType,
        star_rating: StarRating,
        title_id: &TitleId,
        expected_tier_size: usize,
        updates: &[RankUpdate],
    ) -> AppResult<()>;
}

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ContentType, RatedTitle, StarRating, TitleId};
use crate::ranking::RankUpdate;
use crate::store::RankingStore;

/// In-process ranking store used by the integration tests and local
/// development. Same conflict semantics as the Postgres store: an apply
/// whose `expected_tier_size` no longer matches is rejected as a conflict,
/// and the single write lock serializes tier writers.
#[derive(Default)]
pub struct MemoryRankingStore {
    rankings: RwLock<HashMap<Uuid, Vec<RatedTitle>>>,
}

impl MemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tier_size(
        titles: &[RatedTitle],
        content_type: ContentType,
        star_rating: StarRating,
    ) -> usize {
        titles
            .iter()
            .filter(|t| t.content_type == content_type && t.star_rating == star_rating)
            .count()
    }

    fn check_tier_size(
        titles: &[RatedTitle],
        content_type: ContentType,
        star_rating: StarRating,
        expected: usize,
    ) -> AppResult<()> {
        let actual = Self::tier_size(titles, content_type, star_rating);
        if actual != expected {
            return Err(AppError::Conflict(format!(
                "Tier changed since session start: expected {} titles, found {}",
                expected, actual
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl RankingStore for MemoryRankingStore {
    async fn fetch_rated_titles(
        &self,
        user_id: Uuid,
        content_type: ContentType,
    ) -> AppResult<Vec<RatedTitle>> {
        let rankings = self.rankings.read().await;
        let mut titles: Vec<RatedTitle> = rankings
            .get(&user_id)
            .map(|titles| {
                titles
                    .iter()
                    .filter(|t| t.content_type == content_type)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        titles.sort_by(|a, b| {
            b.star_rating
                .get()
                .cmp(&a.star_rating.get())
                .then(a.tier_position.cmp(&b.tier_position))
        });

        Ok(titles)
    }

    async fn apply_insertion(
        &self,
        user_id: Uuid,
        content_type: ContentType,
        star_rating: StarRating,
        expected_tier_size: usize,
        updates: &[RankUpdate],
    ) -> AppResult<()> {
        let mut rankings = self.rankings.write().await;
        let titles = rankings.entry(user_id).or_default();

        Self::check_tier_size(titles, content_type, star_rating, expected_tier_size)?;

        for update in updates {
            match titles
                .iter_mut()
                .find(|t| t.content_type == content_type && t.title_id == update.title_id)
            {
                Some(existing) => {
                    existing.star_rating = star_rating;
                    existing.tier_position = update.tier_position;
                    existing.display_score = update.display_score;
                }
                None => titles.push(RatedTitle {
                    title_id: update.title_id.clone(),
                    content_type,
                    star_rating,
                    tier_position: update.tier_position,
                    display_score: update.display_score,
                    rated_at: Utc::now(),
                }),
            }
        }

        Ok(())
    }

    async fn apply_removal(
        &self,
        user_id: Uuid,
        content_type: ContentType,
        star_rating: StarRating,
        title_id: &TitleId,
        expected_tier_size: usize,
        updates: &[RankUpdate],
    ) -> AppResult<()> {
        let mut rankings = self.rankings.write().await;
        let titles = rankings.entry(user_id).or_default();

        Self::check_tier_size(titles, content_type, star_rating, expected_tier_size)?;

        let before = titles.len();
        titles.retain(|t| !(t.content_type == content_type && &t.title_id == title_id));
        if titles.len() == before {
            return Err(AppError::NotFound(format!(
                "Title {} is not ranked",
                title_id
            )));
        }

        for update in updates {
            if let Some(existing) = titles
                .iter_mut()
                .find(|t| t.content_type == content_type && t.title_id == update.title_id)
            {
                existing.tier_position = update.tier_position;
                existing.display_score = update.display_score;
            }
        }

        Ok(())
    }
}

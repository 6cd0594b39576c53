use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ContentType, RatedTitle, StarRating, TitleId};
use crate::ranking::RankUpdate;
use crate::store::RankingStore;

/// PostgreSQL-backed ranking store.
///
/// Every apply runs in one transaction. Writers for the same tier are
/// serialized with an advisory transaction lock, and the tier's row count is
/// checked against the session's snapshot before any row changes, so a
/// commit planned against a stale tier fails with a retryable conflict
/// instead of corrupting positions.
#[derive(Clone)]
pub struct PgRankingStore {
    pool: PgPool,
}

/// Raw rankings row, converted into the domain model after fetch
#[derive(sqlx::FromRow)]
struct RankingRow {
    title_id: String,
    content_type: String,
    star_rating: i16,
    tier_position: i32,
    display_score: f64,
    rated_at: DateTime<Utc>,
}

impl TryFrom<RankingRow> for RatedTitle {
    type Error = AppError;

    fn try_from(row: RankingRow) -> Result<Self, Self::Error> {
        Ok(RatedTitle {
            title_id: TitleId(row.title_id),
            content_type: ContentType::from_str(&row.content_type)?,
            star_rating: StarRating::new(row.star_rating as u8)
                .map_err(|_| AppError::Internal("Star rating out of range in store".to_string()))?,
            tier_position: row.tier_position,
            display_score: row.display_score,
            rated_at: row.rated_at,
        })
    }
}

impl PgRankingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Text key hashed by Postgres into the advisory lock id for a tier
    fn tier_lock_key(user_id: Uuid, content_type: ContentType, star_rating: StarRating) -> String {
        format!("rank:{}:{}:{}", user_id, content_type, star_rating)
    }

    /// Takes the per-tier advisory lock and verifies the tier still has the
    /// size the session planned against
    async fn lock_and_check_tier(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        content_type: ContentType,
        star_rating: StarRating,
        expected_tier_size: usize,
    ) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(Self::tier_lock_key(user_id, content_type, star_rating))
            .execute(&mut **tx)
            .await?;

        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM rankings
            WHERE user_id = $1 AND content_type = $2 AND star_rating = $3
            "#,
        )
        .bind(user_id)
        .bind(content_type.as_str())
        .bind(i16::from(star_rating.get()))
        .fetch_one(&mut **tx)
        .await?;

        if count as usize != expected_tier_size {
            return Err(AppError::Conflict(format!(
                "Tier changed since session start: expected {} titles, found {}",
                expected_tier_size, count
            )));
        }

        Ok(())
    }

    async fn write_update(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        content_type: ContentType,
        star_rating: StarRating,
        update: &RankUpdate,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rankings
                (user_id, title_id, content_type, star_rating, tier_position, display_score)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, content_type, title_id)
            DO UPDATE SET
                star_rating = EXCLUDED.star_rating,
                tier_position = EXCLUDED.tier_position,
                display_score = EXCLUDED.display_score
            "#,
        )
        .bind(user_id)
        .bind(update.title_id.as_str())
        .bind(content_type.as_str())
        .bind(i16::from(star_rating.get()))
        .bind(update.tier_position)
        .bind(update.display_score)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl RankingStore for PgRankingStore {
    async fn fetch_rated_titles(
        &self,
        user_id: Uuid,
        content_type: ContentType,
    ) -> AppResult<Vec<RatedTitle>> {
        let rows: Vec<RankingRow> = sqlx::query_as(
            r#"
            SELECT title_id, content_type, star_rating, tier_position, display_score, rated_at
            FROM rankings
            WHERE user_id = $1 AND content_type = $2
            ORDER BY star_rating DESC, tier_position ASC
            "#,
        )
        .bind(user_id)
        .bind(content_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RatedTitle::try_from).collect()
    }

    async fn apply_insertion(
        &self,
        user_id: Uuid,
        content_type: ContentType,
        star_rating: StarRating,
        expected_tier_size: usize,
        updates: &[RankUpdate],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        Self::lock_and_check_tier(&mut tx, user_id, content_type, star_rating, expected_tier_size)
            .await?;

        // Worst position first: shifted rows vacate their old slots before
        // anyone moves into them, keeping the dense-position unique index
        // satisfied at every step.
        let mut ordered: Vec<&RankUpdate> = updates.iter().collect();
        ordered.sort_by(|a, b| b.tier_position.cmp(&a.tier_position));

        for update in ordered {
            Self::write_update(&mut tx, user_id, content_type, star_rating, update).await?;
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            content_type = %content_type,
            star_rating = %star_rating,
            rows = updates.len(),
            "Tier insertion committed"
        );

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
        let mut tx = self.pool.begin().await?;

        Self::lock_and_check_tier(&mut tx, user_id, content_type, star_rating, expected_tier_size)
            .await?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM rankings
            WHERE user_id = $1 AND content_type = $2 AND title_id = $3
            "#,
        )
        .bind(user_id)
        .bind(content_type.as_str())
        .bind(title_id.as_str())
        .execute(&mut *tx)
        .await?;

        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Title {} is not ranked",
                title_id
            )));
        }

        // Best position first: each row moves up into the slot freed by the
        // delete or by the previous update.
        let mut ordered: Vec<&RankUpdate> = updates.iter().collect();
        ordered.sort_by_key(|u| u.tier_position);

        for update in ordered {
            Self::write_update(&mut tx, user_id, content_type, star_rating, update).await?;
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            content_type = %content_type,
            star_rating = %star_rating,
            title_id = %title_id,
            "Tier removal committed"
        );

        Ok(())
    }
}

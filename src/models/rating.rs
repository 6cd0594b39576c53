use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{ContentType, TitleId};

/// Star rating assigned by the user, always in 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StarRating(u8);

impl StarRating {
    pub fn new(stars: u8) -> Result<Self, AppError> {
        if (1..=5).contains(&stars) {
            Ok(Self(stars))
        } else {
            Err(AppError::InvalidInput(format!(
                "Star rating must be between 1 and 5, got {}",
                stars
            )))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for StarRating {
    type Error = AppError;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Self::new(stars)
    }
}

impl From<StarRating> for u8 {
    fn from(rating: StarRating) -> u8 {
        rating.0
    }
}

impl std::fmt::Display for StarRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A title the user has already positioned in their personal ranking.
///
/// Within one (user, content_type, star_rating) tier the positions form a
/// dense 1..=N permutation, position 1 being the user's favorite of the
/// tier. The display score orders a user's whole catalog consistently with
/// (star_rating desc, tier_position asc).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatedTitle {
    pub title_id: TitleId,
    pub content_type: ContentType,
    pub star_rating: StarRating,
    /// 1-based rank within the tier, 1 = best
    pub tier_position: i32,
    pub display_score: f64,
    pub rated_at: DateTime<Utc>,
}

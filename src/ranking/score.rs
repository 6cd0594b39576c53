use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{RatedTitle, StarRating, TitleId};

/// One row of a tier rewrite: the position and score a title must hold
/// after an insertion or removal commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankUpdate {
    pub title_id: TitleId,
    pub tier_position: i32,
    pub display_score: f64,
}

/// Continuous score used to sort a user's whole catalog.
///
/// `star*2 - (pos-1)/size` keeps every score in a star tier inside
/// `(2*star - 1, 2*star]`, so a higher star rating always outscores a lower
/// one and scores strictly decrease down the tier. The score depends on the
/// tier size, so every member is rescored when the tier grows or shrinks.
pub fn display_score(star_rating: StarRating, tier_position: i32, tier_size: usize) -> f64 {
    debug_assert!(tier_size >= 1);
    debug_assert!(tier_position >= 1 && tier_position <= tier_size as i32);
    f64::from(star_rating.get()) * 2.0 - f64::from(tier_position - 1) / tier_size as f64
}

/// Plans the tier rewrite for inserting `new_title` at `position` (1-based).
///
/// Existing members at or below the insertion point shift down one slot;
/// all members, shifted or not, are rescored against the grown tier. The
/// returned updates cover the new title and every existing member, and form
/// a dense 1..=N+1 permutation.
pub fn plan_insertion(
    tier: &[RatedTitle],
    new_title: &TitleId,
    position: i32,
    star_rating: StarRating,
) -> AppResult<Vec<RankUpdate>> {
    let new_size = tier.len() + 1;
    if position < 1 || position > new_size as i32 {
        return Err(AppError::InvalidInput(format!(
            "Tier position {} out of range for tier growing to {}",
            position, new_size
        )));
    }

    let mut updates = Vec::with_capacity(new_size);
    updates.push(RankUpdate {
        title_id: new_title.clone(),
        tier_position: position,
        display_score: display_score(star_rating, position, new_size),
    });

    for title in tier {
        let tier_position = if title.tier_position >= position {
            title.tier_position + 1
        } else {
            title.tier_position
        };
        updates.push(RankUpdate {
            title_id: title.title_id.clone(),
            tier_position,
            display_score: display_score(star_rating, tier_position, new_size),
        });
    }

    Ok(updates)
}

/// Plans the tier rewrite for removing `title_id` from its tier.
///
/// Members below the removed position shift up one slot to close the gap;
/// the survivors are rescored against the shrunken tier. Returns the removed
/// title alongside the updates for the remaining members.
pub fn plan_removal(
    tier: &[RatedTitle],
    title_id: &TitleId,
) -> AppResult<(RatedTitle, Vec<RankUpdate>)> {
    let removed = tier
        .iter()
        .find(|t| &t.title_id == title_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Title {} is not ranked", title_id)))?;

    let new_size = tier.len() - 1;
    let mut updates = Vec::with_capacity(new_size);
    for title in tier {
        if title.title_id == removed.title_id {
            continue;
        }
        let tier_position = if title.tier_position > removed.tier_position {
            title.tier_position - 1
        } else {
            title.tier_position
        };
        updates.push(RankUpdate {
            title_id: title.title_id.clone(),
            tier_position,
            display_score: display_score(title.star_rating, tier_position, new_size),
        });
    }

    Ok((removed, updates))
}

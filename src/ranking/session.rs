use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{ContentType, RatedTitle, StarRating, TitleId};

/// One pairwise choice offered to the user during a ranking session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    /// The title being placed (constant across the session)
    pub new_title: TitleId,
    /// The tier title at the midpoint of the current search range
    pub existing_title: TitleId,
    /// 1-based running comparison number
    pub current_index: u32,
    /// Worst-case total fixed at initialization: ceil(log2(N+1)).
    /// Communicates expected effort to the user; the session may finish
    /// in fewer steps.
    pub total_comparisons: u32,
}

/// In-memory state of a single ranking session: one new title being
/// binary-searched into one tier.
///
/// States are immutable values; [`RankingState::process_comparison`] returns
/// a new state and leaves the input intact. Nothing here performs I/O - the
/// tier snapshot is captured at initialization and persistence happens once,
/// at commit, against that snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingState {
    new_title: TitleId,
    star_rating: StarRating,
    content_type: ContentType,
    /// Existing tier members, sorted by tier_position ascending (best first)
    tier: Vec<RatedTitle>,
    /// Inclusive search range into `tier`, 0-indexed. The session is
    /// complete exactly when lower > upper.
    lower: i32,
    upper: i32,
    comparisons_made: u32,
    total_comparisons: u32,
    complete: bool,
}

/// Worst-case comparisons for binary insertion into a tier of `n` titles:
/// ceil(log2(n + 1)), i.e. the bit width of n.
fn comparison_estimate(n: usize) -> u32 {
    usize::BITS - n.leading_zeros()
}

impl RankingState {
    /// Starts a ranking session for `new_title` at `star_rating`.
    ///
    /// Filters `existing` down to the exact tier (same content type, same
    /// star rating, the new title itself excluded) ordered by current tier
    /// position. An empty tier completes immediately at position 1.
    /// Deterministic: no randomness, no clock.
    pub fn initialize(
        new_title: TitleId,
        star_rating: StarRating,
        content_type: ContentType,
        existing: &[RatedTitle],
    ) -> Self {
        let mut tier: Vec<RatedTitle> = existing
            .iter()
            .filter(|t| {
                t.content_type == content_type
                    && t.star_rating == star_rating
                    && t.title_id != new_title
            })
            .cloned()
            .collect();
        tier.sort_by_key(|t| t.tier_position);

        let size = tier.len() as i32;
        Self {
            new_title,
            star_rating,
            content_type,
            lower: 0,
            upper: size - 1,
            comparisons_made: 0,
            total_comparisons: comparison_estimate(tier.len()),
            complete: size == 0,
            tier,
        }
    }

    /// The next pairwise choice to show the user, or None once complete
    pub fn current_comparison(&self) -> Option<Comparison> {
        if self.complete {
            return None;
        }
        let mid = ((self.lower + self.upper) / 2) as usize;
        Some(Comparison {
            new_title: self.new_title.clone(),
            existing_title: self.tier[mid].title_id.clone(),
            current_index: self.comparisons_made + 1,
            total_comparisons: self.total_comparisons,
        })
    }

    /// Advances the search range with the user's answer to the current
    /// comparison and returns the resulting state.
    ///
    /// `prefers_new_title` means the new title ranks better than (ahead of)
    /// the midpoint title. Calling this on a complete session is a caller
    /// bug and fails fast.
    pub fn process_comparison(&self, prefers_new_title: bool) -> AppResult<Self> {
        if self.complete {
            return Err(AppError::InvalidInput(
                "Ranking session is already complete".to_string(),
            ));
        }

        let mid = (self.lower + self.upper) / 2;
        let mut next = self.clone();
        if prefers_new_title {
            // New title belongs in [lower, mid]
            next.upper = mid - 1;
        } else {
            // New title belongs in [mid + 1, upper]
            next.lower = mid + 1;
        }
        next.comparisons_made += 1;
        next.complete = next.lower > next.upper;
        Ok(next)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Final 1-based tier position, available once the session is complete
    pub fn tier_position(&self) -> Option<i32> {
        self.complete.then_some(self.lower + 1)
    }

    pub fn new_title(&self) -> &TitleId {
        &self.new_title
    }

    pub fn star_rating(&self) -> StarRating {
        self.star_rating
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Tier snapshot captured at initialization, best first
    pub fn tier(&self) -> &[RatedTitle] {
        &self.tier
    }

    pub fn comparisons_made(&self) -> u32 {
        self.comparisons_made
    }

    /// Integrity check for states that round-trip through the client.
    ///
    /// The HTTP surface is stateless and echoes session state back to the
    /// caller, so a state must be re-validated before it is trusted again.
    pub fn validate(&self) -> AppResult<()> {
        let size = self.tier.len() as i32;

        if self.lower < 0
            || self.upper < -1
            || self.upper >= size
            || self.lower > self.upper + 1
        {
            return Err(AppError::InvalidInput(format!(
                "Corrupt ranking session: search range [{}, {}] invalid for tier of {}",
                self.lower, self.upper, size
            )));
        }
        if self.complete != (self.lower > self.upper) {
            return Err(AppError::InvalidInput(
                "Corrupt ranking session: completion flag disagrees with search range"
                    .to_string(),
            ));
        }
        if self.total_comparisons != comparison_estimate(self.tier.len())
            || self.comparisons_made > self.total_comparisons
        {
            return Err(AppError::InvalidInput(
                "Corrupt ranking session: comparison counters out of range".to_string(),
            ));
        }

        for (index, title) in self.tier.iter().enumerate() {
            if title.content_type != self.content_type
                || title.star_rating != self.star_rating
            {
                return Err(AppError::InvalidInput(format!(
                    "Corrupt ranking session: tier member {} belongs to another tier",
                    title.title_id
                )));
            }
            if title.title_id == self.new_title {
                return Err(AppError::InvalidInput(
                    "Corrupt ranking session: new title already present in tier".to_string(),
                ));
            }
            // Dense 1..=N permutation, already sorted ascending
            if title.tier_position != index as i32 + 1 {
                return Err(AppError::InvalidInput(format!(
                    "Corrupt ranking session: tier positions are not dense at {}",
                    title.title_id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rated(id: &str, stars: u8, position: i32) -> RatedTitle {
        RatedTitle {
            title_id: TitleId::from(id),
            content_type: ContentType::Movie,
            star_rating: StarRating::new(stars).unwrap(),
            tier_position: position,
            // Engine logic never reads scores; planners recompute them
            display_score: 0.0,
            rated_at: Utc::now(),
        }
    }

    fn three_star_tier() -> Vec<RatedTitle> {
        vec![rated("a", 3, 1), rated("b", 3, 2), rated("c", 3, 3)]
    }

    #[test]
    fn test_empty_tier_completes_immediately() {
        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &[],
        );

        assert!(state.is_complete());
        assert_eq!(state.tier_position(), Some(1));
        assert_eq!(state.current_comparison(), None);
        assert_eq!(state.comparisons_made(), 0);
    }

    #[test]
    fn test_initialize_filters_to_exact_tier() {
        let mut existing = three_star_tier();
        existing.push(rated("four-star", 4, 1));
        existing.push(RatedTitle {
            content_type: ContentType::Show,
            ..rated("show", 3, 1)
        });

        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &existing,
        );

        assert_eq!(state.tier().len(), 3);
        assert!(state
            .tier()
            .iter()
            .all(|t| t.star_rating.get() == 3 && t.content_type == ContentType::Movie));
    }

    #[test]
    fn test_first_comparison_targets_midpoint() {
        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &three_star_tier(),
        );

        let comparison = state.current_comparison().unwrap();
        assert_eq!(comparison.existing_title, TitleId::from("b"));
        assert_eq!(comparison.current_index, 1);
        assert_eq!(comparison.total_comparisons, 2); // ceil(log2(4))
    }

    #[test]
    fn test_single_element_tier_takes_one_comparison() {
        let tier = vec![rated("a", 3, 1)];

        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &tier,
        );
        let preferred = state.process_comparison(true).unwrap();
        assert!(preferred.is_complete());
        assert_eq!(preferred.tier_position(), Some(1));

        let not_preferred = state.process_comparison(false).unwrap();
        assert!(not_preferred.is_complete());
        assert_eq!(not_preferred.tier_position(), Some(2));
    }

    #[test]
    fn test_process_comparison_leaves_input_intact() {
        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &three_star_tier(),
        );

        let _advanced = state.process_comparison(true).unwrap();
        assert!(!state.is_complete());
        assert_eq!(state.comparisons_made(), 0);
        assert_eq!(
            state.current_comparison().unwrap().existing_title,
            TitleId::from("b")
        );
    }

    #[test]
    fn test_process_comparison_on_complete_state_fails() {
        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &[],
        );

        assert!(matches!(
            state.process_comparison(true),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_prefer_new_over_everything_lands_first() {
        // Tier [a, b, c]: beats b (mid), then beats a -> position 1
        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &three_star_tier(),
        );

        let state = state.process_comparison(true).unwrap();
        assert!(!state.is_complete());
        assert_eq!(
            state.current_comparison().unwrap().existing_title,
            TitleId::from("a")
        );

        let state = state.process_comparison(true).unwrap();
        assert!(state.is_complete());
        assert_eq!(state.tier_position(), Some(1));
        assert_eq!(state.comparisons_made(), 2);
    }

    #[test]
    fn test_prefer_existing_over_everything_lands_last() {
        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &three_star_tier(),
        );

        let state = state.process_comparison(false).unwrap();
        let state = state.process_comparison(false).unwrap();
        assert!(state.is_complete());
        assert_eq!(state.tier_position(), Some(4));
    }

    #[test]
    fn test_validate_accepts_engine_built_states() {
        let mut state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &three_star_tier(),
        );
        state.validate().unwrap();

        while !state.is_complete() {
            state = state.process_comparison(false).unwrap();
            state.validate().unwrap();
        }
    }

    #[test]
    fn test_validate_rejects_tampered_state() {
        let state = RankingState::initialize(
            TitleId::from("d"),
            StarRating::new(3).unwrap(),
            ContentType::Movie,
            &three_star_tier(),
        );

        // Round-trip through JSON and corrupt the search range
        let mut value = serde_json::to_value(&state).unwrap();
        value["lower"] = serde_json::json!(7);
        let tampered: RankingState = serde_json::from_value(value).unwrap();
        assert!(tampered.validate().is_err());

        // Corrupt a tier position so the permutation has a gap
        let mut value = serde_json::to_value(&state).unwrap();
        value["tier"][1]["tier_position"] = serde_json::json!(5);
        let tampered: RankingState = serde_json::from_value(value).unwrap();
        assert!(tampered.validate().is_err());
    }

    #[test]
    fn test_comparison_estimate() {
        assert_eq!(comparison_estimate(0), 0);
        assert_eq!(comparison_estimate(1), 1);
        assert_eq!(comparison_estimate(3), 2);
        assert_eq!(comparison_estimate(4), 3);
        assert_eq!(comparison_estimate(7), 3);
        assert_eq!(comparison_estimate(8), 4);
    }
}

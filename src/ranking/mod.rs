//! Tiered pairwise-comparison ranking engine.
//!
//! A newly star-rated title is placed within the user's existing titles of
//! the same star rating ("tier") by binary insertion search over pairwise
//! choices. Everything here is pure: sessions are values, transitions return
//! new values, and all persistence happens in one commit step driven by the
//! planners in [`score`].

pub mod score;
pub mod session;

pub use score::{display_score, plan_insertion, plan_removal, RankUpdate};
pub use session::{Comparison, RankingState};

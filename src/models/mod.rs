pub mod rating;
pub mod title;

pub use rating::{RatedTitle, StarRating};
pub use title::{ContentType, TitleDetails, TitleId, TmdbTitle};

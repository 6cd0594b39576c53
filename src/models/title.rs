use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Identifier for a title in the metadata catalog (TMDB numeric ID,
/// carried as a string so other catalogs can be swapped in)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleId(pub String);

impl TitleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TitleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Type of content a ranking applies to. Movies and shows are ranked in
/// separate catalogs per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Show,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Show => "show",
        }
    }
}

impl Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(ContentType::Movie),
            "show" => Ok(ContentType::Show),
            other => Err(AppError::Internal(format!(
                "Unknown content type in store: {}",
                other
            ))),
        }
    }
}

/// Display metadata for a title, shown to the user during comparisons.
/// Never consulted by the ranking algorithm itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TitleDetails {
    pub id: TitleId,
    pub name: String,
    pub content_type: ContentType,
    pub release_year: Option<i32>,
    pub poster_path: Option<String>,
    pub overview: Option<String>,
}

/// Raw title entry from the TMDB API (search results and detail lookups
/// share this shape; movies carry `title`/`release_date`, shows carry
/// `name`/`first_air_date`)
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbTitle {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

impl TmdbTitle {
    /// Converts the raw entry into our display model for the given catalog
    pub fn into_details(self, content_type: ContentType) -> TitleDetails {
        let name = self
            .title
            .or(self.name)
            .unwrap_or_else(|| "Untitled".to_string());

        // "YYYY-MM-DD" - the year prefix is all we surface
        let release_year = self
            .release_date
            .or(self.first_air_date)
            .and_then(|date| date.get(..4).and_then(|y| y.parse::<i32>().ok()));

        TitleDetails {
            id: TitleId(self.id.to_string()),
            name,
            content_type,
            release_year,
            poster_path: self.poster_path,
            overview: self.overview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_round_trip() {
        assert_eq!("movie".parse::<ContentType>().unwrap(), ContentType::Movie);
        assert_eq!("show".parse::<ContentType>().unwrap(), ContentType::Show);
        assert!("podcast".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_tmdb_movie_into_details() {
        let json = r#"{
            "id": 27205,
            "title": "Inception",
            "release_date": "2010-07-15",
            "poster_path": "/inception.jpg",
            "overview": "A thief who steals corporate secrets."
        }"#;

        let raw: TmdbTitle = serde_json::from_str(json).unwrap();
        let details = raw.into_details(ContentType::Movie);

        assert_eq!(details.id, TitleId::from("27205"));
        assert_eq!(details.name, "Inception");
        assert_eq!(details.release_year, Some(2010));
        assert_eq!(details.poster_path, Some("/inception.jpg".to_string()));
    }

    #[test]
    fn test_tmdb_show_into_details() {
        let json = r#"{
            "id": 1396,
            "name": "Breaking Bad",
            "first_air_date": "2008-01-20"
        }"#;

        let raw: TmdbTitle = serde_json::from_str(json).unwrap();
        let details = raw.into_details(ContentType::Show);

        assert_eq!(details.name, "Breaking Bad");
        assert_eq!(details.content_type, ContentType::Show);
        assert_eq!(details.release_year, Some(2008));
        assert_eq!(details.poster_path, None);
    }
}

use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use super::Identified;
use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackSummary {
    pub id: Uuid,
    pub title: String,
    pub artist_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub product_type: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub role: String,
}

impl Identified for TrackSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for ArticleSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for ProductSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for UserSummary {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// Which content families a content report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Tracks,
    Articles,
    All,
}

impl ContentType {
    pub fn includes_tracks(self) -> bool {
        matches!(self, ContentType::Tracks | ContentType::All)
    }

    pub fn includes_articles(self) -> bool {
        matches!(self, ContentType::Articles | ContentType::All)
    }
}

impl FromStr for ContentType {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tracks" | "track" => Ok(ContentType::Tracks),
            "articles" | "article" => Ok(ContentType::Articles),
            "all" => Ok(ContentType::All),
            _ => Err(CoreError::InvalidContentType(value.to_string())),
        }
    }
}

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Signup,
    Order,
    Post,
    Comment,
}

impl FromStr for ActivityKind {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "signup" => Ok(ActivityKind::Signup),
            "order" => Ok(ActivityKind::Order),
            "post" => Ok(ActivityKind::Post),
            "comment" => Ok(ActivityKind::Comment),
            other => Err(CoreError::InvalidActivityKind(other.to_string())),
        }
    }
}

/// One line of the dashboard activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub kind: ActivityKind,
    pub entity_id: Uuid,
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

//! Cursor pagination contract shared by every list endpoint.
//!
//! The store is asked for `limit + 1` rows; the extra row only signals that
//! another page exists and is never returned.

use std::str::FromStr;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::Identified;
use crate::error::CoreError;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Validates a caller-supplied page size. Out-of-range values are rejected,
/// not clamped.
pub fn parse_limit(raw: Option<i64>, default: i64) -> Result<i64, CoreError> {
    let value = raw.unwrap_or(default);
    if !(1..=MAX_LIMIT).contains(&value) {
        return Err(CoreError::InvalidLimit {
            value,
            max: MAX_LIMIT,
        });
    }
    Ok(value)
}

/// Reads an optional integer query parameter. Blank means absent.
pub fn parse_int_param(field: &str, raw: Option<&str>) -> Result<Option<i64>, CoreError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| CoreError::InvalidFilterValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: i64,
    pub cursor: Option<Uuid>,
}

impl PageRequest {
    pub fn new(limit: Option<i64>, cursor: Option<&str>) -> Result<Self, CoreError> {
        let limit = parse_limit(limit, DEFAULT_LIMIT)?;
        let cursor = cursor
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| {
                Uuid::parse_str(value).map_err(|_| CoreError::InvalidCursor(value.to_string()))
            })
            .transpose()?;
        Ok(Self { limit, cursor })
    }

    pub fn fetch_limit(&self) -> i64 {
        self.limit + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Uuid>,
}

impl<T: Identified> Page<T> {
    /// Builds a page from up to `limit + 1` ordered rows.
    pub fn from_lookahead(mut rows: Vec<T>, limit: i64) -> Self {
        let limit = usize::try_from(limit).unwrap_or(0);
        if rows.len() <= limit {
            return Self {
                items: rows,
                next_cursor: None,
            };
        }
        rows.truncate(limit);
        let next_cursor = rows.last().map(Identified::id);
        Self {
            items: rows,
            next_cursor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(CoreError::InvalidSortDirection(value.to_string())),
        }
    }
}

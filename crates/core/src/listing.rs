//! Query schema for the generic entity list endpoints.
//!
//! Every listable entity declares a [`ListSpec`]; incoming query parameters
//! are validated against it before any SQL is built, so every column name
//! reaching the store comes from a static whitelist.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::error::CoreError;
use crate::pagination::{PageRequest, SortDirection, parse_int_param};

pub const DEFAULT_SORT: &str = "created_at";
pub const MAX_SEARCH_LEN: usize = 200;

#[derive(Debug)]
pub struct ListSpec {
    pub name: &'static str,
    pub table: &'static str,
    /// Select list, already qualified for `table`.
    pub columns: &'static str,
    pub search_columns: &'static [&'static str],
    /// Non-null columns callers may order by. Must include `created_at`.
    pub sort_columns: &'static [&'static str],
    /// Foreign-key columns filterable by id.
    pub ref_filters: &'static [&'static str],
    pub flag_filters: &'static [&'static str],
    /// Text columns restricted to a fixed value set.
    pub enum_filters: &'static [(&'static str, &'static [&'static str])],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    Ref {
        column: &'static str,
        id: Uuid,
    },
    Flag {
        column: &'static str,
        value: bool,
    },
    Tag {
        column: &'static str,
        value: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: PageRequest,
    pub search: Option<String>,
    pub filters: Vec<ListFilter>,
    pub sort_by: &'static str,
    pub direction: SortDirection,
}

impl ListQuery {
    pub fn parse(spec: &ListSpec, params: &BTreeMap<String, String>) -> Result<Self, CoreError> {
        let limit = parse_int_param("limit", params.get("limit").map(String::as_str))?;
        let page = PageRequest::new(limit, params.get("cursor").map(String::as_str))?;

        let search = match params.get("search").map(|raw| raw.trim()) {
            None | Some("") => None,
            Some(_) if spec.search_columns.is_empty() => {
                return Err(CoreError::UnknownFilter("search".to_string()));
            }
            Some(term) if term.chars().count() > MAX_SEARCH_LEN => {
                return Err(CoreError::InvalidFilterValue {
                    field: "search".to_string(),
                    value: term.chars().take(32).collect(),
                });
            }
            Some(term) => Some(term.to_string()),
        };

        let sort_by = match params.get("sort_by").map(|raw| raw.trim()) {
            None | Some("") => DEFAULT_SORT,
            Some(requested) => spec
                .sort_columns
                .iter()
                .copied()
                .find(|column| *column == requested)
                .ok_or_else(|| CoreError::InvalidSort(requested.to_string()))?,
        };
        let direction = match params.get("sort_direction") {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => SortDirection::default(),
        };

        let mut filters = Vec::new();
        for (key, raw) in params {
            if matches!(
                key.as_str(),
                "limit" | "cursor" | "search" | "sort_by" | "sort_direction"
            ) {
                continue;
            }
            filters.push(parse_filter(spec, key, raw)?);
        }

        Ok(Self {
            page,
            search,
            filters,
            sort_by,
            direction,
        })
    }
}

fn parse_filter(spec: &ListSpec, key: &str, raw: &str) -> Result<ListFilter, CoreError> {
    let invalid = || CoreError::InvalidFilterValue {
        field: key.to_string(),
        value: raw.to_string(),
    };
    let value = raw.trim();

    if let Some(column) = spec.ref_filters.iter().copied().find(|c| *c == key) {
        let id = Uuid::parse_str(value).map_err(|_| invalid())?;
        return Ok(ListFilter::Ref { column, id });
    }
    if let Some(column) = spec.flag_filters.iter().copied().find(|c| *c == key) {
        let value = match value.to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return Err(invalid()),
        };
        return Ok(ListFilter::Flag { column, value });
    }
    if let Some((column, allowed)) = spec.enum_filters.iter().find(|(c, _)| *c == key) {
        let value = allowed
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(value))
            .ok_or_else(invalid)?;
        return Ok(ListFilter::Tag {
            column: *column,
            value,
        });
    }
    Err(CoreError::UnknownFilter(key.to_string()))
}

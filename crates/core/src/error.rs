use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid date range: {0}")]
    InvalidTimeRange(String),
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("unknown period: {0}")]
    InvalidPeriod(String),
    #[error("limit must be between 1 and {max}: {value}")]
    InvalidLimit { value: i64, max: i64 },
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("unsupported sort column: {0}")]
    InvalidSort(String),
    #[error("invalid sort direction: {0}")]
    InvalidSortDirection(String),
    #[error("unknown filter: {0}")]
    UnknownFilter(String),
    #[error("invalid value for {field}: {value}")]
    InvalidFilterValue { field: String, value: String },
    #[error("unknown content type: {0}")]
    InvalidContentType(String),
    #[error("unknown activity kind: {0}")]
    InvalidActivityKind(String),
    #[error("unknown order status: {0}")]
    InvalidOrderStatus(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("retention offset must be between 0 and {max} days: {value}")]
    InvalidRetentionOffset { value: i64, max: i64 },
}

impl CoreError {
    /// Name of the request field that carried the rejected value.
    pub fn field(&self) -> &str {
        match self {
            CoreError::InvalidTimeRange(_) | CoreError::InvalidDate(_) => "range",
            CoreError::InvalidPeriod(_) => "period",
            CoreError::InvalidLimit { .. } => "limit",
            CoreError::InvalidCursor(_) => "cursor",
            CoreError::InvalidId(_) => "id",
            CoreError::InvalidSort(_) => "sort_by",
            CoreError::InvalidSortDirection(_) => "sort_direction",
            CoreError::UnknownFilter(name) => name,
            CoreError::InvalidFilterValue { field, .. } => field,
            CoreError::InvalidContentType(_) => "content_type",
            CoreError::InvalidActivityKind(_) => "kind",
            CoreError::InvalidOrderStatus(_) => "status",
            CoreError::InvalidPath(_) => "path",
            CoreError::InvalidRetentionOffset { .. } => "offset_days",
        }
    }
}

/// Failure reported by the backing store. Never retried by the engine.
#[derive(Debug, Error)]
#[error("data access error: {source}")]
pub struct DataAccessError {
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl DataAccessError {
    pub fn new<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            source: source.into(),
        }
    }
}

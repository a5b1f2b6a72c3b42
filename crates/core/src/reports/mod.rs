//! Report assemblers. Each one resolves nothing on its own: it takes a
//! window, fans independent reads out with `try_join!` and shapes the
//! result. The first failing read aborts the whole report.

pub mod content;
pub mod dashboard;
pub mod overview;
pub mod page_views;
pub mod revenue;
pub mod users;

use crate::error::CoreError;
use crate::pagination::parse_limit;

pub use content::{ContentAnalytics, content_analytics};
pub use dashboard::{Dashboard, dashboard};
pub use overview::{OverviewReport, overview};
pub use page_views::{PageViewReport, normalize_path, page_views};
pub use revenue::{RevenueAnalytics, revenue_analytics};
pub use users::{UserAnalytics, user_analytics};

/// Default size of top-N sections.
pub const DEFAULT_TOP_LIMIT: i64 = 10;

/// Role breakdown is a small closed set; this only caps runaway data.
pub(crate) const ROLE_LIMIT: i64 = 50;

pub fn parse_top_limit(raw: Option<i64>) -> Result<i64, CoreError> {
    parse_limit(raw, DEFAULT_TOP_LIMIT)
}

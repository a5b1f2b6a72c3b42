pub mod domain;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod pagination;
pub mod reports;
pub mod store;
pub mod types;

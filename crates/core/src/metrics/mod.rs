pub mod aggregate;
pub mod rate;
pub mod ranking;
pub mod retention;

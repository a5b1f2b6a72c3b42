pub mod period;
pub mod time_range;

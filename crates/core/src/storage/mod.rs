pub mod rate_history;
pub mod universe;

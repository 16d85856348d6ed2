pub mod market;
pub mod news;
pub mod rates;
pub mod report;

pub mod gatherer;
pub mod news;
pub mod provider;
pub mod types;

pub mod ghost;
pub mod telegram;

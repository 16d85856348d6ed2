use chrono::NaiveDateTime;
use serde::Serialize;

pub const PUBLISHED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub text: String,
    #[serde(rename = "publishedDate")]
    pub published: NaiveDateTime,
}

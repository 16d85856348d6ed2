use crate::browser::BrowserSession;
use std::time::Duration;

pub const DEFAULT_RECAP_URL: &str =
    "https://www.edwardjones.com/us-en/market-news-insights/stock-market-news/daily-market-recap";
pub const RECAP_SELECTOR: &str = ".rich-text.relative";

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);
const SELECTOR_TIMEOUT: Duration = Duration::from_secs(10);
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Source of the externally published daily recap text.
#[async_trait::async_trait]
pub trait RecapSource: Send + Sync {
    /// Empty string means "no recap available"; callers do not retry.
    async fn fetch_recap(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct WebRecapScraper {
    url: String,
    selector: String,
}

impl WebRecapScraper {
    pub fn from_env() -> Self {
        let url = std::env::var("RECAP_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RECAP_URL.to_string());
        Self {
            url,
            selector: RECAP_SELECTOR.to_string(),
        }
    }

    async fn scrape(&self) -> anyhow::Result<String> {
        let session = BrowserSession::launch(None).await?;
        let result = self.scrape_with(&session).await;
        session.close().await;
        result
    }

    async fn scrape_with(&self, session: &BrowserSession) -> anyhow::Result<String> {
        let page = session.open(&self.url, NAVIGATION_TIMEOUT).await?;

        let waited = tokio::time::timeout(SELECTOR_TIMEOUT, async {
            loop {
                match page.find_elements(self.selector.as_str()).await {
                    Ok(found) if !found.is_empty() => return found,
                    _ => tokio::time::sleep(SELECTOR_POLL).await,
                }
            }
        })
        .await;

        let Ok(elements) = waited else {
            tracing::warn!(selector = %self.selector, url = %self.url, "selector not found on page");
            return Ok(String::new());
        };

        let mut blocks = Vec::with_capacity(elements.len());
        for element in elements {
            if let Some(text) = element.inner_text().await? {
                blocks.push(text);
            }
        }
        Ok(join_blocks(blocks))
    }
}

#[async_trait::async_trait]
impl RecapSource for WebRecapScraper {
    async fn fetch_recap(&self) -> String {
        match self.scrape().await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(url = %self.url, error = %format!("{err:#}"), "error scraping market recap");
                String::new()
            }
        }
    }
}

/// Blank blocks are skipped; the rest are separated by a blank line.
pub fn join_blocks(blocks: Vec<String>) -> String {
    blocks
        .into_iter()
        .filter(|b| !b.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_non_blank_blocks_with_blank_line() {
        let out = join_blocks(vec![
            "Stocks rose.".to_string(),
            "   \n".to_string(),
            "Bonds fell.".to_string(),
        ]);
        assert_eq!(out, "Stocks rose.\n\nBonds fell.");
    }

    #[test]
    fn no_blocks_is_empty_content() {
        assert_eq!(join_blocks(Vec::new()), "");
    }
}

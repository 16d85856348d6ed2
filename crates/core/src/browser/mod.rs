pub mod rasterizer;
pub mod scraper;

use anyhow::Context;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, GetFrameTreeParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;

/// A headless Chromium process plus the task driving its CDP connection.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    pub async fn launch(viewport: Option<Viewport>) -> anyhow::Result<Self> {
        let mut builder = BrowserConfig::builder();
        if let Some(vp) = viewport {
            builder = builder.window_size(vp.width, vp.height).viewport(vp);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("invalid browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch headless browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "browser handler event error");
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Opens `url` and waits for the load, bounded by `timeout`.
    pub async fn open(&self, url: &str, timeout: Duration) -> anyhow::Result<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open browser tab")?;

        tokio::time::timeout(timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .with_context(|| format!("navigation to {url} timed out after {timeout:?}"))?
        .with_context(|| format!("navigation to {url} failed"))?;

        Ok(page)
    }

    /// Opens `url` and waits until the main frame reports network idle,
    /// so late fonts and chart scripts have settled before a screenshot.
    pub async fn open_until_idle(&self, url: &str, timeout: Duration) -> anyhow::Result<Page> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open browser tab")?;

        tokio::time::timeout(timeout, async {
            page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
            let mut events = page.event_listener::<EventLifecycleEvent>().await?;

            page.goto(url).await?;
            let tree = page.execute(GetFrameTreeParams::default()).await?;
            let loader = tree.result.frame_tree.frame.loader_id.clone();

            while let Some(event) = events.next().await {
                if is_network_idle(&event.name, event.loader_id.inner(), loader.inner()) {
                    return Ok(());
                }
            }
            Err(anyhow::anyhow!("lifecycle stream closed before network idle"))
        })
        .await
        .with_context(|| format!("network idle on {url} timed out after {timeout:?}"))?
        .with_context(|| format!("navigation to {url} failed"))?;

        Ok(page)
    }

    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            tracing::debug!(error = %err, "browser close failed");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

fn is_network_idle(event_name: &str, event_loader: &str, document_loader: &str) -> bool {
    event_name == "networkIdle" && event_loader == document_loader
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_idle_only_counts_for_the_loaded_document() {
        assert!(is_network_idle("networkIdle", "L2", "L2"));
        // about:blank settles under a different loader
        assert!(!is_network_idle("networkIdle", "L1", "L2"));
        assert!(!is_network_idle("networkAlmostIdle", "L2", "L2"));
        assert!(!is_network_idle("load", "L2", "L2"));
    }
}

use crate::browser::BrowserSession;
use anyhow::Context;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use std::path::{Path, PathBuf};
use std::time::Duration;

const VIEWPORT_WIDTH: u32 = 1000;
const VIEWPORT_HEIGHT: u32 = 2000;
const DEVICE_SCALE_FACTOR: f64 = 3.0;
const LOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub const CONTAINER_SELECTOR: &str = ".infographic-container";

/// Hides sections 4-6 and the footer, leaving header + sections 1-3.
pub const SHOW_PART_ONE_JS: &str = r#"
(() => {
    const hide = (sel) => { const el = document.querySelector(sel); if (el) el.style.display = 'none'; };
    hide('.section:nth-of-type(4)');
    hide('.section:nth-of-type(5)');
    hide('.section:nth-of-type(6)');
    hide('.footer');
})()
"#;

/// Restores sections 4-6 and the footer, then hides header + sections 1-3.
pub const SHOW_PART_TWO_JS: &str = r#"
(() => {
    const set = (sel, display) => { const el = document.querySelector(sel); if (el) el.style.display = display; };
    set('.section:nth-of-type(4)', 'block');
    set('.section:nth-of-type(5)', 'block');
    set('.section:nth-of-type(6)', 'block');
    set('.footer', 'block');
    set('.header', 'none');
    set('.section:nth-of-type(1)', 'none');
    set('.section:nth-of-type(2)', 'none');
    set('.section:nth-of-type(3)', 'none');
})()
"#;

/// Turns a rendered dashboard into chat-sized images.
#[async_trait::async_trait]
pub trait Rasterizer: Send + Sync {
    /// Returns the image paths in delivery order.
    async fn capture(&self, html_path: &Path) -> anyhow::Result<Vec<PathBuf>>;
}

/// Two element screenshots of the same container, written next to the HTML file.
#[derive(Debug, Clone, Default)]
pub struct ChromeRasterizer;

impl ChromeRasterizer {
    fn viewport() -> Viewport {
        Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(DEVICE_SCALE_FACTOR),
            emulating_mobile: false,
            is_landscape: false,
            has_touch: false,
        }
    }

    async fn capture_with(
        session: &BrowserSession,
        html_path: &Path,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let abs = html_path
            .canonicalize()
            .with_context(|| format!("rendered report not found: {}", html_path.display()))?;
        let url = format!("file://{}", abs.display());
        let page = session.open_until_idle(&url, LOAD_TIMEOUT).await?;

        let (part1, part2) = part_paths(html_path);

        toggle(&page, SHOW_PART_ONE_JS).await?;
        screenshot_container(&page, &part1).await?;
        tracing::info!(path = %part1.display(), "captured part 1");

        toggle(&page, SHOW_PART_TWO_JS).await?;
        screenshot_container(&page, &part2).await?;
        tracing::info!(path = %part2.display(), "captured part 2");

        Ok(vec![part1, part2])
    }
}

#[async_trait::async_trait]
impl Rasterizer for ChromeRasterizer {
    async fn capture(&self, html_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let session = BrowserSession::launch(Some(Self::viewport())).await?;
        let result = Self::capture_with(&session, html_path).await;
        session.close().await;
        result
    }
}

async fn toggle(page: &Page, script: &str) -> anyhow::Result<()> {
    page.evaluate(script)
        .await
        .context("failed to toggle report sections")?;
    Ok(())
}

async fn screenshot_container(page: &Page, out: &Path) -> anyhow::Result<()> {
    let container = page
        .find_element(CONTAINER_SELECTOR)
        .await
        .with_context(|| format!("{CONTAINER_SELECTOR} not found in rendered report"))?;
    container
        .save_screenshot(CaptureScreenshotFormat::Png, out)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    Ok(())
}

/// `<stem>_part1.png` and `<stem>_part2.png` beside the HTML file.
pub fn part_paths(html_path: &Path) -> (PathBuf, PathBuf) {
    let stem = html_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    (
        html_path.with_file_name(format!("{stem}_part1.png")),
        html_path.with_file_name(format!("{stem}_part2.png")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_paths_sit_beside_html() {
        let (a, b) = part_paths(Path::new("/tmp/run/market_report_20260127.html"));
        assert_eq!(a, PathBuf::from("/tmp/run/market_report_20260127_part1.png"));
        assert_eq!(b, PathBuf::from("/tmp/run/market_report_20260127_part2.png"));
    }

    #[test]
    fn toggles_are_disjoint() {
        for n in 1..=3 {
            let sel = format!(".section:nth-of-type({n})");
            assert!(!SHOW_PART_ONE_JS.contains(&sel));
            assert!(SHOW_PART_TWO_JS.contains(&format!("set('{sel}', 'none')")));
        }
        for n in 4..=6 {
            let sel = format!(".section:nth-of-type({n})");
            assert!(SHOW_PART_ONE_JS.contains(&format!("hide('{sel}')")));
            assert!(SHOW_PART_TWO_JS.contains(&format!("set('{sel}', 'block')")));
        }
    }
}

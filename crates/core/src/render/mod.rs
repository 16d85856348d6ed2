pub mod prompt;

use crate::domain::report::{LayoutKind, MarketDataBag, RenderedReport};
use crate::llm::json::strip_code_fence;
use crate::llm::{GenerateInput, LlmClient};
use anyhow::Context;
use chrono::NaiveDate;
use std::path::Path;

// A full HTML document is far longer than a summary.
const RENDER_MAX_TOKENS: u32 = 16_000;

/// Fills a layout template from the data bag through the generative backend.
///
/// Unlike summarization, every failure here is returned to the caller.
pub struct ReportRenderer<'a> {
    llm: &'a dyn LlmClient,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    pub async fn render(
        &self,
        layout: LayoutKind,
        target_date: NaiveDate,
        bag: &MarketDataBag,
        template: &str,
        out_dir: &Path,
    ) -> anyhow::Result<RenderedReport> {
        let input = GenerateInput::new(prompt::build_prompt(layout, target_date, bag, template))
            .with_max_tokens(RENDER_MAX_TOKENS);

        let raw = self
            .llm
            .generate_text(input)
            .await
            .with_context(|| format!("{layout:?} render failed"))?;
        let html = strip_code_fence(&raw);
        anyhow::ensure!(!html.is_empty(), "{layout:?} render returned an empty document");

        let path = out_dir.join(report_file_name(layout, target_date));
        tokio::fs::write(&path, &html)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;

        tracing::info!(?layout, path = %path.display(), bytes = html.len(), "report rendered");
        Ok(RenderedReport {
            layout,
            target_date,
            html,
            path,
        })
    }
}

/// `market_report_20260127.html` / `email_report_20260127.html`.
pub fn report_file_name(layout: LayoutKind, target_date: NaiveDate) -> String {
    format!("{}_{}.html", layout.file_prefix(), target_date.format("%Y%m%d"))
}

pub fn template_path(dir: &Path, layout: LayoutKind) -> std::path::PathBuf {
    dir.join(layout.template_file())
}

pub async fn load_template(dir: &Path, layout: LayoutKind) -> anyhow::Result<String> {
    let path = template_path(dir, layout);
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("template not found: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLlm;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 27).unwrap()
    }

    fn empty_bag() -> MarketDataBag {
        MarketDataBag {
            index_lines: Vec::new(),
            rate_view: None,
            movers: Vec::new(),
            symbol_summaries: Default::default(),
            trending_summaries: Default::default(),
            recap_points: Vec::new(),
        }
    }

    #[test]
    fn file_names_follow_layout_prefix() {
        assert_eq!(report_file_name(LayoutKind::Dashboard, date()), "market_report_20260127.html");
        assert_eq!(report_file_name(LayoutKind::Email, date()), "email_report_20260127.html");
    }

    #[tokio::test]
    async fn strips_fence_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let llm = FakeLlm::default().with_text("```html\n<html><body>ok</body></html>\n```");
        let report = ReportRenderer::new(&llm)
            .render(LayoutKind::Dashboard, date(), &empty_bag(), "<html></html>", dir.path())
            .await
            .unwrap();

        assert_eq!(report.html, "<html><body>ok</body></html>");
        assert_eq!(report.path, dir.path().join("market_report_20260127.html"));
        let on_disk = std::fs::read_to_string(&report.path).unwrap();
        assert_eq!(on_disk, report.html);
    }

    #[tokio::test]
    async fn backend_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let llm = FakeLlm::failing("overloaded");
        let err = ReportRenderer::new(&llm)
            .render(LayoutKind::Email, date(), &empty_bag(), "", dir.path())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("overloaded"));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_template(dir.path(), LayoutKind::Dashboard).await.is_err());

        std::fs::write(dir.path().join("dashboard_template.html"), "<html/>").unwrap();
        assert_eq!(
            load_template(dir.path(), LayoutKind::Dashboard).await.unwrap(),
            "<html/>"
        );
    }
}

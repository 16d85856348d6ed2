use crate::browser::rasterizer::Rasterizer;
use crate::browser::scraper::RecapSource;
use crate::config::Settings;
use crate::delivery::ghost::{created_title, BlogPublisher, PostDraft, PostStatus};
use crate::delivery::telegram::{deliver_images, PhotoSender};
use crate::domain::market::{MARKET_SYMBOLS, SECTOR_ETFS};
use crate::domain::rates::RateView;
use crate::domain::report::{display_date, LayoutKind, MarketDataBag, SymbolSummaries};
use crate::ingest::gatherer::{MarketGatherer, UniverseSource};
use crate::ingest::news::NewsAggregator;
use crate::ingest::provider::{MarketDataProvider, NewsFeed};
use crate::llm::LlmClient;
use crate::pipeline::stage::{RunReport, StageOutcome};
use crate::render::{load_template, template_path, ReportRenderer};
use crate::storage::rate_history::RateHistoryStore;
use crate::summarize::Summarizer;
use anyhow::Context;
use chrono::NaiveDate;
use std::path::Path;
use tracing::Instrument;

const TRENDING_SYMBOLS: usize = 3;
const BLOG_TAG: &str = "Market Report";

/// External services one run talks to. Delivery channels are `None` when unconfigured.
pub struct Collaborators<'a> {
    pub provider: &'a dyn MarketDataProvider,
    pub llm: &'a dyn LlmClient,
    pub recap: &'a dyn RecapSource,
    pub rasterizer: &'a dyn Rasterizer,
    pub photos: Option<&'a dyn PhotoSender>,
    pub blog: Option<&'a dyn BlogPublisher>,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Date printed on the report.
    pub target_date: NaiveDate,
    /// Reference date for news windows.
    pub today: NaiveDate,
    /// Collect, render and rasterize, but deliver nothing.
    pub dry_run: bool,
}

pub struct Pipeline<'a> {
    settings: &'a Settings,
    c: Collaborators<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &'a Settings, collaborators: Collaborators<'a>) -> Self {
        Self {
            settings,
            c: collaborators,
        }
    }

    /// One full run: collect, render dashboard, rasterize, deliver, then the optional blog branch.
    ///
    /// Only a fatal stage returns `Err`. All artifacts live in a temporary directory that is
    /// removed when this returns.
    pub async fn run_once(&self, opts: RunOptions) -> anyhow::Result<RunReport> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, target_date = %opts.target_date);
        self.run_inner(opts).instrument(span).await
    }

    async fn run_inner(&self, opts: RunOptions) -> anyhow::Result<RunReport> {
        tracing::info!(
            dry_run = opts.dry_run,
            provider = self.c.provider.provider_name(),
            llm = ?self.c.llm.provider(),
            "run started"
        );
        let mut report = RunReport::default();

        let bag = self.collect(opts.today, &mut report).await;
        tracing::info!(
            index_lines = bag.index_lines.len(),
            movers = bag.movers.len(),
            recap_points = bag.recap_points.len(),
            "data collection complete"
        );

        let workdir = tempfile::Builder::new()
            .prefix("market-recap-")
            .tempdir()
            .context("failed to create run directory")?;
        tracing::debug!(path = %workdir.path().display(), "run directory created");

        let renderer = ReportRenderer::new(self.c.llm);

        let template = load_template(&self.settings.template_dir, LayoutKind::Dashboard).await?;
        let dashboard = renderer
            .render(LayoutKind::Dashboard, opts.target_date, &bag, &template, workdir.path())
            .await?;
        report.complete("render_dashboard");

        let images = self
            .c
            .rasterizer
            .capture(&dashboard.path)
            .await
            .context("rasterize failed")?;
        report.complete("rasterize");

        match (opts.dry_run, self.c.photos) {
            (true, _) => report.skipped("deliver_images", "dry run"),
            (false, None) => report.skipped("deliver_images", "telegram credentials missing"),
            (false, Some(sender)) => {
                let sent = deliver_images(sender, &images).await?;
                tracing::info!(sent, "images delivered");
                report.complete("deliver_images");
            }
        }

        self.publish_branch(&renderer, &bag, opts, workdir.path(), &mut report)
            .await;

        tracing::info!(degraded = report.degraded_count(), "run finished");
        Ok(report)
    }

    /// Every sub-stage degrades instead of failing; the result is immutable afterwards.
    pub async fn collect(&self, today: NaiveDate, report: &mut RunReport) -> MarketDataBag {
        let gatherer = MarketGatherer::new(self.c.provider);
        let summarizer = Summarizer::new(self.c.llm);
        let news = NewsAggregator::new(self.c.provider, &summarizer);

        let indices = gatherer.index_lines(MARKET_SYMBOLS).await;
        report.record("indices", &indices);
        let mut index_lines = indices.into_value();

        let sectors = gatherer.sector_performance(SECTOR_ETFS).await;
        report.record("sectors", &sectors);
        index_lines.extend(sectors.into_value().iter().map(|s| s.line()));

        let rates = self.rates().await;
        report.record("rates", &rates);
        let rate_view = rates.into_value();

        let movers = gatherer
            .biggest_movers(&UniverseSource::File(self.settings.universe_path.clone()))
            .await;
        report.record("movers", &movers);
        let movers = movers.into_value();

        let mover_symbols: Vec<String> = movers.iter().map(|m| m.symbol.clone()).collect();
        let symbol_summaries = news
            .fetch_and_summarize(&mover_symbols, NewsFeed::SymbolNews, today)
            .await;
        report.record("mover_news", &symbol_summaries);

        let trending_summaries = if self.settings.trending_news {
            let outcome = match gatherer.most_mentioned_symbols(TRENDING_SYMBOLS).await {
                Ok(symbols) => news.fetch_and_summarize(&symbols, NewsFeed::StockNews, today).await,
                Err(err) => StageOutcome::degraded(
                    SymbolSummaries::default(),
                    format!("latest-news feed unavailable: {err:#}"),
                ),
            };
            report.record("trending_news", &outcome);
            outcome.into_value()
        } else {
            report.skipped("trending_news", "disabled");
            SymbolSummaries::default()
        };

        let raw_recap = self.c.recap.fetch_recap().await;
        let recap = if raw_recap.trim().is_empty() {
            StageOutcome::degraded(Vec::new(), "market recap unavailable")
        } else {
            let points = summarizer.summarize_recap(&raw_recap).await;
            if points.is_empty() {
                StageOutcome::degraded(points, "market recap summary empty")
            } else {
                StageOutcome::Complete(points)
            }
        };
        report.record("recap", &recap);

        MarketDataBag {
            index_lines,
            rate_view,
            movers,
            symbol_summaries: symbol_summaries.into_value(),
            trending_summaries,
            recap_points: recap.into_value(),
        }
    }

    /// Fresh snapshot merged into history; on fetch failure, history alone.
    ///
    /// History file I/O runs on the blocking pool.
    async fn rates(&self) -> StageOutcome<Option<RateView>> {
        let store = RateHistoryStore::new(self.settings.rate_history_path.clone());
        match self.c.provider.fetch_treasury_rates().await {
            Ok(snapshot) => {
                match tokio::task::spawn_blocking(move || store.upsert_and_query(snapshot)).await {
                    Ok(view) => StageOutcome::Complete(Some(view)),
                    Err(err) => StageOutcome::degraded(None, format!("rate history task failed: {err}")),
                }
            }
            Err(err) => {
                let reason = format!("treasury fetch failed: {err:#}");
                match tokio::task::spawn_blocking(move || store.query()).await {
                    Ok(view) if view.as_of.is_some() => {
                        StageOutcome::degraded(Some(view), format!("{reason}; using stored history"))
                    }
                    Ok(_) => StageOutcome::degraded(None, reason),
                    Err(join) => StageOutcome::degraded(
                        None,
                        format!("{reason}; rate history task failed: {join}"),
                    ),
                }
            }
        }
    }

    async fn publish_branch(
        &self,
        renderer: &ReportRenderer<'_>,
        bag: &MarketDataBag,
        opts: RunOptions,
        workdir: &Path,
        report: &mut RunReport,
    ) {
        let Some(blog) = self.c.blog else {
            report.skipped("render_email", "ghost credentials missing");
            return;
        };

        let path = template_path(&self.settings.template_dir, LayoutKind::Email);
        if !path.exists() {
            report.skipped("render_email", format!("{} not found", path.display()));
            return;
        }

        let email = match load_template(&self.settings.template_dir, LayoutKind::Email).await {
            Ok(template) => {
                renderer
                    .render(LayoutKind::Email, opts.target_date, bag, &template, workdir)
                    .await
            }
            Err(err) => Err(err),
        };
        let email = match email {
            Ok(email) => email,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "email render failed; blog post skipped");
                report.record(
                    "render_email",
                    &StageOutcome::degraded((), format!("render failed: {err:#}")),
                );
                return;
            }
        };
        report.complete("render_email");

        if opts.dry_run {
            report.skipped("publish_blog", "dry run");
            return;
        }

        let post = PostDraft {
            title: format!("US Market Close Report {}", display_date(opts.target_date)),
            html: email.html,
            status: PostStatus::Draft,
            tags: vec![BLOG_TAG.to_string()],
            codeinjection_head: None,
            codeinjection_foot: None,
        };
        match blog.create_post(&post).await {
            Some(res) => {
                let title = created_title(&res).unwrap_or(post.title.as_str());
                tracing::info!(%title, "blog post created");
                report.complete("publish_blog");
            }
            None => report.record(
                "publish_blog",
                &StageOutcome::degraded((), "blog platform rejected the post"),
            ),
        }
    }
}

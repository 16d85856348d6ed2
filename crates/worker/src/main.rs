use anyhow::Context;
use clap::Parser;
use recap_core::browser::rasterizer::ChromeRasterizer;
use recap_core::browser::scraper::WebRecapScraper;
use recap_core::config::Settings;
use recap_core::delivery::ghost::{BlogPublisher, GhostClient};
use recap_core::delivery::telegram::{PhotoSender, TelegramClient};
use recap_core::ingest::provider::FmpClient;
use recap_core::llm::anthropic::AnthropicClient;
use recap_core::llm::error::LlmDiagnosticsError;
use recap_core::pipeline::{Collaborators, Pipeline, RunOptions};
use recap_core::time::schedule;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "recap_worker")]
struct Args {
    /// Run every day at 05:55 local time instead of once.
    #[arg(long)]
    schedule: bool,

    /// Report date (YYYY-MM-DD). Defaults to today's local date. Ignored with --schedule.
    #[arg(long)]
    target_date: Option<String>,

    /// Collect, render and rasterize, but do not send or publish anything.
    #[arg(long)]
    dry_run: bool,
}

struct Clients {
    provider: FmpClient,
    llm: AnthropicClient,
    recap: WebRecapScraper,
    rasterizer: ChromeRasterizer,
    telegram: Option<TelegramClient>,
    ghost: Option<GhostClient>,
}

impl Clients {
    fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let telegram = match settings.telegram() {
            Some(creds) => optional_channel(
                "image delivery disabled",
                TelegramClient::from_credentials(&creds),
            ),
            None => {
                tracing::warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set; image delivery disabled");
                None
            }
        };
        let ghost = match settings.ghost() {
            Some(creds) => optional_channel(
                "blog publishing disabled",
                GhostClient::from_credentials(&creds),
            ),
            None => {
                tracing::info!("GHOST_API_URL or GHOST_ADMIN_API_KEY not set; blog publishing disabled");
                None
            }
        };

        Ok(Self {
            provider: FmpClient::from_settings(settings)?,
            llm: AnthropicClient::from_settings(settings)?,
            recap: WebRecapScraper::from_env(),
            rasterizer: ChromeRasterizer,
            telegram,
            ghost,
        })
    }

    fn pipeline<'a>(&'a self, settings: &'a Settings) -> Pipeline<'a> {
        Pipeline::new(
            settings,
            Collaborators {
                provider: &self.provider,
                llm: &self.llm,
                recap: &self.recap,
                rasterizer: &self.rasterizer,
                photos: self.telegram.as_ref().map(|c| c as &dyn PhotoSender),
                blog: self.ghost.as_ref().map(|c| c as &dyn BlogPublisher),
            },
        )
    }
}

/// A misconfigured optional channel is switched off instead of failing startup.
fn optional_channel<T>(disabled: &str, client: anyhow::Result<T>) -> Option<T> {
    match client {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "{disabled}");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let clients = Clients::from_settings(&settings).context("failed to build clients")?;
    let pipeline = clients.pipeline(&settings);

    if args.schedule {
        if args.target_date.is_some() {
            tracing::warn!("--target-date is ignored in schedule mode");
        }
        run_scheduled(&pipeline, args.dry_run).await;
        return Ok(());
    }

    let now = chrono::Local::now().naive_local();
    let target_date = schedule::resolve_target_date(args.target_date.as_deref(), now)?;
    run_guarded(
        &pipeline,
        RunOptions {
            target_date,
            today: now.date(),
            dry_run: args.dry_run,
        },
    )
    .await;
    Ok(())
}

/// Sleeps until the next trigger, runs once, repeats until interrupted.
async fn run_scheduled(pipeline: &Pipeline<'_>, dry_run: bool) {
    let at = schedule::daily_trigger_time();
    loop {
        let now = chrono::Local::now().naive_local();
        let next = schedule::next_trigger(now, at);
        tracing::info!(%next, "waiting for next scheduled run");

        tokio::select! {
            _ = tokio::time::sleep(schedule::until(now, next)) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; scheduler stopped");
                return;
            }
        }

        let today = chrono::Local::now().date_naive();
        run_guarded(
            pipeline,
            RunOptions {
                target_date: today,
                today,
                dry_run,
            },
        )
        .await;
    }
}

/// The one place run failures are caught. Never re-raises.
async fn run_guarded(pipeline: &Pipeline<'_>, opts: RunOptions) {
    match pipeline.run_once(opts).await {
        Ok(report) => {
            tracing::info!(
                target_date = %opts.target_date,
                stages = report.stages.len(),
                degraded = report.degraded_count(),
                "run complete"
            );
        }
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                tracing::error!(
                    provider = ?diag.provider,
                    stage = diag.stage,
                    raw_output = diag.raw_excerpt().unwrap_or(""),
                    "backend diagnostics"
                );
            }
            tracing::error!(target_date = %opts.target_date, error = ?err, "run failed");
        }
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::config::{GhostCredentials, TelegramCredentials};

    #[test]
    fn malformed_ghost_key_disables_publishing() {
        let creds = GhostCredentials {
            api_url: "https://blog.example.com".to_string(),
            admin_api_key: "no-separator".to_string(),
        };
        let ghost = optional_channel("blog publishing disabled", GhostClient::from_credentials(&creds));
        assert!(ghost.is_none());

        let creds = GhostCredentials {
            api_url: "https://blog.example.com".to_string(),
            admin_api_key: "abc:not-hex".to_string(),
        };
        assert!(optional_channel("blog publishing disabled", GhostClient::from_credentials(&creds)).is_none());
    }

    #[test]
    fn valid_channels_are_kept() {
        let creds = TelegramCredentials {
            bot_token: "123:abc".to_string(),
            chat_id: "-100".to_string(),
        };
        let telegram = optional_channel("image delivery disabled", TelegramClient::from_credentials(&creds));
        assert!(telegram.is_some());

        let creds = GhostCredentials {
            api_url: "https://blog.example.com/".to_string(),
            admin_api_key: "abc:00ff".to_string(),
        };
        assert!(optional_channel("blog publishing disabled", GhostClient::from_credentials(&creds)).is_some());
    }
}

pub mod browser;
pub mod delivery;
pub mod domain;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod summarize;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    const DEFAULT_RATE_HISTORY_PATH: &str = "resource/treasury.csv";
    const DEFAULT_UNIVERSE_PATH: &str = "resource/sp500_stock.csv";
    const DEFAULT_TEMPLATE_DIR: &str = "templates";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub fmp_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub telegram_bot_token: Option<String>,
        pub telegram_chat_id: Option<String>,
        pub ghost_api_url: Option<String>,
        pub ghost_admin_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub rate_history_path: PathBuf,
        pub universe_path: PathBuf,
        pub template_dir: PathBuf,
        pub trending_news: bool,
    }

    /// Bot token and destination chat, only present as a pair.
    #[derive(Debug, Clone)]
    pub struct TelegramCredentials {
        pub bot_token: String,
        pub chat_id: String,
    }

    /// Blog admin endpoint and `id:secret` admin key, only present as a pair.
    #[derive(Debug, Clone)]
    pub struct GhostCredentials {
        pub api_url: String,
        pub admin_api_key: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                fmp_api_key: non_empty_var("FMP_API_KEY"),
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
                telegram_chat_id: non_empty_var("TELEGRAM_CHAT_ID"),
                ghost_api_url: non_empty_var("GHOST_API_URL"),
                ghost_admin_api_key: non_empty_var("GHOST_ADMIN_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                rate_history_path: non_empty_var("RATE_HISTORY_PATH")
                    .unwrap_or_else(|| DEFAULT_RATE_HISTORY_PATH.to_string())
                    .into(),
                universe_path: non_empty_var("UNIVERSE_PATH")
                    .unwrap_or_else(|| DEFAULT_UNIVERSE_PATH.to_string())
                    .into(),
                template_dir: non_empty_var("TEMPLATE_DIR")
                    .unwrap_or_else(|| DEFAULT_TEMPLATE_DIR.to_string())
                    .into(),
                trending_news: non_empty_var("RECAP_TRENDING_NEWS")
                    .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false),
            })
        }

        pub fn require_fmp_api_key(&self) -> anyhow::Result<&str> {
            self.fmp_api_key.as_deref().context("FMP_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn telegram(&self) -> Option<TelegramCredentials> {
            Some(TelegramCredentials {
                bot_token: self.telegram_bot_token.clone()?,
                chat_id: self.telegram_chat_id.clone()?,
            })
        }

        pub fn ghost(&self) -> Option<GhostCredentials> {
            Some(GhostCredentials {
                api_url: self.ghost_api_url.clone()?,
                admin_api_key: self.ghost_admin_api_key.clone()?,
            })
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    #[cfg(test)]
    impl Settings {
        pub(crate) fn for_tests(root: &std::path::Path) -> Self {
            Self {
                fmp_api_key: Some("test".to_string()),
                anthropic_api_key: Some("test".to_string()),
                telegram_bot_token: None,
                telegram_chat_id: None,
                ghost_api_url: None,
                ghost_admin_api_key: None,
                sentry_dsn: None,
                rate_history_path: root.join("treasury.csv"),
                universe_path: root.join("universe.csv"),
                template_dir: root.join("templates"),
                trending_news: false,
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn credential_pairs_require_both_halves() {
            let mut s = Settings::for_tests(std::path::Path::new("/tmp"));
            s.telegram_bot_token = Some("token".to_string());
            assert!(s.telegram().is_none());

            s.telegram_chat_id = Some("-100".to_string());
            let tg = s.telegram().unwrap();
            assert_eq!(tg.chat_id, "-100");

            s.ghost_api_url = Some("https://blog.example".to_string());
            assert!(s.ghost().is_none());
        }
    }
}

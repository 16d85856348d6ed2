use crate::domain::news::NewsItem;
use crate::domain::report::{RecapPoint, NO_NEWS_PLACEHOLDER};
use crate::llm::{GenerateInput, JsonSchema, LlmClient};
use anyhow::Context;
use serde::Deserialize;

const RECAP_TOOL: &str = "emit_recap_points";

/// Turns raw news and scraped recap text into short summaries.
///
/// Never fails: backend errors become visible text or an empty list.
pub struct Summarizer<'a> {
    llm: &'a dyn LlmClient,
}

#[derive(Debug, Deserialize)]
struct RecapPoints {
    points: Vec<RecapPoint>,
}

impl<'a> Summarizer<'a> {
    pub fn new(llm: &'a dyn LlmClient) -> Self {
        Self { llm }
    }

    /// One or two sentences on what the news for `symbol` is mostly about.
    pub async fn summarize_news(&self, symbol: &str, items: &[NewsItem]) -> String {
        if items.is_empty() {
            return NO_NEWS_PLACEHOLDER.to_string();
        }

        let input = GenerateInput::new(news_prompt(symbol, items)).with_system(
            "You are a professional financial analyst. Reply with the summary only, \
             no introduction and no references to 'the news' or 'the article'.",
        );

        match self.llm.generate_text(input).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                tracing::warn!(%symbol, error = %err, "news summary failed");
                format!("Error generating summary: {err}")
            }
        }
    }

    /// Structured `{topic, summary}` points from the scraped daily recap.
    pub async fn summarize_recap(&self, raw_text: &str) -> Vec<RecapPoint> {
        if raw_text.trim().is_empty() {
            return Vec::new();
        }

        match self.request_recap(raw_text).await {
            Ok(points) => points,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "market recap summary failed");
                Vec::new()
            }
        }
    }

    async fn request_recap(&self, raw_text: &str) -> anyhow::Result<Vec<RecapPoint>> {
        let input = GenerateInput::new(recap_prompt(raw_text))
            .with_system("You are a professional financial analyst.");
        let value = self.llm.generate_json(input, recap_schema()).await?;

        // Accept a bare array too; some replies skip the wrapper object.
        let points = if value.is_array() {
            serde_json::from_value::<Vec<RecapPoint>>(value)
        } else {
            serde_json::from_value::<RecapPoints>(value).map(|p| p.points)
        }
        .context("recap response does not match {topic, summary} list")?;

        Ok(points
            .into_iter()
            .filter(|p| !p.topic.trim().is_empty() || !p.summary.trim().is_empty())
            .collect())
    }
}

fn news_prompt(symbol: &str, items: &[NewsItem]) -> String {
    let mut combined = String::new();
    for item in items {
        combined.push_str(&format!(
            "Title: {}\nContent: {}\n---\n",
            item.title, item.text
        ));
    }

    format!(
        "Read the following news about {symbol} and consolidate it.\n\
         In 1 to 2 sentences, state what most of this company's news is about \
         (for example: strong earnings, a new product launch, a lawsuit).\n\
         Output only the summary of the company.\n\n\
         News items:\n{combined}"
    )
}

fn recap_prompt(raw_text: &str) -> String {
    format!(
        "Read the following daily market recap.\n\
         Identify its key points (usually marked by headings or emphasis) and turn each one into \
         a structured entry with a short `topic` (e.g. equities, energy sector, bond market) and \
         a `summary` of 3 to 4 sentences. Do not introduce yourself.\n\n\
         Recap text:\n{raw_text}"
    )
}

fn recap_schema() -> JsonSchema {
    JsonSchema {
        name: RECAP_TOOL,
        description: "Emit the key points of the daily market recap",
        schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["points"],
            "properties": {
                "points": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "required": ["topic", "summary"],
                        "properties": {
                            "topic": {"type": "string"},
                            "summary": {"type": "string"}
                        }
                    }
                }
            }
        }),
    }
}

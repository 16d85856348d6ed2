pub mod anthropic;
pub mod error;
pub mod json;

/// One prompt for the generative backend.
#[derive(Debug, Clone)]
pub struct GenerateInput {
    pub system: Option<String>,
    pub prompt: String,
    /// Overrides the client's default output ceiling.
    pub max_tokens: Option<u32>,
}

impl GenerateInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Shape the backend must return in constrained-JSON mode.
#[derive(Debug, Clone)]
pub struct JsonSchema {
    pub name: &'static str,
    pub description: &'static str,
    /// Must be an object schema.
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Free-text response.
    async fn generate_text(&self, input: GenerateInput) -> anyhow::Result<String>;

    /// Constrained response matching `schema`.
    async fn generate_json(
        &self,
        input: GenerateInput,
        schema: JsonSchema,
    ) -> anyhow::Result<serde_json::Value>;
}

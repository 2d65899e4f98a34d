//! Abstracción sobre Rig para llamar al proveedor de LLM.
//! De momento se implementa OpenAI (Chat Completions en modo JSON).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rig::completion::Prompt;
use serde_json::json;

use crate::config::{AppConfig, LlmProvider};

/// Petición única al modelo: sin streaming, sin herramientas, sin historial.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f64,
    pub max_tokens: u64,
    /// Exige que la respuesta sea un único objeto JSON.
    pub json_mode: bool,
}

/// Capacidad externa de generación: (system, user, modo JSON) → texto.
///
/// Permite sustituir el proveedor real por uno simulado en los tests.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// `false` si falta la credencial; el generador no llamará a `complete`.
    fn has_credentials(&self) -> bool;

    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Gestor de LLMs basado en Rig.
#[derive(Clone)]
pub struct LlmManager {
    pub provider: LlmProvider,
    api_key: Option<String>,
}

impl std::fmt::Debug for LlmManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmManager")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            provider: cfg.llm_provider.clone(),
            api_key: cfg.llm_api_key.clone(),
        }
    }

    async fn complete_with_openai(&self, api_key: &str, request: &CompletionRequest) -> Result<String> {
        use rig::agent::AgentBuilder;
        use rig::client::CompletionClient as _;
        use rig::providers::openai;

        let client = openai::Client::new(api_key);

        // Chat Completions en lugar de Responses: `response_format` sólo existe ahí.
        let model = client
            .completion_model(&request.model)
            .completions_api();

        let mut builder = AgentBuilder::new(model)
            .preamble(&request.system_prompt)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens);

        if request.json_mode {
            builder = builder.additional_params(json!({
                "response_format": { "type": "json_object" }
            }));
        }

        let agent = builder.build();
        let answer = agent.prompt(request.user_prompt.as_str()).await?;
        Ok(answer)
    }
}

#[async_trait]
impl CompletionBackend for LlmManager {
    fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Falta la API key del proveedor LLM"))?;

        match self.provider {
            LlmProvider::OpenAI => self.complete_with_openai(api_key, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> AppConfig {
        AppConfig {
            llm_api_key: api_key.map(str::to_string),
            ..AppConfig::default()
        }
    }

    #[test]
    fn credentials_require_a_non_blank_key() {
        assert!(!LlmManager::from_config(&config(None)).has_credentials());
        assert!(!LlmManager::from_config(&config(Some("   "))).has_credentials());
        assert!(LlmManager::from_config(&config(Some("sk-test"))).has_credentials());
    }

    #[test]
    fn debug_output_hides_the_key() {
        let manager = LlmManager::from_config(&config(Some("sk-secreta")));
        let debug = format!("{manager:?}");
        assert!(!debug.contains("sk-secreta"));
        assert!(debug.contains("***"));
    }
}

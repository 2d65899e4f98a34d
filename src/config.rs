//! Carga y gestión de configuración de la aplicación (servidor + LLM).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,

    pub llm_provider: LlmProvider,
    /// Ausente no impide arrancar: cada generación falla con error de configuración.
    pub llm_api_key: Option<String>,
    pub llm_chat_model: String,
    pub llm_temperature: f64,
    pub llm_max_tokens: u64,

    /// Límite de espera de la capa HTTP alrededor de cada generación.
    pub request_timeout: Option<Duration>,
    /// Corpus alternativo; si no se indica se usa el incluido en el binario.
    pub knowledge_base_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3322".to_string(),
            llm_provider: LlmProvider::OpenAI,
            llm_api_key: None,
            llm_chat_model: "gpt-4-turbo-preview".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 4000,
            request_timeout: Some(Duration::from_secs(120)),
            knowledge_base_path: None,
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables inyectable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let server_addr = lookup("SERVER_ADDR").unwrap_or(defaults.server_addr);

        let llm_provider = match lookup("LLM_PROVIDER") {
            Some(p) => LlmProvider::from_str(&p)?,
            None => defaults.llm_provider,
        };

        let llm_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        let llm_chat_model = lookup("LLM_CHAT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(defaults.llm_chat_model);

        let llm_temperature = match lookup("LLM_TEMPERATURE") {
            Some(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or_else(|| anyhow!("LLM_TEMPERATURE inválida: {raw}"))?,
            None => defaults.llm_temperature,
        };

        let llm_max_tokens = match lookup("LLM_MAX_TOKENS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| anyhow!("LLM_MAX_TOKENS inválido: {raw}"))?,
            None => defaults.llm_max_tokens,
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow!("REQUEST_TIMEOUT_SECS inválido: {raw}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.request_timeout,
        };

        let knowledge_base_path = lookup("KNOWLEDGE_BASE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            server_addr,
            llm_provider,
            llm_api_key,
            llm_chat_model,
            llm_temperature,
            llm_max_tokens,
            request_timeout,
            knowledge_base_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.server_addr, "127.0.0.1:3322");
        assert_eq!(cfg.llm_provider, LlmProvider::OpenAI);
        assert_eq!(cfg.llm_api_key, None);
        assert_eq!(cfg.llm_chat_model, "gpt-4-turbo-preview");
        assert_eq!(cfg.llm_temperature, 0.7);
        assert_eq!(cfg.llm_max_tokens, 4000);
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(120)));
        assert!(cfg.knowledge_base_path.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let cfg = load(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_CHAT_MODEL", "gpt-4o"),
            ("LLM_TEMPERATURE", "0.2"),
            ("REQUEST_TIMEOUT_SECS", "0"),
            ("KNOWLEDGE_BASE_PATH", "/tmp/kb.json"),
        ])
        .unwrap();
        assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));
        assert_eq!(cfg.llm_chat_model, "gpt-4o");
        assert_eq!(cfg.llm_temperature, 0.2);
        assert_eq!(cfg.request_timeout, None);
        assert_eq!(cfg.knowledge_base_path, Some(PathBuf::from("/tmp/kb.json")));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let cfg = load(&[("OPENAI_API_KEY", "  ")]).unwrap();
        assert!(cfg.llm_api_key.is_none());
    }

    #[test]
    fn invalid_values_fail() {
        assert!(load(&[("LLM_PROVIDER", "gemini")]).is_err());
        assert!(load(&[("LLM_MAX_TOKENS", "muchos")]).is_err());
        assert!(load(&[("LLM_TEMPERATURE", "5")]).is_err());
    }
}

//! Orquestación de una generación de estrategia.
//!
//! Flujo por invocación:
//!   Idle → KnowledgeSelected → PromptBuilt → AwaitingModel
//!        → ResponseParsed → Validated → Done
//! Cualquier paso puede terminar en `Failed`; no hay reintentos ni caché.
//! Un llamador que quiera reintentos o timeout los compone por fuera.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::GenerationError,
    knowledge::KnowledgeBase,
    llm::{CompletionBackend, CompletionRequest},
    models::FunnelRequestForm,
    prompt,
    strategy::{self, FunnelStrategy},
};

/// Parámetros fijos de la llamada al modelo.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4-turbo-preview".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

impl GenerationSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            model: cfg.llm_chat_model.clone(),
            temperature: cfg.llm_temperature,
            max_tokens: cfg.llm_max_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    KnowledgeSelected,
    PromptBuilt,
    AwaitingModel,
    ResponseParsed,
    Validated,
}

/// Resultado de una generación correcta.
#[derive(Debug, Clone)]
pub struct GeneratedStrategy {
    pub strategy: FunnelStrategy,
    pub elapsed: Duration,
    /// Ids del conocimiento incluido en el prompt, en orden de corpus.
    pub knowledge_ids: Vec<String>,
    /// Avisos no bloqueantes de la validación (p. ej. presupuesto incoherente).
    pub warnings: Vec<String>,
}

impl GeneratedStrategy {
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Genera estrategias a partir de formularios.
///
/// El corpus y el backend se inyectan al construirlo; el generador no tiene
/// estado mutable y puede compartirse entre peticiones concurrentes.
#[derive(Clone)]
pub struct FunnelGenerator {
    knowledge: Arc<KnowledgeBase>,
    backend: Arc<dyn CompletionBackend>,
    settings: GenerationSettings,
}

impl FunnelGenerator {
    pub fn new(
        knowledge: Arc<KnowledgeBase>,
        backend: Arc<dyn CompletionBackend>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            knowledge,
            backend,
            settings,
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn has_credentials(&self) -> bool {
        self.backend.has_credentials()
    }

    /// Ejecuta un ciclo completo petición/respuesta con el modelo.
    ///
    /// Hace exactamente una llamada externa. Si el futuro se descarta
    /// (cancelación del cliente) la llamada se cancela y no queda nada a medias.
    pub async fn generate(
        &self,
        form: &FunnelRequestForm,
    ) -> Result<GeneratedStrategy, GenerationError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("generate_funnel", %request_id, empresa = %form.empresa);
        let result = self.run(form).instrument(span.clone()).await;
        if let Err(e) = &result {
            span.in_scope(|| error!(kind = e.kind(), "Generación fallida: {}", e));
        }
        result
    }

    async fn run(&self, form: &FunnelRequestForm) -> Result<GeneratedStrategy, GenerationError> {
        if !self.backend.has_credentials() {
            return Err(GenerationError::Configuration(
                "la API key del proveedor LLM no está configurada (OPENAI_API_KEY)".to_string(),
            ));
        }

        let start = Instant::now();

        let relevant = self.knowledge.select_relevant(form);
        let knowledge_ids: Vec<String> = relevant.iter().map(|c| c.id.clone()).collect();
        trace_stage(Stage::KnowledgeSelected);

        let prompts = prompt::build_prompts(form, &relevant);
        trace_stage(Stage::PromptBuilt);

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            system_prompt: prompts.system,
            user_prompt: prompts.user,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            json_mode: true,
        };

        trace_stage(Stage::AwaitingModel);
        let text = self
            .backend
            .complete(&request)
            .await
            .map_err(|e| GenerationError::ExternalCall(format!("{e:#}")))?;

        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        let raw: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
        trace_stage(Stage::ResponseParsed);

        let validated = strategy::validate_strategy(raw)?;
        trace_stage(Stage::Validated);

        let elapsed = start.elapsed();
        info!(
            "Estrategia generada en {} ms con {} fragmentos de conocimiento",
            elapsed.as_millis(),
            knowledge_ids.len()
        );

        Ok(GeneratedStrategy {
            strategy: validated.strategy,
            elapsed,
            knowledge_ids,
            warnings: validated.warnings,
        })
    }
}

fn trace_stage(stage: Stage) {
    debug!(?stage, "Etapa de generación");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::tests::{fixture_base, sample_form};
    use crate::strategy::tests::sample_strategy_json;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend simulado que devuelve siempre la misma respuesta.
    struct ScriptedBackend {
        credentials: bool,
        reply: Result<String, String>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedBackend {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                credentials: true,
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn has_credentials(&self) -> bool {
            self.credentials
        }

        async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.reply.clone().map_err(|e| anyhow!(e))
        }
    }

    fn generator(backend: Arc<ScriptedBackend>) -> FunnelGenerator {
        FunnelGenerator::new(
            Arc::new(fixture_base()),
            backend,
            GenerationSettings::default(),
        )
    }

    #[test]
    fn request_carries_fixed_parameters() {
        let backend = ScriptedBackend::replying(&sample_strategy_json().to_string());
        let generated = tokio_test::block_on(generator(backend.clone()).generate(&sample_form())).unwrap();

        let requests = backend.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.model, "gpt-4-turbo-preview");
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.max_tokens, 4000);
        assert!(req.json_mode);
        assert_eq!(req.system_prompt, prompt::SYSTEM_PROMPT);
        assert!(req.user_prompt.contains("=== LEAD-MAGNET - sub-a ==="));
        assert_eq!(generated.knowledge_ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn whitespace_reply_is_empty_response() {
        let backend = ScriptedBackend::replying("  \n ");
        let err = tokio_test::block_on(generator(backend).generate(&sample_form())).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[test]
    fn missing_credentials_never_reach_the_backend() {
        let backend = Arc::new(ScriptedBackend {
            credentials: false,
            reply: Ok("{}".into()),
            requests: Mutex::new(Vec::new()),
        });
        let err = tokio_test::block_on(generator(backend.clone()).generate(&sample_form())).unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn elapsed_ms_saturates() {
        let generated = GeneratedStrategy {
            strategy: strategy::validate_strategy(sample_strategy_json()).unwrap().strategy,
            elapsed: Duration::from_millis(1234),
            knowledge_ids: Vec::new(),
            warnings: Vec::new(),
        };
        assert_eq!(generated.elapsed_ms(), 1234);
    }
}

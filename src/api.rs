use std::collections::HashSet;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Json, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    error::GenerationError,
    form::{self, RawFunnelForm},
    generator::GeneratedStrategy,
    models::{FunnelRequestForm, KnowledgeCategory, KnowledgeChunk},
    strategy::FunnelStrategy,
};

const INCOMPLETE_FORM: &str = "Datos de formulario incompletos";

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFunnelPayload {
    #[serde(default)]
    form_data: Option<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFunnelResponse {
    success: bool,
    strategy: FunnelStrategy,
    /// Milisegundos.
    generation_time: u64,
    knowledge_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl From<GeneratedStrategy> for GenerateFunnelResponse {
    fn from(generated: GeneratedStrategy) -> Self {
        Self {
            success: true,
            generation_time: generated.elapsed_ms(),
            strategy: generated.strategy,
            knowledge_ids: generated.knowledge_ids,
            warnings: generated.warnings,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct KnowledgeFilter {
    categoria: Option<String>,
    /// Lista separada por comas.
    tags: Option<String>,
    q: Option<String>,
}

#[derive(Serialize)]
pub struct KnowledgeSummary {
    id: String,
    categoria: KnowledgeCategory,
    subcategoria: String,
    fuente: String,
    tags: Vec<String>,
}

impl From<&KnowledgeChunk> for KnowledgeSummary {
    fn from(chunk: &KnowledgeChunk) -> Self {
        Self {
            id: chunk.id.clone(),
            categoria: chunk.categoria,
            subcategoria: chunk.subcategoria.clone(),
            fuente: chunk.fuente.clone(),
            tags: chunk.tags.clone(),
        }
    }
}

// --- Errores ---

/// Error de la capa HTTP. Siempre se serializa como `{success: false, error}`.
#[derive(Debug)]
pub enum ApiError {
    Generation(GenerationError),
    Timeout(Duration),
    BadRequest(String),
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        ApiError::Generation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Generation(err) => {
                let status = match err {
                    GenerationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    GenerationError::Configuration(_) => {
                        error!("Servidor mal configurado: {}", err);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.to_string())
            }
            ApiError::Timeout(limit) => {
                warn!("Generación cancelada tras {:?}", limit);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "Timeout",
                    format!(
                        "El modelo de IA no respondió en {} segundos",
                        limit.as_secs()
                    ),
                )
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "InvalidInput", message),
        };

        (
            status,
            Json(json!({ "success": false, "error": message, "errorKind": kind })),
        )
            .into_response()
    }
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/generate-funnel", post(generate_funnel_handler))
        .route("/api/generate-funnel/form", post(generate_from_web_form_handler))
        .route("/api/knowledge", get(knowledge_handler))
        .route("/api/strategy-schema", get(strategy_schema_handler))
        .route("/api/health", get(health_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn generate_funnel_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateFunnelPayload>, JsonRejection>,
) -> Result<Json<GenerateFunnelResponse>, ApiError> {
    let form_data = extract_form_data(payload)?;
    let form: FunnelRequestForm = serde_json::from_value(form_data)
        .map_err(|e| GenerationError::InvalidInput(e.to_string()))?;
    form::validate_form(&form)?;

    run_generation(&state, &form).await
}

/// Variante para el formulario web: listas como texto separado por comas.
#[axum::debug_handler]
async fn generate_from_web_form_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateFunnelPayload>, JsonRejection>,
) -> Result<Json<GenerateFunnelResponse>, ApiError> {
    let form_data = extract_form_data(payload)?;
    let raw: RawFunnelForm = serde_json::from_value(form_data)
        .map_err(|e| GenerationError::InvalidInput(e.to_string()))?;
    let form = raw.into_form()?;

    run_generation(&state, &form).await
}

/// Comprueba el cuerpo y los campos de identidad antes de tocar el núcleo.
fn extract_form_data(
    payload: Result<Json<GenerateFunnelPayload>, JsonRejection>,
) -> Result<Value, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let form_data = payload
        .form_data
        .ok_or_else(|| ApiError::BadRequest(INCOMPLETE_FORM.to_string()))?;

    let has_text = |field: &str| {
        form_data
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };
    if !has_text("nombre") || !has_text("email") {
        return Err(ApiError::BadRequest(INCOMPLETE_FORM.to_string()));
    }

    Ok(form_data)
}

async fn run_generation(
    state: &AppState,
    form: &FunnelRequestForm,
) -> Result<Json<GenerateFunnelResponse>, ApiError> {
    info!("Solicitud de estrategia para '{}'", form.empresa);

    let generation = state.generator.generate(form);
    let generated = match state.request_timeout {
        Some(limit) => tokio::time::timeout(limit, generation)
            .await
            .map_err(|_| ApiError::Timeout(limit))??,
        None => generation.await?,
    };

    Ok(Json(generated.into()))
}

#[axum::debug_handler]
async fn knowledge_handler(
    State(state): State<AppState>,
    Query(filter): Query<KnowledgeFilter>,
) -> Result<Json<Vec<KnowledgeSummary>>, ApiError> {
    let kb = state.generator.knowledge();
    let mut allowed: HashSet<&str> = kb.chunks().iter().map(|c| c.id.as_str()).collect();

    let mut restrict = |hits: Vec<&KnowledgeChunk>| {
        let ids: HashSet<&str> = hits.iter().map(|c| c.id.as_str()).collect();
        allowed.retain(|id| ids.contains(id));
    };

    if let Some(raw) = filter.categoria.as_deref().filter(|s| !s.trim().is_empty()) {
        let category = KnowledgeCategory::parse(raw)
            .ok_or_else(|| ApiError::BadRequest(format!("Categoría desconocida: {raw}")))?;
        restrict(kb.by_category(category));
    }
    if let Some(raw) = filter.tags.as_deref() {
        let tags = form::split_list(raw);
        if !tags.is_empty() {
            restrict(kb.by_tags(&tags));
        }
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        restrict(kb.by_text_query(q));
    }

    let summaries = kb
        .chunks()
        .iter()
        .filter(|c| allowed.contains(c.id.as_str()))
        .map(KnowledgeSummary::from)
        .collect();
    Ok(Json(summaries))
}

#[axum::debug_handler]
async fn strategy_schema_handler() -> Json<schemars::Schema> {
    Json(schemars::schema_for!(FunnelStrategy))
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "llmConfigured": state.generator.has_credentials(),
        "knowledgeChunks": state.generator.knowledge().len(),
    }))
}

// --- Handler de Apagado ---

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    let sender = match state.shutdown_sender.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };
    if let Some(sender) = sender {
        let _ = sender.send(());
    }
    StatusCode::OK
}

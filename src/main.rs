use axum::Router;
use funnel_rag_webapp::{api, app_state::AppState, build_generator, config, load_knowledge};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().expect("Error al cargar la configuración");
    if cfg.llm_api_key.is_none() {
        warn!("OPENAI_API_KEY no está configurada: las generaciones fallarán hasta configurarla.");
    }

    // 3. Cargar la base de conocimiento (una sola vez, inmutable)
    let knowledge = load_knowledge(&cfg).expect("Error cargando la base de conocimiento");

    // 4. Generador con el proveedor LLM configurado
    let generator = build_generator(&cfg, knowledge);

    // 5. Estado compartido y canal de apagado
    let (app_state, shutdown_rx) = AppState::new(generator, cfg.request_timeout);

    // 6. Router de la API
    let app = Router::new()
        .merge(api::create_router(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 7. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&cfg.server_addr)
        .await
        .expect("No se pudo abrir la dirección del servidor");
    info!("🚀 Servidor escuchando en http://{}", &cfg.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .expect("Error en el servidor HTTP");

    info!("✅ Servidor cerrado correctamente.");
}

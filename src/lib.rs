//! Generador de estrategias de funnel de ventas: recuperación de conocimiento
//! experto por palabras clave, construcción del prompt y validación de la
//! respuesta JSON del LLM.

pub mod api;
pub mod app_state;
pub mod config;
pub mod error;
pub mod form;
pub mod generator;
pub mod knowledge;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod strategy;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::{
    config::AppConfig,
    generator::{FunnelGenerator, GenerationSettings},
    knowledge::KnowledgeBase,
    llm::LlmManager,
};

/// Carga el corpus indicado en la configuración (o el incluido en el binario).
pub fn load_knowledge(cfg: &AppConfig) -> Result<KnowledgeBase> {
    let kb = match &cfg.knowledge_base_path {
        Some(path) => {
            info!("Cargando base de conocimiento desde {}", path.display());
            KnowledgeBase::from_file(path)?
        }
        None => KnowledgeBase::embedded()?,
    };
    info!("Base de conocimiento lista: {} fragmentos", kb.len());
    Ok(kb)
}

/// Construye el generador con el proveedor LLM real.
pub fn build_generator(cfg: &AppConfig, knowledge: KnowledgeBase) -> FunnelGenerator {
    let llm_manager = LlmManager::from_config(cfg);
    FunnelGenerator::new(
        Arc::new(knowledge),
        Arc::new(llm_manager),
        GenerationSettings::from_config(cfg),
    )
}

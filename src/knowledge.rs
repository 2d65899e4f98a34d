//! Base de conocimiento experta y recuperación por palabras clave.
//!
//! No hay índice ni embeddings: el corpus es pequeño y fijo, así que la
//! búsqueda es un filtrado lineal que conserva siempre el orden del corpus.
//!
//! Flujo de `select_relevant`:
//!   1. Una búsqueda de texto por cada valor del contexto del cliente
//!      (objetivo, industria, modelo de negocio, problemas y KPIs), tomando
//!      como máximo los 2 primeros resultados de cada una.
//!   2. El primer fragmento de cada categoría asociada al objetivo principal.
//!   3. Resolución de los ids acumulados en orden de corpus.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use crate::models::{FunnelRequestForm, KnowledgeCategory, KnowledgeChunk, ObjetivoPrincipal};

/// Corpus incluido en el binario.
const EMBEDDED_CORPUS: &str = include_str!("../data/knowledge_base.json");

const MAX_HITS_PER_QUERY: usize = 2;
const MAX_HITS_PER_CATEGORY: usize = 1;

/// Colección inmutable de fragmentos de conocimiento.
///
/// Se construye una vez al arrancar y se comparte (`Arc`) entre peticiones;
/// no expone ninguna operación de escritura.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    chunks: Vec<KnowledgeChunk>,
}

impl KnowledgeBase {
    /// Construye el corpus verificando que los ids sean únicos.
    pub fn new(chunks: Vec<KnowledgeChunk>) -> Result<Self> {
        let mut ids = HashSet::new();
        for chunk in &chunks {
            if !ids.insert(chunk.id.as_str()) {
                return Err(anyhow!(
                    "Id de conocimiento duplicado en el corpus: {}",
                    chunk.id
                ));
            }
        }
        Ok(Self { chunks })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let chunks: Vec<KnowledgeChunk> =
            serde_json::from_str(json).context("El corpus de conocimiento no es JSON válido")?;
        Self::new(chunks)
    }

    /// Corpus por defecto, incluido en el binario.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CORPUS)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).with_context(|| {
            format!(
                "No se pudo leer la base de conocimiento en {}",
                path.display()
            )
        })?;
        Self::from_json(&json)
    }

    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.chunks.iter().any(|c| c.id == id)
    }

    // ---------------------------------------------------------------------
    // RECUPERACIÓN
    // ---------------------------------------------------------------------

    /// Todos los fragmentos de una categoría.
    pub fn by_category(&self, category: KnowledgeCategory) -> Vec<&KnowledgeChunk> {
        self.chunks
            .iter()
            .filter(|c| c.categoria == category)
            .collect()
    }

    /// Fragmentos que comparten al menos un tag (coincidencia exacta).
    pub fn by_tags<S: AsRef<str>>(&self, tags: &[S]) -> Vec<&KnowledgeChunk> {
        let wanted: HashSet<&str> = tags.iter().map(AsRef::as_ref).collect();
        self.chunks
            .iter()
            .filter(|c| c.tags.iter().any(|t| wanted.contains(t.as_str())))
            .collect()
    }

    /// Búsqueda sin distinguir mayúsculas en contenido, tags e insights clave.
    pub fn by_text_query(&self, query: &str) -> Vec<&KnowledgeChunk> {
        let needle = query.to_lowercase();
        self.chunks
            .iter()
            .filter(|c| {
                c.contenido.to_lowercase().contains(&needle)
                    || c.tags.iter().any(|t| t.to_lowercase().contains(&needle))
                    || c
                        .insights_clave
                        .iter()
                        .any(|i| i.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Selección heurística de conocimiento relevante para un formulario.
    ///
    /// No es un ranking: el resultado sigue el orden del corpus y los ids
    /// repetidos se ignoran.
    pub fn select_relevant(&self, form: &FunnelRequestForm) -> Vec<&KnowledgeChunk> {
        let mut selected: HashSet<&str> = HashSet::new();

        for query in context_queries(form) {
            for chunk in self.by_text_query(query).into_iter().take(MAX_HITS_PER_QUERY) {
                selected.insert(chunk.id.as_str());
            }
        }

        for category in categories_for_objective(form.objetivo_principal) {
            for chunk in self
                .by_category(*category)
                .into_iter()
                .take(MAX_HITS_PER_CATEGORY)
            {
                selected.insert(chunk.id.as_str());
            }
        }

        let relevant: Vec<&KnowledgeChunk> = self
            .chunks
            .iter()
            .filter(|c| selected.contains(c.id.as_str()))
            .collect();

        debug!(
            "Conocimiento seleccionado: [{}]",
            relevant
                .iter()
                .map(|c| c.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        relevant
    }
}

/// Valores del formulario usados como consultas de texto, en orden.
pub fn context_queries(form: &FunnelRequestForm) -> Vec<&str> {
    let mut queries = vec![
        form.objetivo_principal.as_str(),
        form.industria.as_str(),
        form.modelo_negocio.as_str(),
    ];
    queries.extend(form.funnel_actual.problemas_actuales.iter().map(String::as_str));
    queries.extend(form.kpis_a_priorizar.iter().map(String::as_str));
    queries
}

/// Categorías que siempre se consultan según el objetivo principal.
pub fn categories_for_objective(objetivo: ObjetivoPrincipal) -> &'static [KnowledgeCategory] {
    use KnowledgeCategory::*;
    match objetivo {
        ObjetivoPrincipal::Captacion => &[LeadMagnet, B2b],
        ObjetivoPrincipal::Conversion => &[Webinar, Copywriting, Optimizacion],
        ObjetivoPrincipal::Retencion => &[Automatizacion, Optimizacion],
        ObjetivoPrincipal::Escalado => &[Automatizacion, Optimizacion, B2b],
    }
}

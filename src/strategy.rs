//! Estrategia de funnel generada por el modelo y su validación.
//!
//! La respuesta del LLM se valida en tres pasadas:
//!   1. Forma de cada sección de primer nivel (objeto / lista).
//!   2. Decodificación tipada sección a sección (literales de enumeración incluidos).
//!   3. Invariantes semánticos (score 0-100, `orden` de etapas único).
//!
//! La coherencia del presupuesto (total frente a la suma del desglose) sólo se
//! avisa: la estrategia nunca se corrige.

use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::warn;

use crate::error::GenerationError;

/// Diferencia admitida entre `presupuesto.total` y la suma de `costoMensual`.
const BUDGET_TOLERANCE: f64 = 0.01;

// ---------------------------------------------------------------------
// TIPOS
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStrategy {
    pub diagnostico: Diagnostico,
    pub funnel: FunnelDefinition,
    pub stack: Vec<TechStackItem>,
    pub roadmap: Vec<RoadmapPhase>,
    pub kpis: Vec<Kpi>,
    pub presupuesto: Presupuesto,
    pub automatizaciones: Vec<Automatizacion>,
    #[serde(
        rename = "recursos_adicionales",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recursos_adicionales: Option<Vec<RecursoAdicional>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plantillas: Option<Vec<Plantilla>>,
}

/// Análisis DAFO con puntuación del estado actual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostico {
    pub fortalezas: Vec<String>,
    pub debilidades: Vec<String>,
    pub oportunidades: Vec<String>,
    pub amenazas: Vec<String>,
    /// 0-100
    #[serde(deserialize_with = "entero::i64")]
    #[schemars(with = "i64")]
    pub score_actual: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FunnelType {
    LeadMagnet,
    Webinar,
    Vsl,
    Tripwire,
    Application,
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelDefinition {
    pub nombre: String,
    pub tipo: FunnelType,
    pub etapas: Vec<FunnelStage>,
    pub escalera_valor: Vec<ValueLadderItem>,
}

impl FunnelDefinition {
    /// Etapas en orden de presentación (`orden` ascendente).
    pub fn etapas_ordenadas(&self) -> Vec<&FunnelStage> {
        let mut etapas: Vec<&FunnelStage> = self.etapas.iter().collect();
        etapas.sort_by_key(|e| e.orden);
        etapas
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStage {
    #[serde(deserialize_with = "entero::u32")]
    #[schemars(with = "u32")]
    pub orden: u32,
    pub nombre: String,
    pub objetivo: String,
    pub tacticas: Vec<String>,
    pub contenido: Vec<ContentPiece>,
    pub automatizaciones: Vec<String>,
    pub metricas_clave: Vec<String>,
    pub tasa_conversion_esperada: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Email,
    LandingPage,
    Webinar,
    Video,
    Ebook,
    BlogPost,
    SocialMedia,
    Ad,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContentPiece {
    pub tipo: ContentType,
    pub titulo: String,
    pub descripcion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValueLadderItem {
    #[serde(deserialize_with = "entero::u32")]
    #[schemars(with = "u32")]
    pub nivel: u32,
    pub nombre: String,
    pub precio: f64,
    pub descripcion: String,
    pub deliverables: Vec<String>,
    pub tiempo_entrega: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TechStackItem {
    pub categoria: String,
    pub herramienta: String,
    pub proposito: String,
    pub costo: String,
    pub alternativas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapPhase {
    pub fase: String,
    pub duracion: String,
    pub tareas: Vec<Task>,
    pub quick_wins: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Prioridad {
    Alta,
    Media,
    Baja,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub titulo: String,
    pub descripcion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsable: Option<String>,
    pub prioridad: Prioridad,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimacion_horas: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub metrica: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valor_actual: Option<f64>,
    pub objetivo: f64,
    pub frecuencia_medicion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Presupuesto {
    pub total: f64,
    pub desglose: Vec<BudgetItem>,
    pub roi_esperado: String,
}

impl Presupuesto {
    pub fn suma_desglose(&self) -> f64 {
        self.desglose.iter().map(|item| item.costo_mensual).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCategory {
    Herramientas,
    Publicidad,
    Contenido,
    Personal,
    Otros,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    pub concepto: String,
    pub categoria: BudgetCategory,
    pub costo_mensual: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costo_anual: Option<f64>,
    pub esencial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Automatizacion {
    pub tipo: String,
    pub trigger: String,
    pub accion: String,
    pub herramienta: String,
    pub prioridad: Prioridad,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Guia,
    Plantilla,
    Checklist,
    Script,
    Framework,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecursoAdicional {
    pub tipo: ResourceType,
    pub nombre: String,
    pub descripcion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    Email,
    Landing,
    Script,
    Documento,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plantilla {
    pub nombre: String,
    pub tipo: TemplateType,
    pub contenido: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
}

// ---------------------------------------------------------------------
// VALIDACIÓN
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionShape {
    Object,
    List,
}

/// Secciones obligatorias de primer nivel.
pub const REQUIRED_SECTIONS: [&str; 7] = [
    "diagnostico",
    "funnel",
    "stack",
    "roadmap",
    "kpis",
    "presupuesto",
    "automatizaciones",
];

/// Estrategia que ha superado la validación, con los avisos no bloqueantes.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStrategy {
    pub strategy: FunnelStrategy,
    pub warnings: Vec<String>,
}

/// Parsea y valida el texto devuelto por el modelo.
///
/// No repara la salida: un bloque ```json o texto extra alrededor del objeto
/// es un `MalformedResponse`.
pub fn parse_strategy(text: &str) -> Result<ValidatedStrategy, GenerationError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    validate_strategy(value)
}

/// Valida un valor JSON ya parseado y lo convierte en `FunnelStrategy`.
pub fn validate_strategy(value: Value) -> Result<ValidatedStrategy, GenerationError> {
    let Value::Object(root) = value else {
        return Err(GenerationError::InvalidShape {
            sections: vec![format!(
                "raíz: se esperaba un objeto JSON, se recibió {}",
                json_type_name(&value)
            )],
        });
    };

    let mut problems = Vec::new();

    let diagnostico = decode_section::<Diagnostico>(&root, "diagnostico", SectionShape::Object, &mut problems);
    let funnel = decode_section::<FunnelDefinition>(&root, "funnel", SectionShape::Object, &mut problems);
    let stack = decode_section::<Vec<TechStackItem>>(&root, "stack", SectionShape::List, &mut problems);
    let roadmap = decode_section::<Vec<RoadmapPhase>>(&root, "roadmap", SectionShape::List, &mut problems);
    let kpis = decode_section::<Vec<Kpi>>(&root, "kpis", SectionShape::List, &mut problems);
    let presupuesto = decode_section::<Presupuesto>(&root, "presupuesto", SectionShape::Object, &mut problems);
    let automatizaciones = decode_section::<Vec<Automatizacion>>(
        &root,
        "automatizaciones",
        SectionShape::List,
        &mut problems,
    );
    let recursos_adicionales = decode_optional_section::<Vec<RecursoAdicional>>(
        &root,
        "recursos_adicionales",
        &mut problems,
    );
    let plantillas = decode_optional_section::<Vec<Plantilla>>(&root, "plantillas", &mut problems);

    let (
        Some(diagnostico),
        Some(funnel),
        Some(stack),
        Some(roadmap),
        Some(kpis),
        Some(presupuesto),
        Some(automatizaciones),
        Some(recursos_adicionales),
        Some(plantillas),
    ) = (
        diagnostico,
        funnel,
        stack,
        roadmap,
        kpis,
        presupuesto,
        automatizaciones,
        recursos_adicionales,
        plantillas,
    )
    else {
        return Err(GenerationError::InvalidShape { sections: problems });
    };

    let strategy = FunnelStrategy {
        diagnostico,
        funnel,
        stack,
        roadmap,
        kpis,
        presupuesto,
        automatizaciones,
        recursos_adicionales,
        plantillas,
    };

    let violations = check_invariants(&strategy);
    if !violations.is_empty() {
        return Err(GenerationError::InvalidShape { sections: violations });
    }

    let warnings = budget_warnings(&strategy.presupuesto);
    for w in &warnings {
        warn!("{}", w);
    }

    Ok(ValidatedStrategy { strategy, warnings })
}

fn decode_section<T: DeserializeOwned>(
    root: &Map<String, Value>,
    name: &str,
    shape: SectionShape,
    problems: &mut Vec<String>,
) -> Option<T> {
    let Some(value) = root.get(name) else {
        problems.push(format!("{name}: ausente"));
        return None;
    };

    let shape_ok = match shape {
        SectionShape::Object => value.is_object(),
        SectionShape::List => value.is_array(),
    };
    if !shape_ok {
        let expected = match shape {
            SectionShape::Object => "un objeto",
            SectionShape::List => "una lista",
        };
        problems.push(format!(
            "{name}: se esperaba {expected}, se recibió {}",
            json_type_name(value)
        ));
        return None;
    }

    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            problems.push(format!("{name}: {e}"));
            None
        }
    }
}

/// Devuelve `Some(None)` si la sección no está (o es `null`), `None` si es inválida.
fn decode_optional_section<T: DeserializeOwned>(
    root: &Map<String, Value>,
    name: &str,
    problems: &mut Vec<String>,
) -> Option<Option<T>> {
    match root.get(name) {
        None | Some(Value::Null) => Some(None),
        Some(_) => decode_section::<T>(root, name, SectionShape::List, problems).map(Some),
    }
}

fn check_invariants(strategy: &FunnelStrategy) -> Vec<String> {
    let mut violations = Vec::new();

    let score = strategy.diagnostico.score_actual;
    if !(0..=100).contains(&score) {
        violations.push(format!(
            "diagnostico.scoreActual: {score} fuera del rango 0-100"
        ));
    }

    let mut seen = HashSet::new();
    for etapa in &strategy.funnel.etapas {
        if !seen.insert(etapa.orden) {
            violations.push(format!(
                "funnel.etapas: orden {} repetido",
                etapa.orden
            ));
        }
    }

    violations
}

fn budget_warnings(presupuesto: &Presupuesto) -> Vec<String> {
    let suma = presupuesto.suma_desglose();
    if (presupuesto.total - suma).abs() > BUDGET_TOLERANCE {
        vec![format!(
            "presupuesto.total ({}) no coincide con la suma del desglose ({})",
            presupuesto.total, suma
        )]
    } else {
        Vec::new()
    }
}

/// Enteros que el modelo puede enviar como `72.0`; se rechaza cualquier parte decimal.
mod entero {
    use serde::{de::Error, Deserialize, Deserializer};
    use serde_json::Number;

    fn integral<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let n = Number::deserialize(deserializer)?;
        if let Some(i) = n.as_i64() {
            return Ok(i);
        }
        match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Ok(f as i64)
            }
            _ => Err(D::Error::custom(format!(
                "se esperaba un número entero, se recibió {n}"
            ))),
        }
    }

    pub fn i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        integral(deserializer)
    }

    pub fn u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let n = integral(deserializer)?;
        u32::try_from(n).map_err(|_| D::Error::custom(format!("{n} fuera del rango de u32")))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "un booleano",
        Value::Number(_) => "un número",
        Value::String(_) => "un texto",
        Value::Array(_) => "una lista",
        Value::Object(_) => "un objeto",
    }
}

//! Modelos de dominio: formulario del cliente y fragmentos de conocimiento experto.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------
// BASE DE CONOCIMIENTO
// ---------------------------------------------------------------------

/// Categorías fijas de la base de conocimiento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnowledgeCategory {
    LeadMagnet,
    Automatizacion,
    Webinar,
    Optimizacion,
    B2b,
    Copywriting,
    StackTech,
}

impl KnowledgeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadMagnet => "lead-magnet",
            Self::Automatizacion => "automatizacion",
            Self::Webinar => "webinar",
            Self::Optimizacion => "optimizacion",
            Self::B2b => "b2b",
            Self::Copywriting => "copywriting",
            Self::StackTech => "stack-tech",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lead-magnet" => Some(Self::LeadMagnet),
            "automatizacion" => Some(Self::Automatizacion),
            "webinar" => Some(Self::Webinar),
            "optimizacion" => Some(Self::Optimizacion),
            "b2b" => Some(Self::B2b),
            "copywriting" => Some(Self::Copywriting),
            "stack-tech" => Some(Self::StackTech),
            _ => None,
        }
    }
}

impl fmt::Display for KnowledgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Una unidad de conocimiento experto usada para fundamentar el prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub categoria: KnowledgeCategory,
    pub subcategoria: String,
    pub contenido: String,
    pub fuente: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub ejemplos: Vec<String>,
    #[serde(default)]
    pub insights_clave: Vec<String>,
}

// ---------------------------------------------------------------------
// FORMULARIO DEL CLIENTE
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumeroEmpleados {
    #[serde(rename = "1-10")]
    DeUnoADiez,
    #[serde(rename = "11-50")]
    DeOnceACincuenta,
    #[serde(rename = "51-200")]
    DeCincuentaYUnoADoscientos,
    #[serde(rename = "201-500")]
    DeDoscientosYUnoAQuinientos,
    #[serde(rename = "500+")]
    MasDeQuinientos,
}

impl NumeroEmpleados {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeUnoADiez => "1-10",
            Self::DeOnceACincuenta => "11-50",
            Self::DeCincuentaYUnoADoscientos => "51-200",
            Self::DeDoscientosYUnoAQuinientos => "201-500",
            Self::MasDeQuinientos => "500+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeloNegocio {
    B2B,
    B2C,
    B2B2C,
    Marketplace,
}

impl ModeloNegocio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::B2B => "B2B",
            Self::B2C => "B2C",
            Self::B2B2C => "B2B2C",
            Self::Marketplace => "Marketplace",
        }
    }
}

/// Objetivo principal del cliente. Determina las categorías de conocimiento
/// que siempre se incluyen en el prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjetivoPrincipal {
    Captacion,
    Conversion,
    Retencion,
    Escalado,
}

impl ObjetivoPrincipal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Captacion => "captacion",
            Self::Conversion => "conversion",
            Self::Retencion => "retencion",
            Self::Escalado => "escalado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresupuestoMensual {
    #[serde(rename = "0-1000")]
    HastaMil,
    #[serde(rename = "1000-5000")]
    DeMilACincoMil,
    #[serde(rename = "5000-15000")]
    DeCincoMilAQuinceMil,
    #[serde(rename = "15000+")]
    MasDeQuinceMil,
}

impl PresupuestoMensual {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HastaMil => "0-1000",
            Self::DeMilACincoMil => "1000-5000",
            Self::DeCincoMilAQuinceMil => "5000-15000",
            Self::MasDeQuinceMil => "15000+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiempoImplementacion {
    #[serde(rename = "1-mes")]
    UnMes,
    #[serde(rename = "2-3-meses")]
    DosATresMeses,
    #[serde(rename = "3-6-meses")]
    TresASeisMeses,
    #[serde(rename = "6-12-meses")]
    SeisADoceMeses,
}

impl TiempoImplementacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnMes => "1-mes",
            Self::DosATresMeses => "2-3-meses",
            Self::TresASeisMeses => "3-6-meses",
            Self::SeisADoceMeses => "6-12-meses",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelActual {
    pub descripcion: String,
    pub etapas: Vec<String>,
    pub herramientas_usadas: Vec<String>,
    pub problemas_actuales: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasa_conversion_actual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClienteIdeal {
    pub perfil: String,
    pub puntos_dolor: Vec<String>,
    pub canales_preferidos: Vec<String>,
}

/// Formulario validado enviado por el cliente.
///
/// El núcleo nunca lo modifica: se recibe por referencia y sólo se lee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelRequestForm {
    // Información básica
    pub nombre: String,
    pub email: String,
    pub empresa: String,

    // Contexto del negocio
    pub numero_empleados: NumeroEmpleados,
    pub industria: String,
    pub modelo_negocio: ModeloNegocio,

    pub funnel_actual: FunnelActual,

    // Objetivos y recursos
    pub objetivo_principal: ObjetivoPrincipal,
    pub presupuesto_mensual: PresupuestoMensual,
    pub tiempo_implementacion: TiempoImplementacion,
    pub kpis_a_priorizar: Vec<String>,

    pub cliente_ideal: ClienteIdeal,
}

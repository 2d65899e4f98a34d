//! Construcción de los prompts enviados al LLM.
//!
//! Todo es construcción de texto determinista: mismo formulario y mismo
//! conocimiento producen exactamente el mismo prompt (sin fechas ni azar).

use std::fmt::Write as _;

use crate::models::{FunnelRequestForm, KnowledgeChunk};

/// Prompt de sistema fijo del generador de funnels.
pub const SYSTEM_PROMPT: &str = r#"Eres un experto en funnels de ventas con 15 años de experiencia, especializado en:
- Estrategias de LeadMadness Show (automatización, webinars, lead magnets)
- Loop Marketing de HubSpot (Definición → Adaptación → Amplificación → Optimización)
- Metodologías B2B (prospección, cualificación, outreach)
- Frameworks de Alex Hormozi (value ladder, irresistible offers)

Tu tarea es analizar la información del cliente y generar un funnel personalizado que incluya:

1. DIAGNÓSTICO (análisis DAFO del estado actual con score 0-100)
2. ESTRATEGIA DE FUNNEL (etapas específicas adaptadas al cliente con tipo de funnel)
3. STACK TECNOLÓGICO (herramientas recomendadas con alternativas)
4. PLAN DE IMPLEMENTACIÓN (roadmap con quick wins para primeros 30 días)
5. KPIS Y MÉTRICAS (dashboard de seguimiento con objetivos realistas)
6. PRESUPUESTO DETALLADO (inversión por categoría con ROI esperado)
7. AUTOMATIZACIONES CLAVE (workflows específicos priorizados)

IMPORTANTE:
- Sé específico y accionable
- Basa recomendaciones en las mejores prácticas del conocimiento proporcionado
- Adapta TODO al contexto específico del cliente (industria, presupuesto, objetivos)
- Incluye quick wins para primeros 30 días
- Proporciona métricas realistas basadas en benchmarks de industria
- Prioriza según recursos disponibles

FORMATO DE SALIDA: un único objeto JSON válido según el schema proporcionado, sin texto adicional ni bloques de código."#;

/// Estructura exacta que debe devolver el modelo. `strategy::validate_strategy`
/// acepta exactamente esta forma.
pub const OUTPUT_SCHEMA: &str = r#"{
  "diagnostico": {
    "fortalezas": ["string"],
    "debilidades": ["string"],
    "oportunidades": ["string"],
    "amenazas": ["string"],
    "scoreActual": integer (0-100)
  },
  "funnel": {
    "nombre": "string",
    "tipo": "lead-magnet" | "webinar" | "vsl" | "tripwire" | "application" | "hybrid",
    "etapas": [
      {
        "orden": integer (único por etapa, empezando en 1),
        "nombre": "string",
        "objetivo": "string",
        "tacticas": ["string"],
        "contenido": [
          {
            "tipo": "email" | "landing-page" | "webinar" | "video" | "ebook" | "blog-post" | "social-media" | "ad",
            "titulo": "string",
            "descripcion": "string",
            "cta": "string (opcional)"
          }
        ],
        "automatizaciones": ["string"],
        "metricasClave": ["string"],
        "tasaConversionEsperada": number
      }
    ],
    "escaleraValor": [
      {
        "nivel": integer,
        "nombre": "string",
        "precio": number,
        "descripcion": "string",
        "deliverables": ["string"],
        "tiempoEntrega": "string"
      }
    ]
  },
  "stack": [
    {
      "categoria": "string",
      "herramienta": "string",
      "proposito": "string",
      "costo": "string",
      "alternativas": ["string"]
    }
  ],
  "roadmap": [
    {
      "fase": "string",
      "duracion": "string",
      "tareas": [
        {
          "titulo": "string",
          "descripcion": "string",
          "responsable": "string (opcional)",
          "prioridad": "alta" | "media" | "baja",
          "estimacionHoras": number (opcional)
        }
      ],
      "quickWins": ["string"]
    }
  ],
  "kpis": [
    {
      "metrica": "string",
      "valorActual": number (opcional),
      "objetivo": number,
      "frecuenciaMedicion": "string",
      "formula": "string (opcional)"
    }
  ],
  "presupuesto": {
    "total": number (suma de costoMensual del desglose),
    "desglose": [
      {
        "concepto": "string",
        "categoria": "herramientas" | "publicidad" | "contenido" | "personal" | "otros",
        "costoMensual": number,
        "costoAnual": number (opcional),
        "esencial": boolean
      }
    ],
    "roi_esperado": "string"
  },
  "automatizaciones": [
    {
      "tipo": "string",
      "trigger": "string",
      "accion": "string",
      "herramienta": "string",
      "prioridad": "alta" | "media" | "baja",
      "descripcion": "string (opcional)"
    }
  ],
  "recursos_adicionales": [
    {
      "tipo": "guia" | "plantilla" | "checklist" | "script" | "framework",
      "nombre": "string",
      "descripcion": "string",
      "url": "string (opcional)"
    }
  ] (opcional),
  "plantillas": [
    {
      "nombre": "string",
      "tipo": "email" | "landing" | "script" | "documento",
      "contenido": "string",
      "variables": ["string"] (opcional)
    }
  ] (opcional)
}"#;

/// Par de prompts listo para enviar al proveedor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

pub fn build_prompts(form: &FunnelRequestForm, knowledge: &[&KnowledgeChunk]) -> PromptPair {
    PromptPair {
        system: SYSTEM_PROMPT.to_string(),
        user: build_user_prompt(form, knowledge),
    }
}

/// Prompt de usuario con el contexto del cliente, el conocimiento
/// seleccionado y el schema de salida.
pub fn build_user_prompt(form: &FunnelRequestForm, knowledge: &[&KnowledgeChunk]) -> String {
    let actual = &form.funnel_actual;
    let ideal = &form.cliente_ideal;
    let kpis = form.kpis_a_priorizar.join(", ");

    let mut p = String::new();
    p.push_str("Genera una estrategia completa de funnel de ventas para el siguiente cliente:\n\n");

    // `write!` sobre String no puede fallar.
    p.push_str("=== INFORMACIÓN DEL CLIENTE ===\n");
    let _ = writeln!(p, "Nombre: {}", form.nombre);
    let _ = writeln!(p, "Empresa: {}", form.empresa);
    let _ = writeln!(p, "Industria: {}", form.industria);
    let _ = writeln!(p, "Modelo de Negocio: {}", form.modelo_negocio.as_str());
    let _ = writeln!(p, "Tamaño: {} empleados", form.numero_empleados.as_str());
    p.push('\n');

    p.push_str("=== SITUACIÓN ACTUAL ===\n");
    let _ = writeln!(p, "Descripción del funnel actual: {}", actual.descripcion);
    let _ = writeln!(p, "Etapas actuales: {}", actual.etapas.join(", "));
    let _ = writeln!(p, "Herramientas usadas: {}", actual.herramientas_usadas.join(", "));
    let _ = writeln!(p, "Problemas actuales: {}", actual.problemas_actuales.join(", "));
    if let Some(tasa) = actual.tasa_conversion_actual {
        let _ = writeln!(p, "Tasa de conversión actual: {tasa}%");
    }
    p.push('\n');

    p.push_str("=== OBJETIVOS Y RECURSOS ===\n");
    let _ = writeln!(p, "Objetivo Principal: {}", form.objetivo_principal.as_str());
    let _ = writeln!(p, "Presupuesto Mensual: {}", form.presupuesto_mensual.as_str());
    let _ = writeln!(p, "Tiempo para Implementación: {}", form.tiempo_implementacion.as_str());
    let _ = writeln!(p, "KPIs a Priorizar: {kpis}");
    p.push('\n');

    p.push_str("=== CLIENTE IDEAL ===\n");
    let _ = writeln!(p, "Perfil: {}", ideal.perfil);
    let _ = writeln!(p, "Puntos de Dolor: {}", ideal.puntos_dolor.join(", "));
    let _ = writeln!(p, "Canales Preferidos: {}", ideal.canales_preferidos.join(", "));
    p.push('\n');

    p.push_str("=== CONOCIMIENTO EXPERTO RELEVANTE ===\n");
    p.push_str(&render_knowledge(knowledge));
    p.push_str("\n\n");

    p.push_str("=== INSTRUCCIONES ESPECÍFICAS ===\n");
    let _ = writeln!(
        p,
        "- El funnel debe ser implementable en {}",
        form.tiempo_implementacion.as_str()
    );
    let _ = writeln!(p, "- Presupuesto disponible: {}", form.presupuesto_mensual.as_str());
    let _ = writeln!(p, "- Prioriza estos KPIs: {kpis}");
    p.push_str("- CRÍTICO: Incluir quick wins específicos para los primeros 30 días\n");
    let _ = writeln!(
        p,
        "- Stack tecnológico debe ser compatible con equipo de {} personas",
        form.numero_empleados.as_str()
    );
    p.push_str("- Automatizaciones priorizadas según recursos disponibles\n\n");

    p.push_str("Devuelve un JSON válido con esta estructura EXACTA:\n\n");
    p.push_str(OUTPUT_SCHEMA);
    p.push('\n');
    p
}

/// Renderiza los fragmentos seleccionados separados por `---`.
pub fn render_knowledge(knowledge: &[&KnowledgeChunk]) -> String {
    knowledge
        .iter()
        .map(|chunk| render_chunk(chunk))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn render_chunk(chunk: &KnowledgeChunk) -> String {
    let mut s = String::new();
    let _ = writeln!(
        s,
        "=== {} - {} ===",
        chunk.categoria.as_str().to_uppercase(),
        chunk.subcategoria
    );
    let _ = writeln!(s, "Fuente: {}", chunk.fuente);
    s.push('\n');
    s.push_str(chunk.contenido.trim());
    s.push_str("\n\nINSIGHTS CLAVE:\n");
    s.push_str(&bullets(&chunk.insights_clave));
    s.push_str("\n\nEJEMPLOS:\n");
    s.push_str(&bullets(&chunk.ejemplos));
    s
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("- {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::tests::{fixture_base, sample_form};

    #[test]
    fn user_prompt_is_deterministic() {
        let kb = fixture_base();
        let form = sample_form();
        let selected = kb.select_relevant(&form);
        assert_eq!(
            build_user_prompt(&form, &selected),
            build_user_prompt(&form, &selected)
        );
    }

    #[test]
    fn user_prompt_embeds_client_context() {
        let kb = fixture_base();
        let form = sample_form();
        let prompt = build_user_prompt(&form, &kb.select_relevant(&form));

        assert!(prompt.contains("Empresa: Acme"));
        assert!(prompt.contains("Modelo de Negocio: B2B"));
        assert!(prompt.contains("Tamaño: 11-50 empleados"));
        assert!(prompt.contains("Tasa de conversión actual: 2.5%"));
        assert!(prompt.contains("KPIs a Priorizar: CPL, conversion"));
        assert!(prompt.contains("Canales Preferidos: LinkedIn, Email"));
        assert!(prompt.contains("- El funnel debe ser implementable en 2-3-meses"));
        assert!(prompt.ends_with("}\n"));
    }

    #[test]
    fn missing_conversion_rate_omits_the_line() {
        let mut form = sample_form();
        form.funnel_actual.tasa_conversion_actual = None;
        let prompt = build_user_prompt(&form, &[]);
        assert!(!prompt.contains("Tasa de conversión actual"));
        assert!(prompt.contains("Problemas actuales: pocos leads\n\n=== OBJETIVOS Y RECURSOS ==="));
    }

    #[test]
    fn zero_conversion_rate_is_rendered() {
        let mut form = sample_form();
        form.funnel_actual.tasa_conversion_actual = Some(0.0);
        let prompt = build_user_prompt(&form, &[]);
        assert!(prompt.contains("Tasa de conversión actual: 0%"));
    }

    #[test]
    fn chunks_render_header_content_insights_and_examples() {
        let kb = fixture_base();
        let chunks = kb.by_category(crate::models::KnowledgeCategory::B2b);
        let rendered = render_knowledge(&chunks);
        assert_eq!(
            rendered,
            "=== B2B - sub-d ===\nFuente: Fuente de prueba\n\nProspección outbound B2B\n\nINSIGHTS CLAVE:\n- insight de d\n\nEJEMPLOS:\n- ejemplo de d"
        );
    }

    #[test]
    fn chunks_are_separated() {
        let kb = fixture_base();
        let rendered = render_knowledge(&kb.by_tags(&["conversion"]));
        assert_eq!(rendered.matches("\n\n---\n\n").count(), 1);
        assert!(rendered.starts_with("=== LEAD-MAGNET - sub-a ==="));
    }

    #[test]
    fn schema_lists_every_enumeration_literal() {
        for literal in [
            "\"vsl\"", "\"tripwire\"", "\"application\"", "\"hybrid\"",
            "\"landing-page\"", "\"blog-post\"", "\"social-media\"", "\"ad\"",
            "\"alta\"", "\"media\"", "\"baja\"",
            "\"herramientas\"", "\"publicidad\"", "\"personal\"", "\"otros\"",
            "\"guia\"", "\"checklist\"", "\"framework\"", "\"documento\"",
        ] {
            assert!(OUTPUT_SCHEMA.contains(literal), "falta {literal}");
        }
        let prompts = build_prompts(&sample_form(), &[]);
        assert_eq!(prompts.system, SYSTEM_PROMPT);
        assert!(prompts.user.contains(OUTPUT_SCHEMA));
    }
}

//! Utilidades compartidas por los tests de integración.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use funnel_rag_webapp::{
    generator::{FunnelGenerator, GenerationSettings},
    knowledge::KnowledgeBase,
    llm::{CompletionBackend, CompletionRequest},
    models::FunnelRequestForm,
};
use serde_json::{json, Value};

/// Proveedor LLM simulado: respuesta programada y registro de llamadas.
pub struct MockBackend {
    credentials: bool,
    reply: Mutex<Result<String, String>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl MockBackend {
    pub fn ok(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            credentials: true,
            reply: Mutex::new(Ok(text.into())),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            credentials: true,
            reply: Mutex::new(Err(message.to_string())),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn without_credentials() -> Arc<Self> {
        Arc::new(Self {
            credentials: false,
            reply: Mutex::new(Ok(valid_strategy().to_string())),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn has_credentials(&self) -> bool {
        self.credentials
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(request.clone());
        self.reply.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}

pub fn generator_with(backend: Arc<MockBackend>) -> FunnelGenerator {
    FunnelGenerator::new(
        Arc::new(KnowledgeBase::embedded().unwrap()),
        backend,
        GenerationSettings::default(),
    )
}

pub fn form_json() -> Value {
    json!({
        "nombre": "Laura Gómez",
        "email": "laura@consultora.es",
        "empresa": "Consultora Norte",
        "numeroEmpleados": "11-50",
        "industria": "Consultoría",
        "modeloNegocio": "B2B",
        "funnelActual": {
            "descripcion": "Referidos y algo de LinkedIn orgánico",
            "etapas": ["Referido", "Reunión", "Propuesta"],
            "herramientasUsadas": ["Excel", "Gmail"],
            "problemasActuales": ["pocos leads cualificados", "seguimiento manual"],
            "tasaConversionActual": 3.5
        },
        "objetivoPrincipal": "captacion",
        "presupuestoMensual": "1000-5000",
        "tiempoImplementacion": "2-3-meses",
        "kpisAPriorizar": ["leads cualificados", "CAC"],
        "clienteIdeal": {
            "perfil": "Directores de operaciones de empresas industriales",
            "puntosDolor": ["procesos lentos", "falta de datos"],
            "canalesPreferidos": ["LinkedIn", "Email"]
        }
    })
}

pub fn sample_form() -> FunnelRequestForm {
    serde_json::from_value(form_json()).unwrap()
}

pub fn valid_strategy() -> Value {
    json!({
        "diagnostico": {
            "fortalezas": ["Buena reputación"],
            "debilidades": ["Dependencia de referidos"],
            "oportunidades": ["Contenido en LinkedIn"],
            "amenazas": ["Nuevos competidores"],
            "scoreActual": 35
        },
        "funnel": {
            "nombre": "Funnel de autoridad B2B",
            "tipo": "hybrid",
            "etapas": [
                {
                    "orden": 1,
                    "nombre": "Atracción",
                    "objetivo": "Captar directivos",
                    "tacticas": ["Posts semanales"],
                    "contenido": [
                        { "tipo": "social-media", "titulo": "Caso real", "descripcion": "Post con resultados" }
                    ],
                    "automatizaciones": ["Alerta de nuevo lead"],
                    "metricasClave": ["Visitas"],
                    "tasaConversionEsperada": 25.0
                }
            ],
            "escaleraValor": [
                {
                    "nivel": 1,
                    "nombre": "Diagnóstico exprés",
                    "precio": 490.0,
                    "descripcion": "Sesión de dos horas",
                    "deliverables": ["Informe"],
                    "tiempoEntrega": "1 semana"
                }
            ]
        },
        "stack": [
            { "categoria": "CRM", "herramienta": "Pipedrive", "proposito": "Pipeline", "costo": "15€/mes", "alternativas": ["HubSpot Free"] }
        ],
        "roadmap": [
            {
                "fase": "Mes 1",
                "duracion": "30 días",
                "tareas": [ { "titulo": "Configurar CRM", "descripcion": "Pipeline de 5 etapas", "prioridad": "alta" } ],
                "quickWins": ["Plantillas de seguimiento"]
            }
        ],
        "kpis": [
            { "metrica": "Leads cualificados", "objetivo": 20.0, "frecuenciaMedicion": "mensual" }
        ],
        "presupuesto": {
            "total": 1200.0,
            "desglose": [
                { "concepto": "Pipedrive", "categoria": "herramientas", "costoMensual": 200.0, "esencial": true },
                { "concepto": "LinkedIn Ads", "categoria": "publicidad", "costoMensual": 1000.0, "esencial": false }
            ],
            "roi_esperado": "4x en 12 meses"
        },
        "automatizaciones": [
            { "tipo": "seguimiento", "trigger": "Reunión agendada", "accion": "Email de confirmación", "herramienta": "Pipedrive", "prioridad": "media" }
        ]
    })
}

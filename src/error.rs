//! Taxonomía de errores de la generación de estrategias.

use thiserror::Error;

/// Fallos posibles de una invocación de `FunnelGenerator::generate`.
///
/// Ninguno se reintenta dentro del núcleo; la capa HTTP decide el código de
/// estado a partir de la variante.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Falta la credencial del proveedor LLM. Se detecta antes de cualquier llamada.
    #[error("Configuración incompleta: {0}")]
    Configuration(String),

    /// Formulario incompleto o inválido. Sólo lo produce la capa de entrada.
    #[error("Datos de formulario inválidos: {0}")]
    InvalidInput(String),

    /// La llamada al proveedor LLM falló (red, autenticación, cuota...).
    #[error("Error en la llamada al modelo de IA: {0}")]
    ExternalCall(String),

    #[error("No se recibió respuesta del modelo de IA")]
    EmptyResponse,

    /// El texto devuelto no es JSON válido.
    #[error("La respuesta del modelo no es JSON válido: {0}")]
    MalformedResponse(String),

    /// JSON válido pero con secciones ausentes o mal formadas.
    #[error("La estrategia generada no tiene la estructura esperada: {}", .sections.join("; "))]
    InvalidShape { sections: Vec<String> },
}

impl GenerationError {
    /// Nombre estable del tipo de error, útil para logs y clientes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::InvalidInput(_) => "InvalidInput",
            Self::ExternalCall(_) => "ExternalCallFailure",
            Self::EmptyResponse => "EmptyModelResponse",
            Self::MalformedResponse(_) => "MalformedModelResponse",
            Self::InvalidShape { .. } => "InvalidStrategyShape",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_shape_message_lists_every_section() {
        let err = GenerationError::InvalidShape {
            sections: vec!["diagnostico: ausente".into(), "stack: ausente".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("diagnostico: ausente"));
        assert!(msg.contains("stack: ausente"));
        assert_eq!(err.kind(), "InvalidStrategyShape");
    }
}

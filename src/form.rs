//! Capa de entrada del formulario: validación y conversión del texto
//! delimitado por comas que envía el formulario web.
//!
//! El núcleo sólo recibe `FunnelRequestForm` ya validados.

use serde::Deserialize;

use crate::error::GenerationError;
use crate::models::{
    ClienteIdeal, FunnelActual, FunnelRequestForm, ModeloNegocio, NumeroEmpleados,
    ObjetivoPrincipal, PresupuestoMensual, TiempoImplementacion,
};

/// Formulario tal y como lo envía el navegador: las listas llegan como texto
/// separado por comas y la tasa de conversión como texto opcional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFunnelForm {
    pub nombre: String,
    pub email: String,
    pub empresa: String,
    pub numero_empleados: NumeroEmpleados,
    pub industria: String,
    pub modelo_negocio: ModeloNegocio,
    pub funnel_actual: RawFunnelActual,
    pub objetivo_principal: ObjetivoPrincipal,
    pub presupuesto_mensual: PresupuestoMensual,
    pub tiempo_implementacion: TiempoImplementacion,
    pub kpis_a_priorizar: String,
    pub cliente_ideal: RawClienteIdeal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFunnelActual {
    pub descripcion: String,
    pub etapas: String,
    pub herramientas_usadas: String,
    pub problemas_actuales: String,
    #[serde(default)]
    pub tasa_conversion_actual: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClienteIdeal {
    pub perfil: String,
    pub puntos_dolor: String,
    pub canales_preferidos: String,
}

/// Divide texto separado por comas en elementos recortados, sin vacíos.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl RawFunnelForm {
    /// Convierte y valida el formulario web.
    pub fn into_form(self) -> Result<FunnelRequestForm, GenerationError> {
        let tasa_conversion_actual = match self
            .funnel_actual
            .tasa_conversion_actual
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            None => None,
            Some(raw) => Some(
                raw.trim_end_matches('%')
                    .trim()
                    .replace(',', ".")
                    .parse::<f64>()
                    .map_err(|_| {
                        GenerationError::InvalidInput(format!(
                            "funnelActual.tasaConversionActual: '{raw}' no es un número"
                        ))
                    })?,
            ),
        };

        let form = FunnelRequestForm {
            nombre: self.nombre.trim().to_string(),
            email: self.email.trim().to_string(),
            empresa: self.empresa.trim().to_string(),
            numero_empleados: self.numero_empleados,
            industria: self.industria.trim().to_string(),
            modelo_negocio: self.modelo_negocio,
            funnel_actual: FunnelActual {
                descripcion: self.funnel_actual.descripcion.trim().to_string(),
                etapas: split_list(&self.funnel_actual.etapas),
                herramientas_usadas: split_list(&self.funnel_actual.herramientas_usadas),
                problemas_actuales: split_list(&self.funnel_actual.problemas_actuales),
                tasa_conversion_actual,
            },
            objetivo_principal: self.objetivo_principal,
            presupuesto_mensual: self.presupuesto_mensual,
            tiempo_implementacion: self.tiempo_implementacion,
            kpis_a_priorizar: split_list(&self.kpis_a_priorizar),
            cliente_ideal: ClienteIdeal {
                perfil: self.cliente_ideal.perfil.trim().to_string(),
                puntos_dolor: split_list(&self.cliente_ideal.puntos_dolor),
                canales_preferidos: split_list(&self.cliente_ideal.canales_preferidos),
            },
        };

        validate_form(&form)?;
        Ok(form)
    }
}

/// Reglas del formulario web. Devuelve todos los campos inválidos a la vez.
pub fn validate_form(form: &FunnelRequestForm) -> Result<(), GenerationError> {
    let mut errors = Vec::new();

    min_chars(&mut errors, "nombre", &form.nombre, 2);
    if !is_plausible_email(&form.email) {
        errors.push("email: formato inválido".to_string());
    }
    min_chars(&mut errors, "empresa", &form.empresa, 2);
    min_chars(&mut errors, "industria", &form.industria, 2);
    min_chars(
        &mut errors,
        "funnelActual.descripcion",
        &form.funnel_actual.descripcion,
        10,
    );
    min_chars(&mut errors, "clienteIdeal.perfil", &form.cliente_ideal.perfil, 10);

    let lists: [(&str, &Vec<String>); 6] = [
        ("funnelActual.etapas", &form.funnel_actual.etapas),
        ("funnelActual.herramientasUsadas", &form.funnel_actual.herramientas_usadas),
        ("funnelActual.problemasActuales", &form.funnel_actual.problemas_actuales),
        ("kpisAPriorizar", &form.kpis_a_priorizar),
        ("clienteIdeal.puntosDolor", &form.cliente_ideal.puntos_dolor),
        ("clienteIdeal.canalesPreferidos", &form.cliente_ideal.canales_preferidos),
    ];
    for (field, items) in lists {
        if items.iter().all(|i| i.trim().is_empty()) {
            errors.push(format!("{field}: debe contener al menos un elemento"));
        }
    }

    if let Some(tasa) = form.funnel_actual.tasa_conversion_actual {
        if !tasa.is_finite() || tasa < 0.0 {
            errors.push(format!(
                "funnelActual.tasaConversionActual: {tasa} debe ser un número no negativo"
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(GenerationError::InvalidInput(errors.join("; ")))
    }
}

fn min_chars(errors: &mut Vec<String>, field: &str, value: &str, min: usize) {
    if value.trim().chars().count() < min {
        errors.push(format!("{field}: mínimo {min} caracteres"));
    }
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::tests::sample_form;
    use serde_json::json;

    fn raw_form() -> RawFunnelForm {
        serde_json::from_value(json!({
            "nombre": " Ana ",
            "email": "ana@example.com",
            "empresa": "Acme",
            "numeroEmpleados": "1-10",
            "industria": "Ecommerce",
            "modeloNegocio": "B2C",
            "funnelActual": {
                "descripcion": "Tráfico orgánico a tienda online",
                "etapas": "Instagram, Tienda , ,Checkout",
                "herramientasUsadas": "Shopify",
                "problemasActuales": "carritos abandonados, poco tráfico",
                "tasaConversionActual": "1,8%"
            },
            "objetivoPrincipal": "conversion",
            "presupuestoMensual": "0-1000",
            "tiempoImplementacion": "1-mes",
            "kpisAPriorizar": "tasa de conversión, ticket medio",
            "clienteIdeal": {
                "perfil": "Mujeres 25-40 interesadas en moda sostenible",
                "puntosDolor": "precio, confianza",
                "canalesPreferidos": "Instagram, TikTok"
            }
        }))
        .unwrap()
    }

    #[test]
    fn split_list_trims_and_drops_empty_items() {
        assert_eq!(split_list(" a, b ,,c ,"), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn raw_form_converts_into_typed_form() {
        let form = raw_form().into_form().unwrap();
        assert_eq!(form.nombre, "Ana");
        assert_eq!(form.funnel_actual.etapas, vec!["Instagram", "Tienda", "Checkout"]);
        assert_eq!(form.funnel_actual.tasa_conversion_actual, Some(1.8));
        assert_eq!(form.kpis_a_priorizar.len(), 2);
        assert_eq!(form.objetivo_principal, ObjetivoPrincipal::Conversion);
    }

    #[test]
    fn blank_rate_is_absent() {
        let mut raw = raw_form();
        raw.funnel_actual.tasa_conversion_actual = Some("  ".into());
        assert_eq!(raw.into_form().unwrap().funnel_actual.tasa_conversion_actual, None);
    }

    #[test]
    fn non_numeric_rate_is_invalid_input() {
        let mut raw = raw_form();
        raw.funnel_actual.tasa_conversion_actual = Some("alta".into());
        assert!(matches!(raw.into_form(), Err(GenerationError::InvalidInput(_))));
    }

    #[test]
    fn validation_reports_every_bad_field() {
        let mut form = sample_form();
        form.email = "sin-arroba".into();
        form.kpis_a_priorizar.clear();
        form.funnel_actual.tasa_conversion_actual = Some(-3.0);
        let Err(GenerationError::InvalidInput(msg)) = validate_form(&form) else {
            panic!("se esperaba InvalidInput");
        };
        assert!(msg.contains("email"));
        assert!(msg.contains("kpisAPriorizar"));
        assert!(msg.contains("tasaConversionActual"));
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("a@@b.co"));
        assert!(!is_plausible_email("a b@c.co"));
    }

    #[test]
    fn sample_form_is_valid() {
        assert!(validate_form(&sample_form()).is_ok());
    }
}

//! Unit reconciliation
//!
//! Values move between display units through the canonical unit only: the
//! source unit's `to_canonical`, then the target unit's `from_canonical`.

use crate::error::PipelineError;
use crate::pipeline::registry::{CompiledField, CompiledUnit};
use wx_calc::ConversionExpr;

/// Convert `value`, stored in `stored_unit`, to `target_unit`.
pub fn reconcile(
    field: &CompiledField,
    value: f64,
    stored_unit: &str,
    target_unit: &str,
) -> Result<f64, PipelineError> {
    let from = unit_option(field, stored_unit)?;
    let to = unit_option(field, target_unit)?;

    let canonical = apply(field, from.to_canonical.as_ref(), value)?;
    apply(field, to.from_canonical.as_ref(), canonical)
}

/// Convert a canonical value to `target_unit`.
pub fn to_display(
    field: &CompiledField,
    canonical: f64,
    target_unit: &str,
) -> Result<f64, PipelineError> {
    let to = unit_option(field, target_unit)?;
    apply(field, to.from_canonical.as_ref(), canonical)
}

fn unit_option<'a>(
    field: &'a CompiledField,
    unit: &str,
) -> Result<&'a CompiledUnit, PipelineError> {
    field.unit(unit).ok_or_else(|| PipelineError::UnknownUnit {
        field: field.id().to_string(),
        unit: unit.to_string(),
    })
}

fn apply(
    field: &CompiledField,
    expr: Option<&ConversionExpr>,
    value: f64,
) -> Result<f64, PipelineError> {
    match expr {
        None => Ok(value),
        Some(expr) => expr.eval(value).map_err(|source| PipelineError::Conversion {
            field: field.id().to_string(),
            source,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::pipeline::registry::FieldRegistry;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9 * a.abs().max(1.0)
    }

    #[test]
    fn test_celsius_to_fahrenheit_and_back() {
        let registry = FieldRegistry::builtin().unwrap();
        let field = registry.get("outdoortemp").unwrap();

        assert!(close(reconcile(field, 100.0, "°C", "°F").unwrap(), 212.0));
        assert!(close(reconcile(field, 212.0, "°F", "°C").unwrap(), 100.0));
        assert!(close(to_display(field, 21.2, "°F").unwrap(), 70.16));
        assert!(close(to_display(field, 21.2, "°C").unwrap(), 21.2));
    }

    #[test]
    fn test_non_canonical_pair_goes_through_canonical() {
        let registry = FieldRegistry::builtin().unwrap();
        let field = registry.get("windspeed").unwrap();
        // 10 m/s = 36 km/h = 22.369... mph
        let mph = reconcile(field, 10.0, "m/s", "mph").unwrap();
        assert!(close(mph, 36.0 / 1.609344));
    }

    #[test]
    fn test_same_unit_is_identity_for_every_option() {
        let registry = FieldRegistry::builtin().unwrap();
        for field in registry.fields().iter().filter(|f| f.units().len() > 1) {
            for unit in field.units() {
                for value in [-40.0, 0.0, 12.3, 1013.25] {
                    let back =
                        reconcile(field, value, unit.display_unit, unit.display_unit).unwrap();
                    assert!(
                        close(back, value),
                        "{} {}: {} -> {}",
                        field.id(),
                        unit.display_unit,
                        value,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn test_unknown_unit_is_surfaced() {
        let registry = FieldRegistry::builtin().unwrap();
        let field = registry.get("outdoortemp").unwrap();

        assert!(matches!(
            reconcile(field, 20.0, "K", "°C"),
            Err(PipelineError::UnknownUnit { unit, .. }) if unit == "K"
        ));
        assert!(matches!(
            reconcile(field, 20.0, "°C", "mm"),
            Err(PipelineError::UnknownUnit { unit, .. }) if unit == "mm"
        ));

        let field = registry.get("outdoorhumidity").unwrap();
        assert!(reconcile(field, 50.0, "%", "%").is_err());
    }
}

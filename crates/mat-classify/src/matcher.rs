//! Comparación de valores de parámetros con tolerancia.
//!
//! - strings: sin espacios extremos e insensibles a mayúsculas
//! - números (int o float): `|a - b| <= tolerancia`
//! - bools: igualdad exacta
//! - listas: misma longitud y elemento a elemento
use mat_domain::ParamValue;

/// Holgura para errores de representación en el borde de la tolerancia
/// (0.2 vs 0.2 + tol no debe depender del redondeo binario).
const ULP_SLACK: f64 = 1e-12;

fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance + ULP_SLACK
}

pub fn values_match(expected: &ParamValue, actual: &ParamValue, tolerance: f64) -> bool {
    match (expected, actual) {
        (ParamValue::Str(e), ParamValue::Str(a)) => e.trim().eq_ignore_ascii_case(a.trim()),
        (ParamValue::Bool(e), ParamValue::Bool(a)) => e == a,
        (ParamValue::FloatList(e), ParamValue::FloatList(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(x, y)| close(*x, *y, tolerance))
        }
        (e, a) => match (e.as_f64(), a.as_f64()) {
            (Some(x), Some(y)) => close(x, y, tolerance),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strings_ignore_case_and_padding() {
        assert!(values_match(&ParamValue::Str("R2SCAN".into()), &ParamValue::Str(" r2scan ".into()), 0.0));
        assert!(!values_match(&ParamValue::Str("SCAN".into()), &ParamValue::Str("R2SCAN".into()), 0.0));
    }

    #[test]
    fn numbers_respect_tolerance() {
        assert!(values_match(&ParamValue::Float(0.25), &ParamValue::Float(0.2505), 0.001));
        assert!(!values_match(&ParamValue::Float(0.25), &ParamValue::Float(0.252), 0.001));
        assert!(values_match(&ParamValue::Float(0.2), &ParamValue::Float(0.201), 0.001));
        assert!(values_match(&ParamValue::Float(1.0), &ParamValue::Int(1), 0.001));
    }

    #[test]
    fn lists_compare_element_wise() {
        let e = ParamValue::FloatList(vec![0.0, 5.3]);
        assert!(values_match(&e, &ParamValue::FloatList(vec![0.0, 5.3004]), 0.001));
        assert!(!values_match(&e, &ParamValue::FloatList(vec![0.0]), 0.001));
    }

    #[test]
    fn kinds_never_cross_match() {
        assert!(!values_match(&ParamValue::Bool(true), &ParamValue::Int(1), 0.5));
        assert!(!values_match(&ParamValue::Str("1".into()), &ParamValue::Int(1), 0.5));
    }
}

//! Parámetros de entrada tipados.
//!
//! Las claves se normalizan a mayúsculas. Toda clave conocida por el
//! vocabulario del software se valida y convierte a su tipo declarado al
//! ingerir el registro; las desconocidas van a una bolsa `extra` explícita y
//! nunca participan en la clasificación.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vocabulary::vocabulary;
use crate::{DomainError, Software};

/// Tipo declarado de un parámetro del vocabulario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    FloatList,
}

impl ParamKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::Bool => "bool",
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Str => "string",
            ParamKind::FloatList => "float list",
        }
    }

    /// Convierte un valor JSON crudo al tipo declarado. Acepta las grafías
    /// habituales de INCAR (`.TRUE.`, `F`, `"0.25"`, `2*0.0`).
    pub fn coerce(&self, key: &str, raw: &Value) -> Result<ParamValue, DomainError> {
        let invalid = || DomainError::InvalidParameter { key: key.to_string(),
                                                         expected: self.name(),
                                                         found: raw.to_string() };
        match self {
            ParamKind::Bool => match raw {
                Value::Bool(b) => Ok(ParamValue::Bool(*b)),
                Value::String(s) => parse_bool(s).map(ParamValue::Bool).ok_or_else(invalid),
                _ => Err(invalid()),
            },
            ParamKind::Int => match raw {
                Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => Ok(ParamValue::Int(i)),
                    (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(ParamValue::Int(f as i64)),
                    _ => Err(invalid()),
                },
                Value::String(s) => s.trim().parse::<i64>().map(ParamValue::Int).map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            ParamKind::Float => match raw {
                Value::Number(n) => n.as_f64().map(ParamValue::Float).ok_or_else(invalid),
                Value::String(s) => parse_float(s).map(ParamValue::Float).ok_or_else(invalid),
                _ => Err(invalid()),
            },
            ParamKind::Str => match raw {
                Value::String(s) => Ok(ParamValue::Str(s.trim().to_string())),
                // GGA = 91 llega como número desde algunos parsers.
                Value::Number(n) => Ok(ParamValue::Str(n.to_string())),
                _ => Err(invalid()),
            },
            ParamKind::FloatList => match raw {
                Value::Array(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            Value::Number(n) => out.push(n.as_f64().ok_or_else(invalid)?),
                            Value::String(s) => out.push(parse_float(s).ok_or_else(invalid)?),
                            _ => return Err(invalid()),
                        }
                    }
                    Ok(ParamValue::FloatList(out))
                }
                Value::Number(n) => n.as_f64().map(|f| ParamValue::FloatList(vec![f])).ok_or_else(invalid),
                Value::String(s) => parse_float_list(s).map(ParamValue::FloatList).ok_or_else(invalid),
                _ => Err(invalid()),
            },
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().trim_matches('.').to_ascii_uppercase().as_str() {
        "TRUE" | "T" => Some(true),
        "FALSE" | "F" => Some(false),
        _ => None,
    }
}

fn parse_float(s: &str) -> Option<f64> {
    // Exponente Fortran: 1.0D-5
    s.trim().replace(['d', 'D'], "e").parse::<f64>().ok()
}

/// Máximo de elementos de una lista expandida desde `N*valor`.
pub const MAX_FLOAT_LIST_LEN: usize = 100_000;

fn parse_float_list(s: &str) -> Option<Vec<f64>> {
    let mut out = Vec::new();
    for token in s.split_whitespace() {
        let (count, value) = match token.split_once('*') {
            Some((count, value)) => (count.parse::<usize>().ok()?, parse_float(value)?),
            None => (1, parse_float(token)?),
        };
        if count > MAX_FLOAT_LIST_LEN - out.len() {
            return None;
        }
        out.extend(std::iter::repeat(value).take(count));
    }
    Some(out)
}

/// Valor de un parámetro ya validado.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    FloatList(Vec<f64>),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::FloatList(_) => ParamKind::FloatList,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Vista numérica: enteros y flotantes.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(i) => Some(*i as f64),
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_float_list(&self) -> Option<&[f64]> {
        match self {
            ParamValue::FloatList(v) => Some(v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Int(i) => Value::from(*i),
            ParamValue::Float(f) => Value::from(*f),
            ParamValue::Str(s) => Value::String(s.clone()),
            ParamValue::FloatList(v) => Value::from(v.clone()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Float(x) => write!(f, "{x}"),
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::FloatList(v) => {
                let items: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// Mapeo tipado de parámetros de entrada de un cálculo.
#[derive(Debug, Clone, PartialEq)]
pub struct InputParameters {
    software: Software,
    values: BTreeMap<String, ParamValue>,
    extra: BTreeMap<String, Value>,
}

impl InputParameters {
    /// Valida un mapeo crudo contra el vocabulario de `software`.
    ///
    /// # Errores
    /// `DomainError::InvalidParameter` si una clave conocida trae un valor
    /// que no se puede convertir a su tipo, `ValidationError` si dos claves
    /// colisionan tras normalizar mayúsculas.
    pub fn from_raw<'a, I>(software: Software, raw: I) -> Result<Self, DomainError>
        where I: IntoIterator<Item = (&'a String, &'a Value)>
    {
        let vocab = vocabulary(software);
        let mut values = BTreeMap::new();
        let mut extra = BTreeMap::new();
        for (key, value) in raw {
            let norm = key.trim().to_ascii_uppercase();
            if values.contains_key(&norm) || extra.contains_key(&norm) {
                return Err(DomainError::ValidationError(format!("duplicate parameter after normalisation: {norm}")));
            }
            if value.is_null() {
                continue;
            }
            match vocab.kind(&norm) {
                Some(kind) => {
                    values.insert(norm.clone(), kind.coerce(&norm, value)?);
                }
                None => {
                    extra.insert(norm, value.clone());
                }
            }
        }
        Ok(Self { software,
                  values,
                  extra })
    }

    pub fn empty(software: Software) -> Self {
        Self { software,
               values: BTreeMap::new(),
               extra: BTreeMap::new() }
    }

    pub fn software(&self) -> Software {
        self.software
    }

    /// `true` si la clave vino explícitamente en el registro.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(&key.to_ascii_uppercase())
    }

    /// Valor explícito, sin defaults.
    pub fn explicit(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(&key.to_ascii_uppercase())
    }

    /// Valor explícito o, si falta, el default documentado del vocabulario.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        let key = key.to_ascii_uppercase();
        self.values.get(&key).or_else(|| vocabulary(self.software).default(&key))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ParamValue::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ParamValue::as_int)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(ParamValue::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    pub fn get_float_list(&self, key: &str) -> Option<&[f64]> {
        self.get(key).and_then(ParamValue::as_float_list)
    }

    pub fn values(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }

    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    /// Mapeo plano (valores conocidos + extra) tal como se serializa.
    pub fn to_raw(&self) -> BTreeMap<String, Value> {
        let mut out = self.extra.clone();
        for (k, v) in &self.values {
            out.insert(k.clone(), v.to_json());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(raw: Value) -> Result<InputParameters, DomainError> {
        let map = raw.as_object().cloned().unwrap_or_default();
        InputParameters::from_raw(Software::Vasp, map.iter())
    }

    #[test]
    fn incar_spellings_are_coerced() {
        let p = params(json!({"lhfcalc": ".TRUE.", "aexx": "0.25", "ldauu": "2*0.0 5.3", "nsw": 99.0, "gga": "pe "}))
            .expect("valid");
        assert_eq!(p.get_bool("LHFCALC"), Some(true));
        assert_eq!(p.get_f64("AEXX"), Some(0.25));
        assert_eq!(p.get_float_list("LDAUU"), Some(&[0.0, 0.0, 5.3][..]));
        assert_eq!(p.get_int("NSW"), Some(99));
        assert_eq!(p.get_str("GGA"), Some("pe"));
    }

    #[test]
    fn oversized_repeat_counts_are_rejected() {
        let err = params(json!({"LDAUU": "100000000000*0"})).unwrap_err();
        assert!(matches!(err, DomainError::InvalidParameter { ref key, .. } if key == "LDAUU"));
        assert!(params(json!({"LDAUU": "99999*0 2*1"})).is_err());
        let p = params(json!({"LDAUU": "99999*0 1"})).expect("at the limit");
        assert_eq!(p.get_float_list("LDAUU").map(<[f64]>::len), Some(MAX_FLOAT_LIST_LEN));
    }

    #[test]
    fn unknown_keys_go_to_extra() {
        let p = params(json!({"SYSTEM": "K bulk", "ENCUT": 520})).expect("valid");
        assert!(p.extra().contains_key("SYSTEM"));
        assert!(!p.contains("SYSTEM"));
        assert_eq!(p.get_f64("ENCUT"), Some(520.0));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let err = params(json!({"LDAU": "maybe"})).unwrap_err();
        assert!(matches!(err, DomainError::InvalidParameter { ref key, .. } if key == "LDAU"));
    }

    #[test]
    fn case_collisions_are_rejected() {
        assert!(params(json!({"nsw": 0, "NSW": 1})).is_err());
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let p = params(json!({})).expect("valid");
        assert_eq!(p.get_str("METAGGA"), Some("--"));
        assert_eq!(p.get_bool("LUSE_VDW"), Some(false));
        assert!(p.explicit("METAGGA").is_none());
    }
}

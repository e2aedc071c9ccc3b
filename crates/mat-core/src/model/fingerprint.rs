use serde::Serialize;

use crate::constants::BUILDER_VERSION;
use crate::hashing::hash_value;

use super::InputMarker;

/// Insumos del fingerprint de un grupo. No es el fingerprint final sino el
/// modelo previo a canonicalizar.
#[derive(Serialize)]
pub struct GroupFingerprintInput<'a> {
    pub builder_version: &'a str,
    pub doc_type: &'a str,
    pub processor_digest: &'a str,
    pub group_key: &'a str,
    pub inputs: Vec<&'a InputMarker>, // ordenados por (id, last_modified)
}

impl<'a> GroupFingerprintInput<'a> {
    pub fn new(doc_type: &'a str, processor_digest: &'a str, group_key: &'a str, inputs: &'a [InputMarker]) -> Self {
        let mut sorted: Vec<&InputMarker> = inputs.iter().collect();
        sorted.sort();
        Self { builder_version: BUILDER_VERSION,
               doc_type,
               processor_digest,
               group_key,
               inputs: sorted }
    }

    pub fn fingerprint(&self) -> String {
        match serde_json::to_value(self) {
            Ok(v) => hash_value(&v),
            // Serializar structs con campos string/fecha no falla; se deja un
            // valor que nunca coincide con un fingerprint previo.
            Err(e) => format!("unhashable:{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn marker(id: &str, secs: i64) -> InputMarker {
        InputMarker { id: id.into(),
                      last_modified: Utc.timestamp_opt(secs, 0).single().unwrap_or_default() }
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = vec![marker("a", 1), marker("b", 2)];
        let b = vec![marker("b", 2), marker("a", 1)];
        let fa = GroupFingerprintInput::new("thermo", "d", "K|GGA", &a).fingerprint();
        let fb = GroupFingerprintInput::new("thermo", "d", "K|GGA", &b).fingerprint();
        assert_eq!(fa, fb);
    }

    #[test]
    fn modification_marker_changes_fingerprint() {
        let a = vec![marker("a", 1)];
        let b = vec![marker("a", 2)];
        assert_ne!(GroupFingerprintInput::new("thermo", "d", "K", &a).fingerprint(),
                   GroupFingerprintInput::new("thermo", "d", "K", &b).fingerprint());
    }

    #[test]
    fn processor_digest_changes_fingerprint() {
        let a = vec![marker("a", 1)];
        assert_ne!(GroupFingerprintInput::new("thermo", "rules-v1", "K", &a).fingerprint(),
                   GroupFingerprintInput::new("thermo", "rules-v2", "K", &a).fingerprint());
    }
}

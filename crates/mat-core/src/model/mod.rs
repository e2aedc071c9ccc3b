//! Modelos neutrales (OutputDocument, BuildUnit, fingerprint).

pub mod document;
pub mod fingerprint;
pub mod unit;

pub use document::{BuildMeta, DocState, DocumentFields, OutputDocument, ProvenancedField};
pub use fingerprint::GroupFingerprintInput;
pub use unit::{BuildUnit, InputMarker};

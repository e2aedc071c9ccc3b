//! Vocabularios de parámetros conocidos por software.
//!
//! Cada entrada declara el tipo del parámetro y, cuando el programa
//! documenta uno independiente del resto del input, su valor por defecto.
//! `IBRION` no lleva default porque depende de `NSW`; lo resuelve el árbol
//! de task types.
use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::params::{ParamKind, ParamValue};
use crate::Software;

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub default: Option<ParamValue>,
}

#[derive(Debug)]
pub struct Vocabulary {
    software: Software,
    specs: BTreeMap<&'static str, ParamSpec>,
}

impl Vocabulary {
    fn build(software: Software, entries: &[(&'static str, ParamKind, Option<ParamValue>)]) -> Self {
        let specs = entries.iter()
                           .map(|(key, kind, default)| (*key, ParamSpec { kind: *kind, default: default.clone() }))
                           .collect();
        Self { software, specs }
    }

    pub fn software(&self) -> Software {
        self.software
    }

    pub fn spec(&self, key: &str) -> Option<&ParamSpec> {
        self.specs.get(key)
    }

    pub fn kind(&self, key: &str) -> Option<ParamKind> {
        self.specs.get(key).map(|s| s.kind)
    }

    pub fn default(&self, key: &str) -> Option<&ParamValue> {
        self.specs.get(key).and_then(|s| s.default.as_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.specs.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.keys().copied()
    }
}

fn s(v: &str) -> Option<ParamValue> {
    Some(ParamValue::Str(v.to_string()))
}

fn b(v: bool) -> Option<ParamValue> {
    Some(ParamValue::Bool(v))
}

fn i(v: i64) -> Option<ParamValue> {
    Some(ParamValue::Int(v))
}

fn f(v: f64) -> Option<ParamValue> {
    Some(ParamValue::Float(v))
}

static VASP: Lazy<Vocabulary> = Lazy::new(|| {
    use ParamKind::*;
    Vocabulary::build(Software::Vasp,
                      &[// funcional
                        ("GGA", Str, s("--")),
                        ("METAGGA", Str, s("--")),
                        ("LHFCALC", Bool, b(false)),
                        ("AEXX", Float, f(0.0)),
                        ("AGGAX", Float, f(1.0)),
                        ("AGGAC", Float, f(1.0)),
                        ("ALDAX", Float, f(1.0)),
                        ("ALDAC", Float, f(1.0)),
                        ("HFSCREEN", Float, f(0.0)),
                        // dispersión
                        ("LUSE_VDW", Bool, b(false)),
                        ("IVDW", Int, i(0)),
                        ("BPARAM", Float, f(6.0)),
                        ("CPARAM", Float, f(0.0093)),
                        ("PARAM1", Float, f(0.1234)),
                        ("PARAM2", Float, f(1.0)),
                        ("ZAB_VDW", Float, f(-0.8491)),
                        // Hubbard U
                        ("LDAU", Bool, b(false)),
                        ("LDAUTYPE", Int, i(2)),
                        ("LDAUU", FloatList, Some(ParamValue::FloatList(Vec::new()))),
                        ("LDAUJ", FloatList, Some(ParamValue::FloatList(Vec::new()))),
                        ("LDAUL", FloatList, Some(ParamValue::FloatList(Vec::new()))),
                        // carácter del cálculo
                        ("ISTART", Int, i(0)),
                        ("ICHARG", Int, i(2)),
                        ("IBRION", Int, None),
                        ("NSW", Int, i(0)),
                        ("ISIF", Int, i(2)),
                        ("POTIM", Float, f(0.5)),
                        ("LEPSILON", Bool, b(false)),
                        ("LOPTICS", Bool, b(false)),
                        ("LRPA", Bool, b(false)),
                        ("LCHIMAG", Bool, b(false)),
                        ("LEFG", Bool, b(false)),
                        ("MDALGO", Int, i(0)),
                        ("TEBEG", Float, None),
                        // numérica
                        ("ENCUT", Float, None),
                        ("PREC", Str, s("Normal")),
                        ("ALGO", Str, s("Normal")),
                        ("EDIFF", Float, f(1e-4)),
                        ("EDIFFG", Float, None),
                        ("NELM", Int, i(60)),
                        ("ISMEAR", Int, i(1)),
                        ("SIGMA", Float, f(0.2)),
                        ("ISPIN", Int, i(1)),
                        ("MAGMOM", FloatList, None),
                        ("NBANDS", Int, None),
                        ("NELECT", Float, None),
                        ("NEDOS", Int, i(301)),
                        ("LORBIT", Int, None),
                        ("LMAXMIX", Int, i(2)),
                        ("LASPH", Bool, b(false)),
                        ("LREAL", Str, s("False")),
                        ("KSPACING", Float, None),
                        ("LWAVE", Bool, b(true)),
                        ("LCHARG", Bool, b(true))])
});

static QCHEM: Lazy<Vocabulary> = Lazy::new(|| {
    use ParamKind::*;
    Vocabulary::build(Software::QChem,
                      &[("METHOD", Str, s("--")),
                        ("EXCHANGE", Str, s("--")),
                        ("CORRELATION", Str, s("--")),
                        ("DFT_D", Str, s("--")),
                        ("BASIS", Str, None),
                        ("JOB_TYPE", Str, s("sp")),
                        ("SOLVENT_METHOD", Str, s("--")),
                        ("UNRESTRICTED", Bool, b(false)),
                        ("SCF_CONVERGENCE", Int, i(8)),
                        ("MAX_SCF_CYCLES", Int, i(50)),
                        ("GEOM_OPT_MAX_CYCLES", Int, i(50)),
                        ("THRESH", Int, i(8)),
                        ("SYM_IGNORE", Bool, b(false)),
                        ("SYMMETRY", Bool, b(true)),
                        ("MEM_TOTAL", Int, None),
                        ("XC_GRID", Int, None),
                        ("AIMD_STEPS", Int, None)])
});

/// Vocabulario inmutable del software, compartido sin sincronización.
pub fn vocabulary(software: Software) -> &'static Vocabulary {
    match software {
        Software::Vasp => &VASP,
        Software::QChem => &QCHEM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabularies_are_upper_case() {
        for sw in Software::ALL {
            assert!(vocabulary(sw).keys().all(|k| k == k.to_ascii_uppercase()));
        }
    }

    #[test]
    fn defaults_match_declared_kind() {
        for sw in Software::ALL {
            let vocab = vocabulary(sw);
            for key in vocab.keys() {
                if let Some(spec) = vocab.spec(key) {
                    if let Some(default) = &spec.default {
                        assert_eq!(default.kind(), spec.kind, "{sw}:{key}");
                    }
                }
            }
        }
    }
}

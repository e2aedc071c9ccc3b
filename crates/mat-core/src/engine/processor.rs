use crate::errors::GroupProcessingFailure;
use crate::model::{BuildUnit, DocumentFields};

/// Procesador de unidades de un tipo de documento.
///
/// Implementaciones deben ser puras respecto a la unidad: mismo payload,
/// mismos campos. El orquestador puede invocarlas en paralelo y en cualquier
/// orden, de ahí el bound `Sync`.
pub trait UnitProcessor<T>: Sync {
    /// Tipo de documento producido (clave de BuildState y de la store).
    fn doc_type(&self) -> &str;

    /// Huella de la lógica/configuración del procesador. Entra en el
    /// fingerprint de cada grupo: si cambia, todos los grupos se reprocesan.
    fn digest(&self) -> String;

    /// Produce los campos del documento para una unidad.
    fn process(&self, unit: &BuildUnit<T>) -> Result<DocumentFields, GroupProcessingFailure>;
}

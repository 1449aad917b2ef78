use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::core::domain::Structure;
use crate::core::spatial;

/// A symmetry-detection backend able to map a structure onto its
/// symmetrized equivalent.
pub trait SymmetryBackend: Send + Sync {
    fn symmetrize(&self, structure: &Structure) -> Result<Structure>;

    /// Returns the name of the backend (e.g., "spglib 2.1").
    fn name(&self) -> &str;
}

/// Symmetrization capability, selected when the controller is built.
#[derive(Clone, Default)]
pub enum Symmetrizer {
    /// No symmetry backend: structures pass through untouched.
    #[default]
    Identity,
    Real(Arc<dyn SymmetryBackend>),
}

impl Symmetrizer {
    pub fn real(backend: Arc<dyn SymmetryBackend>) -> Self {
        Symmetrizer::Real(backend)
    }

    /// Total: a failing backend degrades to identity.
    pub fn apply(&self, structure: &Structure) -> Structure {
        match self {
            Symmetrizer::Identity => structure.clone(),
            Symmetrizer::Real(backend) => match backend.symmetrize(structure) {
                Ok(mut sym) if sym.len() == structure.len() => {
                    spatial::wrap_into_cell(&mut sym);
                    sym
                }
                Ok(sym) => {
                    log::warn!(
                        target: "cellrelax",
                        "{} changed the atom count ({} -> {}); keeping the input structure",
                        backend.name(),
                        structure.len(),
                        sym.len()
                    );
                    structure.clone()
                }
                Err(e) => {
                    log::warn!(
                        target: "cellrelax",
                        "{} failed ({}); keeping the input structure",
                        backend.name(),
                        e
                    );
                    structure.clone()
                }
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symmetrizer::Identity => "identity",
            Symmetrizer::Real(backend) => backend.name(),
        }
    }
}

impl fmt::Debug for Symmetrizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Symmetrizer").field(&self.name()).finish()
    }
}

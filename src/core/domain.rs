use nalgebra::{Matrix3, Point3, Vector3};
use serde::{Deserialize, Serialize};

// --- Tensors reported by the engine ---

/// Per-atom force vectors, in the order of [`Structure::atoms`].
pub type ForceTensor = Vec<Vector3<f64>>;

/// Cell stress tensor.
pub type StressTensor = Matrix3<f64>;

// --- Physics Types ---

/// A single atom of a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub symbol: String,
    pub position: Point3<f64>, // Cartesian, Å
}

impl Atom {
    pub fn new(symbol: &str, position: Point3<f64>) -> Self {
        Self {
            symbol: symbol.to_string(),
            position,
        }
    }
}

/// Periodic cell of a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    pub vectors: Matrix3<f64>, // Columns are a, b, c
    pub inverse: Matrix3<f64>, // Precomputed for fractional conversion
}

impl Lattice {
    pub fn new(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Option<Self> {
        let vectors = Matrix3::from_columns(&[a, b, c]);
        let inverse = vectors.try_inverse()?;
        Some(Self { vectors, inverse })
    }

    /// Orthorhombic cell with edge lengths `a`, `b`, `c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Option<Self> {
        Self::new(
            Vector3::new(a, 0.0, 0.0),
            Vector3::new(0.0, b, 0.0),
            Vector3::new(0.0, 0.0, c),
        )
    }

    pub fn to_fractional(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.inverse * p.coords)
    }

    pub fn to_cartesian(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.vectors * p.coords)
    }
}

/// The structure handed to the engine and replaced after each accepted run.
///
/// The controller never looks inside a structure; it only compares and
/// replaces whole values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub atoms: Vec<Atom>,
    pub lattice: Option<Lattice>,
}

impl Structure {
    pub fn new(atoms: Vec<Atom>, lattice: Option<Lattice>) -> Self {
        Self { atoms, lattice }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

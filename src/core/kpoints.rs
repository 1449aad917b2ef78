use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum KPointsError {
    #[error("k-point grid must have at least one point per direction, got {0:?}")]
    EmptyGrid([u32; 3]),
    #[error("{points} k-points but {weights} weights")]
    WeightMismatch { points: usize, weights: usize },
    #[error("a k-point path needs at least one vertex")]
    EmptyPath,
}

/// Code-agnostic description of a k-point set.
///
/// Grids (`Gamma`, `MonkhorstPack`) carry a mesh and a shift; explicit lists
/// (`Cartesian`, `Reciprocal`) carry points and weights; `Path` carries the
/// vertices and the number of points between consecutive vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum KPoints {
    Gamma {
        grid: [u32; 3],
        shifts: [f64; 3],
    },
    MonkhorstPack {
        grid: [u32; 3],
        shifts: [f64; 3],
    },
    Cartesian {
        points: Vec<Vector3<f64>>,
        weights: Vec<f64>,
    },
    Reciprocal {
        points: Vec<Vector3<f64>>,
        weights: Vec<f64>,
    },
    Path {
        vertices: Vec<Vector3<f64>>,
        intermediates: u32,
    },
}

impl Default for KPoints {
    /// A single point at Gamma.
    fn default() -> Self {
        KPoints::Gamma {
            grid: [1, 1, 1],
            shifts: [0.0; 3],
        }
    }
}

impl KPoints {
    pub fn gamma(grid: [u32; 3]) -> Result<Self, KPointsError> {
        check_grid(grid)?;
        Ok(KPoints::Gamma {
            grid,
            shifts: [0.0; 3],
        })
    }

    pub fn monkhorst_pack(grid: [u32; 3], shifts: [f64; 3]) -> Result<Self, KPointsError> {
        check_grid(grid)?;
        Ok(KPoints::MonkhorstPack { grid, shifts })
    }

    /// Explicit list in reciprocal-lattice units. Missing weights default to 1.
    pub fn reciprocal(
        points: Vec<Vector3<f64>>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, KPointsError> {
        let weights = check_weights(&points, weights)?;
        Ok(KPoints::Reciprocal { points, weights })
    }

    /// Explicit list of Cartesian k-vectors. Missing weights default to 1.
    pub fn cartesian(
        points: Vec<Vector3<f64>>,
        weights: Option<Vec<f64>>,
    ) -> Result<Self, KPointsError> {
        let weights = check_weights(&points, weights)?;
        Ok(KPoints::Cartesian { points, weights })
    }

    pub fn path(vertices: Vec<Vector3<f64>>, intermediates: u32) -> Result<Self, KPointsError> {
        if vertices.is_empty() {
            return Err(KPointsError::EmptyPath);
        }
        Ok(KPoints::Path {
            vertices,
            intermediates: intermediates.max(1),
        })
    }

    /// Number of k-points. For grids this is the product of the mesh,
    /// before any symmetry reduction done by the engine.
    pub fn nkpt(&self) -> usize {
        match self {
            KPoints::Gamma { grid, .. } | KPoints::MonkhorstPack { grid, .. } => {
                grid.iter().map(|&n| n as usize).product()
            }
            KPoints::Cartesian { points, .. } | KPoints::Reciprocal { points, .. } => points.len(),
            KPoints::Path {
                vertices,
                intermediates,
            } => vertices.len() * (*intermediates as usize),
        }
    }
}

fn check_grid(grid: [u32; 3]) -> Result<(), KPointsError> {
    if grid.iter().any(|&n| n == 0) {
        return Err(KPointsError::EmptyGrid(grid));
    }
    Ok(())
}

fn check_weights(
    points: &[Vector3<f64>],
    weights: Option<Vec<f64>>,
) -> Result<Vec<f64>, KPointsError> {
    match weights {
        None => Ok(vec![1.0; points.len()]),
        Some(w) if w.len() == points.len() => Ok(w),
        Some(w) => Err(KPointsError::WeightMismatch {
            points: points.len(),
            weights: w.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_counts_and_validation() {
        let k = KPoints::gamma([7, 7, 7]).unwrap();
        assert_eq!(k.nkpt(), 343);
        assert_eq!(KPoints::default().nkpt(), 1);
        assert_eq!(
            KPoints::gamma([4, 0, 4]),
            Err(KPointsError::EmptyGrid([4, 0, 4]))
        );

        let mp = KPoints::monkhorst_pack([4, 4, 2], [0.5, 0.5, 0.0]).unwrap();
        assert_eq!(mp.nkpt(), 32);
        assert_eq!(
            KPoints::monkhorst_pack([0, 1, 1], [0.0; 3]),
            Err(KPointsError::EmptyGrid([0, 1, 1]))
        );
    }

    #[test]
    fn explicit_lists_default_weights() {
        let k = KPoints::reciprocal(vec![Vector3::zeros(), Vector3::new(0.5, 0.0, 0.0)], None)
            .unwrap();
        match &k {
            KPoints::Reciprocal { weights, .. } => assert_eq!(weights, &vec![1.0, 1.0]),
            other => panic!("unexpected mode {:?}", other),
        }
        assert_eq!(k.nkpt(), 2);

        let err = KPoints::cartesian(vec![Vector3::zeros()], Some(vec![1.0, 2.0])).unwrap_err();
        assert_eq!(err, KPointsError::WeightMismatch { points: 1, weights: 2 });
    }

    #[test]
    fn path_counts_intermediates() {
        let k = KPoints::path(vec![Vector3::zeros(), Vector3::new(0.5, 0.5, 0.5)], 10).unwrap();
        assert_eq!(k.nkpt(), 20);
        assert_eq!(KPoints::path(vec![], 3), Err(KPointsError::EmptyPath));
    }
}

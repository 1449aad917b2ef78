use crate::core::domain::{ForceTensor, StressTensor, Structure};

/// Running max of absolute values. A NaN anywhere poisons the result,
/// since `f64::max` alone would skip it.
fn max_abs<'a>(components: impl Iterator<Item = &'a f64>) -> f64 {
    components.fold(0.0_f64, |acc, c| {
        if acc.is_nan() || c.is_nan() {
            f64::NAN
        } else {
            acc.max(c.abs())
        }
    })
}

/// Largest absolute Cartesian component of a force tensor.
/// An empty tensor yields 0.0, a NaN component yields NaN.
pub fn max_abs_force(forces: &ForceTensor) -> f64 {
    max_abs(forces.iter().flat_map(|f| f.iter()))
}

/// Largest absolute component of a stress tensor.
pub fn max_abs_stress(stress: &StressTensor) -> f64 {
    max_abs(stress.iter())
}

/// Wraps atoms into the primary unit cell `[0, 1)` (periodic only).
///
/// **Invariant**: Modifies positions in-place. Does NOT reorder atoms.
/// Non-periodic structures are left untouched.
pub fn wrap_into_cell(structure: &mut Structure) {
    if let Some(lat) = &structure.lattice {
        for atom in &mut structure.atoms {
            let mut frac = lat.to_fractional(&atom.position);
            frac.coords.x = frac.coords.x.rem_euclid(1.0);
            frac.coords.y = frac.coords.y.rem_euclid(1.0);
            frac.coords.z = frac.coords.z.rem_euclid(1.0);
            atom.position = lat.to_cartesian(&frac);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{Atom, Lattice};
    use nalgebra::{Matrix3, Point3, Vector3};

    #[test]
    fn max_abs_picks_negative_components() {
        let forces = vec![Vector3::new(0.1, -0.4, 0.2), Vector3::new(0.0, 0.3, -0.05)];
        assert!((max_abs_force(&forces) - 0.4).abs() < 1e-12);
        assert_eq!(max_abs_force(&Vec::new()), 0.0);

        let stress = Matrix3::new(0.0, 0.0, 0.0, 0.0, -2.5, 0.0, 0.0, 0.0, 1.0);
        assert!((max_abs_stress(&stress) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn nan_components_are_not_skipped() {
        let forces = vec![Vector3::new(0.1, f64::NAN, 0.2), Vector3::new(0.0, 0.3, 0.0)];
        assert!(max_abs_force(&forces).is_nan());

        let mut stress = Matrix3::zeros();
        stress[(2, 2)] = f64::NAN;
        assert!(max_abs_stress(&stress).is_nan());
    }

    #[test]
    fn wrap_moves_atoms_into_cell() {
        let lattice = Lattice::orthorhombic(2.0, 2.0, 2.0).unwrap();
        let mut s = Structure::new(
            vec![Atom::new("Si", Point3::new(2.5, -0.5, 1.0))],
            Some(lattice),
        );
        wrap_into_cell(&mut s);
        let p = s.atoms[0].position;
        assert!((p.x - 0.5).abs() < 1e-12);
        assert!((p.y - 1.5).abs() < 1e-12);
        assert!((p.z - 1.0).abs() < 1e-12);
    }
}

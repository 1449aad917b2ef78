use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single named engine option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => write!(f, "Yes"),
            OptionValue::Bool(false) => write!(f, "No"),
            OptionValue::Int(v) => write!(f, "{}", v),
            OptionValue::Real(v) => write!(f, "{:e}", v),
            OptionValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Named options in a stable order.
pub type OptionMap = BTreeMap<String, OptionValue>;

/// Which atoms the optimizer may move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovedAtoms {
    /// Every atom ("1:-1").
    All,
    /// Engine-specific selection expression.
    Selection(String),
}

impl MovedAtoms {
    pub fn as_engine_str(&self) -> &str {
        match self {
            MovedAtoms::All => "1:-1",
            MovedAtoms::Selection(s) => s,
        }
    }
}

/// Geometry-driver controls for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverOptions {
    pub lattice_opt: bool,
    pub moved_atoms: MovedAtoms,
    pub max_force_component: f64,
    pub max_steps: u32,
    pub convergent_forces_only: bool,
}

impl DriverOptions {
    pub fn to_options(&self) -> OptionMap {
        let mut map = OptionMap::new();
        map.insert("LatticeOpt".into(), OptionValue::Bool(self.lattice_opt));
        map.insert(
            "MovedAtoms".into(),
            OptionValue::Text(self.moved_atoms.as_engine_str().to_string()),
        );
        map.insert(
            "MaxForceComponent".into(),
            OptionValue::Real(self.max_force_component),
        );
        map.insert("MaxSteps".into(), OptionValue::Int(i64::from(self.max_steps)));
        map.insert(
            "ConvergentForcesOnly".into(),
            OptionValue::Bool(self.convergent_forces_only),
        );
        map
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianOptions {
    pub max_scc_iterations: u32,
}

impl HamiltonianOptions {
    pub fn to_options(&self) -> OptionMap {
        let mut map = OptionMap::new();
        map.insert(
            "MaxSCCIterations".into(),
            OptionValue::Int(i64::from(self.max_scc_iterations)),
        );
        map
    }
}

/// The configuration submitted with exactly one engine run.
///
/// Values are never edited in place while a run is live: every `with_*`
/// method returns a new configuration for the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `None` is a bare single-point (static) run.
    pub driver: Option<DriverOptions>,
    pub hamiltonian: HamiltonianOptions,
    pub calculate_forces: bool,
}

impl EngineConfig {
    /// Positions-only relaxation towards `force_target` with SCC-converged
    /// forces required.
    pub fn relaxation(force_target: f64, max_steps: u32, max_scc_iterations: u32) -> Self {
        Self {
            driver: Some(DriverOptions {
                lattice_opt: false,
                moved_atoms: MovedAtoms::All,
                max_force_component: force_target,
                max_steps,
                convergent_forces_only: true,
            }),
            hamiltonian: HamiltonianOptions { max_scc_iterations },
            calculate_forces: false,
        }
    }

    /// Single-point run with results reporting forced on.
    pub fn static_run(max_scc_iterations: u32) -> Self {
        Self {
            driver: None,
            hamiltonian: HamiltonianOptions { max_scc_iterations },
            calculate_forces: true,
        }
    }

    /// Short best-effort relaxation used when the static run came back
    /// incomplete.
    pub fn fallback(force_target: f64, max_steps: u32, max_scc_iterations: u32) -> Self {
        let mut config = Self::relaxation(force_target, max_steps, max_scc_iterations);
        if let Some(driver) = config.driver.as_mut() {
            driver.convergent_forces_only = false;
        }
        config
    }

    pub fn with_convergent_forces_only(&self, required: bool) -> Self {
        let mut next = self.clone();
        if let Some(driver) = next.driver.as_mut() {
            driver.convergent_forces_only = required;
        }
        next
    }

    /// Relax internal coordinates, and the cell when `relax_cell` is set.
    pub fn with_cell_relaxation(&self, relax_cell: bool) -> Self {
        let mut next = self.clone();
        if let Some(driver) = next.driver.as_mut() {
            driver.lattice_opt = relax_cell;
            driver.moved_atoms = MovedAtoms::All;
        }
        next
    }

    pub fn is_static(&self) -> bool {
        self.driver.is_none()
    }

    pub fn lattice_opt(&self) -> bool {
        self.driver.as_ref().map_or(false, |d| d.lattice_opt)
    }

    pub fn driver_options(&self) -> OptionMap {
        self.driver
            .as_ref()
            .map(DriverOptions::to_options)
            .unwrap_or_default()
    }

    pub fn hamiltonian_options(&self) -> OptionMap {
        self.hamiltonian.to_options()
    }

    /// Top-level run options outside the driver and Hamiltonian blocks.
    pub fn run_options(&self) -> OptionMap {
        let mut map = OptionMap::new();
        map.insert(
            "CalculateForces".into(),
            OptionValue::Bool(self.calculate_forces),
        );
        map
    }
}

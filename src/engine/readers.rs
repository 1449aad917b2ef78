use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::domain::{ForceTensor, StressTensor, Structure};
use crate::core::spatial;

/// Forces, stress and energy of one completed run. Any of them may be
/// missing when the run stopped before they were defined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsReport {
    pub forces: Option<ForceTensor>,
    pub stress: Option<StressTensor>,
    pub total_energy: Option<f64>,
}

impl ResultsReport {
    pub fn is_complete(&self) -> bool {
        self.forces.is_some() && self.stress.is_some() && self.total_energy.is_some()
    }

    pub fn max_force(&self) -> Option<f64> {
        self.forces.as_ref().map(spatial::max_abs_force)
    }

    pub fn max_stress(&self) -> Option<f64> {
        self.stress.as_ref().map(spatial::max_abs_stress)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceFlags {
    /// Every ionic step reached SCC convergence.
    pub ion_convergence: bool,
    /// The last SCC cycle converged.
    pub scc_convergence: bool,
}

/// Geometry-optimization history recorded in the engine's running log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressLog {
    #[serde(default)]
    pub flags: ConvergenceFlags,
    /// Max force component after each optimizer step.
    #[serde(default)]
    pub max_force: Vec<f64>,
    /// Max lattice force after each step (cell relaxations only).
    #[serde(default)]
    pub max_lattice_force: Vec<f64>,
}

impl ProgressLog {
    pub fn last_max_force(&self) -> Option<f64> {
        self.max_force.last().copied()
    }

    pub fn last_max_lattice_force(&self) -> Option<f64> {
        self.max_lattice_force.last().copied()
    }

    pub fn steps(&self) -> usize {
        self.max_force.len()
    }
}

/// Parsed outcome of one finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationResult {
    pub report: ResultsReport,
    pub progress: ProgressLog,
}

/// Readers for the three artifacts an engine run leaves behind.
///
/// None of them fail: a missing or truncated artifact reads as absent or
/// empty, which is a normal state while a run is still going.
pub trait OutputReader: Send + Sync {
    fn read_results(&self, path: &Path) -> ResultsReport;

    fn read_progress_log(&self, path: &Path) -> ProgressLog;

    fn read_final_geometry(&self, path: &Path) -> Option<Structure>;
}

/// File names of the artifacts inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactLayout {
    pub results: String,
    pub progress_log: String,
    pub final_geometry: String,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self {
            results: "detailed.out".to_string(),
            progress_log: "dftb_stdout.log".to_string(),
            final_geometry: "geo_end.gen".to_string(),
        }
    }
}

impl ArtifactLayout {
    pub fn results_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.results)
    }

    pub fn progress_log_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.progress_log)
    }

    pub fn final_geometry_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.final_geometry)
    }

    pub fn all(&self) -> [&str; 3] {
        [
            self.results.as_str(),
            self.progress_log.as_str(),
            self.final_geometry.as_str(),
        ]
    }
}

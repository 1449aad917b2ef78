use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::domain::Structure;
use crate::core::symmetry::Symmetrizer;
use crate::error::{RelaxError, Result};
use crate::relax::scoring::QualityScore;

/// Where the controller is in the relaxation of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Configuring,
    Running,
    Polling,
    Evaluating,
    Finalizing,
    FallbackStatic,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Working state of one relaxation request.
///
/// Only the controller writes to a job, and only between engine runs.
#[derive(Debug, Clone)]
pub struct RelaxationJob {
    id: Uuid,
    workspace: PathBuf,
    initial_structure: Structure,
    structure: Structure,
    target_forces: f64,
    waiting: bool,
    pub(crate) iteration: usize,
    pub(crate) phase: Phase,
    pub(crate) score: QualityScore,
}

impl RelaxationJob {
    /// Creates a job. The starting structure is symmetrized once here and
    /// kept as the initial structure.
    ///
    /// # Errors
    /// `InvalidJob` when `target_forces` is not a positive finite number.
    pub fn new(
        workspace: impl Into<PathBuf>,
        structure: &Structure,
        target_forces: f64,
        symmetrizer: &Symmetrizer,
    ) -> Result<Self> {
        if !(target_forces > 0.0 && target_forces.is_finite()) {
            return Err(RelaxError::InvalidJob(format!(
                "target forces must be positive, got {}",
                target_forces
            )));
        }
        let initial_structure = symmetrizer.apply(structure);
        Ok(Self {
            id: Uuid::new_v4(),
            workspace: workspace.into(),
            structure: initial_structure.clone(),
            initial_structure,
            target_forces,
            waiting: false,
            iteration: 0,
            phase: Phase::Configuring,
            score: QualityScore::ZERO,
        })
    }

    /// Block on the engine process instead of polling it.
    pub fn blocking(mut self, waiting: bool) -> Self {
        self.waiting = waiting;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Short identity used in log lines (the workspace's last component).
    pub fn label(&self) -> String {
        self.workspace
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.workspace.display().to_string())
    }

    pub fn initial_structure(&self) -> &Structure {
        &self.initial_structure
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn target_forces(&self) -> f64 {
        self.target_forces
    }

    pub fn is_blocking(&self) -> bool {
        self.waiting
    }

    /// Number of accepted engine runs so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> QualityScore {
        self.score
    }

    pub(crate) fn adopt(&mut self, structure: Structure) {
        self.structure = structure;
    }
}

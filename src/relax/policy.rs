use serde::{Deserialize, Serialize};

use crate::engine::config::EngineConfig;
use crate::engine::readers::ResultsReport;

/// Degrees of freedom released for the next relaxation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelaxMode {
    InternalsAndCell,
    InternalsOnly,
}

impl RelaxMode {
    pub fn relaxes_cell(self) -> bool {
        matches!(self, RelaxMode::InternalsAndCell)
    }

    pub fn label(self) -> &'static str {
        match self {
            RelaxMode::InternalsAndCell => "Internals + Cell",
            RelaxMode::InternalsOnly => "Internals",
        }
    }
}

/// Classification of one run's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub good_forces: bool,
    pub good_stress: bool,
    /// Whether the next run must only accept SCC-converged forces.
    pub convergent_forces_only: bool,
}

/// A quantity is good when present, finite and strictly below
/// `factor * target`.
pub fn is_good(max_abs: Option<f64>, target: f64, factor: f64) -> bool {
    matches!(max_abs, Some(m) if m.is_finite() && m < factor * target)
}

pub fn evaluate(report: &ResultsReport, target: f64, factor: f64) -> Verdict {
    Verdict {
        good_forces: is_good(report.max_force(), target, factor),
        good_stress: is_good(report.max_stress(), target, factor),
        // Missing tensors mean the SCC never converged; let the engine report
        // unconverged forces next time so the run produces something.
        convergent_forces_only: report.forces.is_some() && report.stress.is_some(),
    }
}

/// Picks what to relax next. `None` leaves the previous choice in place.
///
/// Good forces with bad stress also relaxes the cell: only good stress with
/// bad forces pins it.
pub fn decide(good_forces: bool, good_stress: bool) -> Option<RelaxMode> {
    match (good_forces, good_stress) {
        (true, true) => Some(RelaxMode::InternalsAndCell),
        (false, true) => Some(RelaxMode::InternalsOnly),
        (true, false) => Some(RelaxMode::InternalsAndCell),
        (false, false) => None,
    }
}

/// Builds the configuration of the next relaxation run from the current one.
pub fn next_config(
    current: &EngineConfig,
    verdict: &Verdict,
    mode: Option<RelaxMode>,
) -> EngineConfig {
    let next = current.with_convergent_forces_only(verdict.convergent_forces_only);
    match mode {
        Some(mode) => next.with_cell_relaxation(mode.relaxes_cell()),
        None => next,
    }
}

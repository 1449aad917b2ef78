use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::readers::ProgressLog;

/// Added for every completed run, whatever its outcome.
pub const LIVENESS_BONUS: u32 = 1;
/// Added when the run ended with both force and lattice force below target.
pub const CONVERGED_BONUS: u32 = 100;

/// Accumulated evidence that the relaxation has converged.
///
/// Not a physical quantity: it only ever grows and is compared against the
/// finalization threshold.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct QualityScore(u32);

impl QualityScore {
    pub const ZERO: QualityScore = QualityScore(0);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    fn bump(self, amount: u32) -> Self {
        Self(self.0.saturating_add(amount))
    }
}

impl fmt::Display for QualityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signals noticed while scoring. Only `TargetReached` changes the score;
/// the others are reported for the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreNote {
    IonicConvergence,
    NoForceHistory,
    TargetReached,
    ForcesAboveTarget,
    ForcesDecreasing,
    LatticeForcesAboveTarget,
    LatticeForcesDecreasing,
}

impl fmt::Display for ScoreNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ScoreNote::IonicConvergence => "ionic steps converged",
            ScoreNote::NoForceHistory => "no max-force history reported",
            ScoreNote::TargetReached => "target forces and stress achieved (score +100)",
            ScoreNote::ForcesAboveTarget => "target forces not achieved",
            ScoreNote::ForcesDecreasing => "forces are decreasing",
            ScoreNote::LatticeForcesAboveTarget => "target stress not achieved",
            ScoreNote::LatticeForcesDecreasing => "stress is decreasing",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub score: QualityScore,
    pub notes: Vec<ScoreNote>,
}

/// Rates the run that just finished.
///
/// Pure: the result depends only on the arguments. The returned score is
/// always at least `previous + 1`.
pub fn assess(previous: QualityScore, progress: &ProgressLog, target: f64) -> Assessment {
    let mut score = previous.bump(LIVENESS_BONUS);
    let mut notes = Vec::new();

    if progress.flags.ion_convergence {
        notes.push(ScoreNote::IonicConvergence);
    }

    let (first_force, last_force) = match (progress.max_force.first(), progress.max_force.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => {
            notes.push(ScoreNote::NoForceHistory);
            return Assessment { score, notes };
        }
    };

    if let Some(last_lattice) = progress.last_max_lattice_force() {
        if last_force < target && last_lattice < target {
            score = score.bump(CONVERGED_BONUS);
            notes.push(ScoreNote::TargetReached);
        }
    }

    if last_force > target {
        notes.push(ScoreNote::ForcesAboveTarget);
    }
    if last_force < first_force {
        notes.push(ScoreNote::ForcesDecreasing);
    }

    if let (Some(&first), Some(&last)) = (
        progress.max_lattice_force.first(),
        progress.max_lattice_force.last(),
    ) {
        if last > target {
            notes.push(ScoreNote::LatticeForcesAboveTarget);
        }
        if last < first {
            notes.push(ScoreNote::LatticeForcesDecreasing);
        }
    }

    Assessment { score, notes }
}

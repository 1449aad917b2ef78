use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::kpoints::KPoints;
use crate::engine::readers::ArtifactLayout;
use crate::error::{RelaxError, Result};

/// Tunables of the relaxation loop. Every field has a default, so a
/// settings file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxSettings {
    /// Score at which the loop stops relaxing and runs the static check.
    pub finalize_score: u32,
    /// Fraction of the job's target handed to the optimizer, so that
    /// symmetrization before the static run does not push forces over target.
    pub force_target_factor: f64,
    /// Forces/stress count as "good" below this multiple of the target.
    pub good_threshold_factor: f64,
    pub relax_max_steps: u32,
    pub max_scc_iterations: u32,
    pub fallback_max_steps: u32,
    pub poll_interval_secs: f64,
    pub kpoints: KPoints,
    pub artifacts: ArtifactLayout,
}

impl Default for RelaxSettings {
    fn default() -> Self {
        Self {
            finalize_score: 20,
            force_target_factor: 0.9,
            good_threshold_factor: 10.0,
            relax_max_steps: 50,
            max_scc_iterations: 50,
            fallback_max_steps: 10,
            poll_interval_secs: 10.0,
            kpoints: KPoints::Gamma {
                grid: [7, 7, 7],
                shifts: [0.0; 3],
            },
            artifacts: ArtifactLayout::default(),
        }
    }
}

impl RelaxSettings {
    /// Reads settings from a JSON file and validates them.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let settings: RelaxSettings = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| RelaxError::InvalidSettings(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.force_target_factor > 0.0 && self.force_target_factor.is_finite()) {
            return Err(RelaxError::InvalidSettings(format!(
                "force_target_factor must be positive, got {}",
                self.force_target_factor
            )));
        }
        if !(self.good_threshold_factor > 0.0 && self.good_threshold_factor.is_finite()) {
            return Err(RelaxError::InvalidSettings(format!(
                "good_threshold_factor must be positive, got {}",
                self.good_threshold_factor
            )));
        }
        if !(self.poll_interval_secs >= 0.0 && self.poll_interval_secs.is_finite()) {
            return Err(RelaxError::InvalidSettings(format!(
                "poll_interval_secs must be a non-negative number, got {}",
                self.poll_interval_secs
            )));
        }
        if self.relax_max_steps == 0 || self.fallback_max_steps == 0 {
            return Err(RelaxError::InvalidSettings(
                "step caps must be at least 1".to_string(),
            ));
        }
        if self.max_scc_iterations == 0 {
            return Err(RelaxError::InvalidSettings(
                "max_scc_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }
}

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::readers::ResultsReport;
use crate::error::Result;
use crate::relax::job::Phase;
use crate::relax::policy::RelaxMode;
use crate::relax::scoring::QualityScore;

/// One finished engine run as seen by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Phase that submitted the run (`Running` for relaxation runs).
    pub phase: Phase,
    pub finished_at: DateTime<Utc>,
    pub exit_code: Option<i32>,
    pub max_force: Option<f64>,
    pub max_stress: Option<f64>,
    pub total_energy: Option<f64>,
    pub score: u32,
    pub mode: Option<RelaxMode>,
}

impl IterationRecord {
    pub fn new(
        iteration: usize,
        phase: Phase,
        exit_code: Option<i32>,
        results: &ResultsReport,
        score: QualityScore,
    ) -> Self {
        Self {
            iteration,
            phase,
            finished_at: Utc::now(),
            exit_code,
            max_force: results.max_force(),
            max_stress: results.max_stress(),
            total_energy: results.total_energy,
            score: score.value(),
            mode: None,
        }
    }
}

/// History of a job, exportable as CSV or JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelaxReport {
    pub job: Uuid,
    pub records: Vec<IterationRecord>,
}

impl RelaxReport {
    pub fn new(job: Uuid) -> Self {
        Self {
            job,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn last_mut(&mut self) -> Option<&mut IterationRecord> {
        self.records.last_mut()
    }

    /// Lowest total energy among the recorded runs.
    pub fn best_energy(&self) -> Option<f64> {
        self.records
            .iter()
            .filter_map(|r| r.total_energy)
            .fold(None, |best, e| match best {
                Some(b) if b <= e => Some(b),
                _ => Some(e),
            })
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

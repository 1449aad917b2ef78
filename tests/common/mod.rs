#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use nalgebra::{Matrix3, Point3, Vector3};

use cellrelax::config::RelaxSettings;
use cellrelax::core::domain::{Atom, Lattice, Structure};
use cellrelax::core::kpoints::KPoints;
use cellrelax::engine::adapter::{EngineAdapter, RunStatus};
use cellrelax::engine::config::{OptionMap, OptionValue};
use cellrelax::engine::external::process::archived_name;
use cellrelax::engine::readers::{ArtifactLayout, ConvergenceFlags, ProgressLog, ResultsReport};

/// What one scripted engine run leaves behind.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRun {
    /// `None` means the results file is never written.
    pub results: Option<ResultsReport>,
    pub progress: ProgressLog,
    pub geometry: Option<Structure>,
    /// Polls answering `NotStarted` before the run shows up.
    pub not_started_polls: usize,
    /// Polls answering `Running` before the run exits.
    pub running_polls: usize,
    pub exit_code: i32,
    /// The engine rejects the submit and never starts this run.
    pub refuse_submit: bool,
}

impl ScriptedRun {
    pub fn with_results(results: ResultsReport) -> Self {
        Self {
            results: Some(results),
            ..Default::default()
        }
    }

    pub fn progress(mut self, max_force: &[f64], max_lattice_force: &[f64]) -> Self {
        self.progress = ProgressLog {
            flags: ConvergenceFlags::default(),
            max_force: max_force.to_vec(),
            max_lattice_force: max_lattice_force.to_vec(),
        };
        self
    }

    pub fn refused() -> Self {
        Self {
            refuse_submit: true,
            ..Default::default()
        }
    }

    pub fn geometry(mut self, structure: Structure) -> Self {
        self.geometry = Some(structure);
        self
    }
}

/// Options and structure seen by the engine at one submit.
#[derive(Debug, Clone)]
pub struct Submission {
    pub structure: Structure,
    pub driver: OptionMap,
    pub hamiltonian: OptionMap,
    pub options: OptionMap,
}

impl Submission {
    pub fn driver_flag(&self, key: &str) -> Option<bool> {
        match self.driver.get(key) {
            Some(OptionValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn driver_int(&self, key: &str) -> Option<i64> {
        match self.driver.get(key) {
            Some(OptionValue::Int(v)) => Some(*v),
            _ => None,
        }
    }
}

/// Engine double that plays back a list of runs and writes their artifacts
/// as JSON, so `JsonArtifactReader` can read them.
pub struct ScriptedEngine {
    script: VecDeque<ScriptedRun>,
    artifacts: ArtifactLayout,
    workspace: Option<PathBuf>,
    structure: Option<Structure>,
    driver: OptionMap,
    hamiltonian: OptionMap,
    options: OptionMap,
    current: Option<ScriptedRun>,
    pub submissions: Vec<Submission>,
    pub archived: Vec<usize>,
    pub waits: usize,
}

impl ScriptedEngine {
    pub fn new(runs: Vec<ScriptedRun>) -> Self {
        Self {
            script: runs.into(),
            artifacts: ArtifactLayout::default(),
            workspace: None,
            structure: None,
            driver: OptionMap::new(),
            hamiltonian: OptionMap::new(),
            options: OptionMap::new(),
            current: None,
            submissions: Vec::new(),
            archived: Vec::new(),
            waits: 0,
        }
    }

    fn write_artifacts(&self, run: &ScriptedRun) -> Result<()> {
        let ws = self.workspace.as_ref().ok_or_else(|| anyhow!("not configured"))?;
        if let Some(results) = &run.results {
            fs::write(
                self.artifacts.results_path(ws),
                serde_json::to_string(results)?,
            )?;
        }
        fs::write(
            self.artifacts.progress_log_path(ws),
            serde_json::to_string(&run.progress)?,
        )?;
        if let Some(geometry) = &run.geometry {
            fs::write(
                self.artifacts.final_geometry_path(ws),
                serde_json::to_string(geometry)?,
            )?;
        }
        Ok(())
    }
}

impl EngineAdapter for ScriptedEngine {
    fn name(&self) -> &str {
        "Scripted Engine"
    }

    fn configure(&mut self, workspace: &Path, structure: &Structure, _kpoints: &KPoints) -> Result<()> {
        fs::create_dir_all(workspace)?;
        self.workspace = Some(workspace.to_path_buf());
        self.structure = Some(structure.clone());
        Ok(())
    }

    fn set_driver_options(&mut self, options: OptionMap) -> Result<()> {
        self.driver = options;
        Ok(())
    }

    fn set_hamiltonian_options(&mut self, options: OptionMap) -> Result<()> {
        self.hamiltonian = options;
        Ok(())
    }

    fn set_run_options(&mut self, options: OptionMap) -> Result<()> {
        self.options = options;
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        let structure = self.structure.clone().ok_or_else(|| anyhow!("not configured"))?;
        self.submissions.push(Submission {
            structure,
            driver: self.driver.clone(),
            hamiltonian: self.hamiltonian.clone(),
            options: self.options.clone(),
        });
        // An exhausted script behaves like an engine that crashed early.
        let run = self.script.pop_front().unwrap_or(ScriptedRun {
            exit_code: 1,
            ..Default::default()
        });
        if run.refuse_submit {
            return Err(anyhow!("engine refused submission {}", self.submissions.len()));
        }
        self.write_artifacts(&run)?;
        self.current = Some(run);
        Ok(())
    }

    fn poll(&mut self) -> Result<RunStatus> {
        match self.current.as_mut() {
            None => Ok(RunStatus::NotStarted),
            Some(run) if run.not_started_polls > 0 => {
                run.not_started_polls -= 1;
                Ok(RunStatus::NotStarted)
            }
            Some(run) if run.running_polls > 0 => {
                run.running_polls -= 1;
                Ok(RunStatus::Running)
            }
            Some(run) => Ok(RunStatus::Exited(Some(run.exit_code))),
        }
    }

    fn wait(&mut self) -> Result<RunStatus> {
        self.waits += 1;
        match self.current.as_mut() {
            None => Ok(RunStatus::NotStarted),
            Some(run) => {
                run.not_started_polls = 0;
                run.running_polls = 0;
                Ok(RunStatus::Exited(Some(run.exit_code)))
            }
        }
    }

    fn archive(&mut self, iteration: usize) -> Result<()> {
        let ws = self.workspace.clone().ok_or_else(|| anyhow!("not configured"))?;
        for name in self.artifacts.all() {
            let from = ws.join(name);
            if from.exists() {
                fs::rename(&from, ws.join(archived_name(name, iteration)))?;
            }
        }
        self.archived.push(iteration);
        Ok(())
    }
}

pub fn fast_settings() -> RelaxSettings {
    RelaxSettings {
        poll_interval_secs: 0.0,
        ..Default::default()
    }
}

pub fn silicon() -> Structure {
    Structure::new(
        vec![
            Atom::new("Si", Point3::new(0.0, 0.0, 0.0)),
            Atom::new("Si", Point3::new(1.36, 1.36, 1.36)),
        ],
        Lattice::orthorhombic(5.43, 5.43, 5.43),
    )
}

/// Forces whose largest component is `max`.
pub fn forces(max: f64) -> Vec<Vector3<f64>> {
    vec![Vector3::new(max, 0.0, 0.0), Vector3::new(0.0, -max / 2.0, 0.0)]
}

/// Diagonal stress whose largest component is `max`.
pub fn stress(max: f64) -> Matrix3<f64> {
    Matrix3::from_diagonal(&Vector3::new(max, max / 2.0, -max / 4.0))
}

pub fn complete(force_max: f64, stress_max: f64, energy: f64) -> ResultsReport {
    ResultsReport {
        forces: Some(forces(force_max)),
        stress: Some(stress(stress_max)),
        total_energy: Some(energy),
    }
}

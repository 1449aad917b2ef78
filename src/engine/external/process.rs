use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::domain::Structure;
use crate::core::kpoints::KPoints;
use crate::engine::adapter::{EngineAdapter, RunStatus};
use crate::engine::config::OptionMap;
use crate::engine::readers::ArtifactLayout;

/// Everything an engine needs to write its input files for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInput {
    pub structure: Structure,
    pub kpoints: KPoints,
    pub driver: OptionMap,
    pub hamiltonian: OptionMap,
    pub options: OptionMap,
}

/// Engine-specific input templating.
pub trait InputWriter: Send + Sync {
    fn write_inputs(&self, workspace: &Path, input: &EngineInput) -> Result<()>;

    fn name(&self) -> &str;
}

/// Runs an engine executable as a child process inside the workspace.
///
/// Stdout and stderr of the child both land in the progress-log artifact,
/// which is where engines like DFTB+ report their optimizer history.
pub struct ProcessEngine {
    executable: String,
    args: Vec<String>,
    writer: Box<dyn InputWriter>,
    artifacts: ArtifactLayout,
    workspace: Option<PathBuf>,
    input: Option<EngineInput>,
    child: Option<Child>,
}

impl ProcessEngine {
    /// Creates a new engine wrapper.
    ///
    /// # Arguments
    /// * `executable` - Path to the engine binary (e.g., "dftb+").
    /// * `args` - Extra command-line arguments.
    /// * `writer` - Produces the engine's input files before every submit.
    /// * `artifacts` - Names of the output files to archive between runs.
    pub fn new(
        executable: &str,
        args: &[&str],
        writer: Box<dyn InputWriter>,
        artifacts: ArtifactLayout,
    ) -> Self {
        Self {
            executable: executable.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            writer,
            artifacts,
            workspace: None,
            input: None,
            child: None,
        }
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    /// The input handed to the writer on the last `submit`, or pending for the next one.
    pub fn pending_input(&self) -> Option<&EngineInput> {
        self.input.as_ref()
    }

    fn input_mut(&mut self) -> Result<&mut EngineInput> {
        self.input
            .as_mut()
            .ok_or_else(|| anyhow!("{} has not been configured", self.executable))
    }

    fn is_running(&mut self) -> Result<bool> {
        match self.child.as_mut() {
            Some(child) => Ok(child
                .try_wait()
                .context("Failed to query engine process")?
                .is_none()),
            None => Ok(false),
        }
    }
}

/// `detailed.out` archived under iteration 3 becomes `detailed_003.out`.
pub fn archived_name(name: &str, iteration: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{:03}.{}", stem, iteration, ext),
        _ => format!("{}_{:03}", name, iteration),
    }
}

impl EngineAdapter for ProcessEngine {
    fn name(&self) -> &str {
        &self.executable
    }

    fn configure(&mut self, workspace: &Path, structure: &Structure, kpoints: &KPoints) -> Result<()> {
        fs::create_dir_all(workspace)
            .with_context(|| format!("Failed to create workspace {}", workspace.display()))?;
        self.workspace = Some(workspace.to_path_buf());

        // Options survive a reconfiguration; only the geometry is replaced.
        match self.input.as_mut() {
            Some(input) => {
                input.structure = structure.clone();
                input.kpoints = kpoints.clone();
            }
            None => {
                self.input = Some(EngineInput {
                    structure: structure.clone(),
                    kpoints: kpoints.clone(),
                    driver: OptionMap::new(),
                    hamiltonian: OptionMap::new(),
                    options: OptionMap::new(),
                });
            }
        }
        Ok(())
    }

    fn set_driver_options(&mut self, options: OptionMap) -> Result<()> {
        self.input_mut()?.driver = options;
        Ok(())
    }

    fn set_hamiltonian_options(&mut self, options: OptionMap) -> Result<()> {
        self.input_mut()?.hamiltonian = options;
        Ok(())
    }

    fn set_run_options(&mut self, options: OptionMap) -> Result<()> {
        self.input_mut()?.options = options;
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        if self.is_running()? {
            bail!("{} is still running; refusing to start another run", self.executable);
        }
        let workspace = self
            .workspace
            .clone()
            .ok_or_else(|| anyhow!("{} has not been configured", self.executable))?;
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| anyhow!("{} has not been configured", self.executable))?;

        self.writer
            .write_inputs(&workspace, input)
            .with_context(|| format!("{} failed to write inputs", self.writer.name()))?;

        let log_path = self.artifacts.progress_log_path(&workspace);
        let stdout = File::create(&log_path)
            .with_context(|| format!("Failed to create {}", log_path.display()))?;
        let stderr = stdout
            .try_clone()
            .context("Failed to share the progress log with stderr")?;

        let child = Command::new(&self.executable)
            .args(&self.args)
            .current_dir(&workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .with_context(|| format!("Failed to spawn engine executable '{}'", self.executable))?;

        self.child = Some(child);
        Ok(())
    }

    fn poll(&mut self) -> Result<RunStatus> {
        match self.child.as_mut() {
            None => Ok(RunStatus::NotStarted),
            Some(child) => match child.try_wait().context("Failed to query engine process")? {
                Some(status) => Ok(RunStatus::Exited(status.code())),
                None => Ok(RunStatus::Running),
            },
        }
    }

    fn wait(&mut self) -> Result<RunStatus> {
        match self.child.as_mut() {
            None => Ok(RunStatus::NotStarted),
            Some(child) => {
                let status = child.wait().context("Failed to wait for engine process")?;
                Ok(RunStatus::Exited(status.code()))
            }
        }
    }

    fn archive(&mut self, iteration: usize) -> Result<()> {
        let workspace = self
            .workspace
            .clone()
            .ok_or_else(|| anyhow!("{} has not been configured", self.executable))?;

        for name in self.artifacts.all() {
            let from = workspace.join(name);
            if !from.exists() {
                continue;
            }
            let to = workspace.join(archived_name(name, iteration));
            fs::rename(&from, &to).with_context(|| {
                format!("Failed to archive {} as {}", from.display(), to.display())
            })?;
        }
        Ok(())
    }
}

use std::path::Path;

use anyhow::Result;

use crate::core::domain::Structure;
use crate::core::kpoints::KPoints;
use crate::engine::config::{EngineConfig, OptionMap};

/// Liveness of the engine process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing has been submitted yet.
    NotStarted,
    Running,
    /// The process has exited. `None` when it was killed by a signal.
    Exited(Option<i32>),
}

/// A generic interface for external engines driven by the controller.
///
/// Implementations own one workspace and at most one live process. The
/// controller calls `configure`/`set_*` only between runs.
pub trait EngineAdapter: Send {
    /// Returns the name of the engine (e.g., "DFTB+ 21.2").
    fn name(&self) -> &str;

    /// Sets workspace, structure and k-points for the next run. No run is
    /// started; calling it twice with the same values is harmless.
    fn configure(&mut self, workspace: &Path, structure: &Structure, kpoints: &KPoints)
        -> Result<()>;

    fn set_driver_options(&mut self, options: OptionMap) -> Result<()>;

    fn set_hamiltonian_options(&mut self, options: OptionMap) -> Result<()>;

    /// Top-level options such as results reporting.
    fn set_run_options(&mut self, options: OptionMap) -> Result<()>;

    /// Hands a complete run configuration over in one call.
    fn apply_config(&mut self, config: &EngineConfig) -> Result<()> {
        self.set_driver_options(config.driver_options())?;
        self.set_hamiltonian_options(config.hamiltonian_options())?;
        self.set_run_options(config.run_options())
    }

    /// Starts the engine asynchronously and returns immediately.
    fn submit(&mut self) -> Result<()>;

    /// Non-blocking status query.
    fn poll(&mut self) -> Result<RunStatus>;

    /// Blocks until the current run exits.
    fn wait(&mut self) -> Result<RunStatus>;

    /// Moves the previous run's output artifacts aside under
    /// `iteration` so the next run does not overwrite them.
    fn archive(&mut self, iteration: usize) -> Result<()>;
}

use std::path::PathBuf;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::engine::config::EngineConfig;
use crate::relax::job::Phase;
use crate::relax::policy::RelaxMode;
use crate::relax::scoring::{QualityScore, ScoreNote};

/// Events emitted by the controller while it works on a job.
#[derive(Debug, Clone, PartialEq)]
pub enum RelaxEvent {
    PhaseChanged { from: Phase, to: Phase },

    /// A run was handed to the engine.
    Submitted { iteration: usize, config: EngineConfig },

    /// Polled before any process existed. Carries the job's label.
    Waiting { label: String },

    /// Live read of the progress log while the engine is still running.
    Progress {
        steps: usize,
        max_force: Option<f64>,
        max_lattice_force: Option<f64>,
    },

    Exited { code: Option<i32> },

    MissingArtifact { path: PathBuf },

    Evaluated {
        iteration: usize,
        max_force: Option<f64>,
        max_stress: Option<f64>,
        good_forces: bool,
        good_stress: bool,
        score: QualityScore,
    },

    Note(ScoreNote),

    /// Next relaxation mode. `None` keeps the previous configuration.
    Decision { mode: Option<RelaxMode> },

    /// The static run came back incomplete.
    FallbackTriggered,

    /// Something failed on a best-effort path and was absorbed.
    Degraded { reason: String },

    Finished {
        score: QualityScore,
        iterations: usize,
        fell_back: bool,
    },
}

/// An event tagged with the job it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent {
    pub job: Uuid,
    pub event: RelaxEvent,
}

/// Receives the controller's events.
/// Implementations must be Thread-Safe (Sync) so batches can share one.
pub trait RelaxObserver: Send + Sync {
    fn on_event(&self, job: Uuid, event: &RelaxEvent);
}

/// Forwards events to the `log` facade under the `cellrelax` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl RelaxObserver for LogObserver {
    fn on_event(&self, job: Uuid, event: &RelaxEvent) {
        const T: &str = "cellrelax";
        match event {
            RelaxEvent::PhaseChanged { from, to } => {
                log::debug!(target: T, "[{}] {} -> {}", job, from, to)
            }
            RelaxEvent::Submitted { iteration, config } => {
                log::info!(
                    target: T,
                    "[{}] submitted run {} ({})",
                    job,
                    iteration,
                    if config.is_static() { "static" } else { "relaxation" }
                )
            }
            RelaxEvent::Waiting { label } => log::debug!(target: T, "[{}] ID: {}", job, label),
            RelaxEvent::Progress {
                steps,
                max_force,
                max_lattice_force,
            } => log::trace!(
                target: T,
                "[{}] step {}: max force {:?}, max lattice force {:?}",
                job,
                steps,
                max_force,
                max_lattice_force
            ),
            RelaxEvent::Exited { code } => {
                log::info!(target: T, "[{}] execution completed, return code {:?}", job, code)
            }
            RelaxEvent::MissingArtifact { path } => {
                log::error!(target: T, "[{}] could not find {}", job, path.display())
            }
            RelaxEvent::Evaluated {
                iteration,
                max_force,
                max_stress,
                good_forces,
                good_stress,
                score,
            } => log::debug!(
                target: T,
                "[{}] run {}: forces {:?} (good: {}), stress {:?} (good: {}), score {}",
                job,
                iteration,
                max_force,
                good_forces,
                max_stress,
                good_stress,
                score
            ),
            RelaxEvent::Note(note) => log::debug!(target: T, "[{}] {}", job, note),
            RelaxEvent::Decision { mode: Some(mode) } => {
                log::debug!(target: T, "[{}] Convergence: {}", job, mode.label())
            }
            RelaxEvent::Decision { mode: None } => {
                log::debug!(target: T, "[{}] no branch matched, keeping configuration", job)
            }
            RelaxEvent::FallbackTriggered => log::warn!(
                target: T,
                "[{}] static run incomplete, running a short relaxation instead",
                job
            ),
            RelaxEvent::Degraded { reason } => log::warn!(target: T, "[{}] {}", job, reason),
            RelaxEvent::Finished {
                score,
                iterations,
                fell_back,
            } => log::info!(
                target: T,
                "[{}] finished after {} iterations, score {}, fallback: {}",
                job,
                iterations,
                score,
                fell_back
            ),
        }
    }
}

/// Streams events to another thread (e.g. a UI or a batch supervisor).
impl RelaxObserver for Sender<JobEvent> {
    fn on_event(&self, job: Uuid, event: &RelaxEvent) {
        // A dropped receiver only means nobody is listening anymore.
        let _ = self.send(JobEvent {
            job,
            event: event.clone(),
        });
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryObserver {
    events: Mutex<Vec<JobEvent>>,
}

impl MemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RelaxEvent> {
        self.events.lock().iter().map(|e| e.event.clone()).collect()
    }

    pub fn tagged(&self) -> Vec<JobEvent> {
        self.events.lock().clone()
    }

    /// Phases entered, in order.
    pub fn phases(&self) -> Vec<Phase> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e.event {
                RelaxEvent::PhaseChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }
}

impl RelaxObserver for MemoryObserver {
    fn on_event(&self, job: Uuid, event: &RelaxEvent) {
        self.events.lock().push(JobEvent {
            job,
            event: event.clone(),
        });
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RelaxObserver for NullObserver {
    fn on_event(&self, _job: Uuid, _event: &RelaxEvent) {}
}

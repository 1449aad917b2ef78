use std::sync::Arc;
use std::thread;

use anyhow::Context;

use crate::config::RelaxSettings;
use crate::core::domain::Structure;
use crate::core::symmetry::Symmetrizer;
use crate::engine::adapter::{EngineAdapter, RunStatus};
use crate::engine::config::EngineConfig;
use crate::engine::readers::{IterationResult, OutputReader, ResultsReport};
use crate::error::{RelaxError, Result};
use crate::relax::events::{LogObserver, RelaxEvent, RelaxObserver};
use crate::relax::job::{Phase, RelaxationJob};
use crate::relax::policy;
use crate::relax::report::{IterationRecord, RelaxReport};
use crate::relax::scoring::{self, QualityScore};

/// What a finished relaxation hands back.
#[derive(Debug, Clone)]
pub struct RelaxOutcome {
    pub structure: Structure,
    pub score: QualityScore,
    /// Accepted relaxation runs before finalization.
    pub iterations: usize,
    /// Results of the last run (static, or fallback when `fell_back`).
    pub final_results: ResultsReport,
    pub fell_back: bool,
    pub report: RelaxReport,
}

/// Drives one engine through relax / evaluate / reconfigure cycles until the
/// score says the structure is converged, then confirms it with a static run.
///
/// The loop is strictly sequential: one run in flight at a time, and the
/// engine is only reconfigured after its process has exited.
pub struct RelaxationController<A: EngineAdapter, R: OutputReader> {
    adapter: A,
    reader: R,
    settings: RelaxSettings,
    symmetrizer: Symmetrizer,
    observer: Arc<dyn RelaxObserver>,
}

impl<A: EngineAdapter, R: OutputReader> RelaxationController<A, R> {
    /// Creates a controller with no symmetry backend that logs through `log`.
    pub fn new(adapter: A, reader: R, settings: RelaxSettings) -> Self {
        Self {
            adapter,
            reader,
            settings,
            symmetrizer: Symmetrizer::Identity,
            observer: Arc::new(LogObserver),
        }
    }

    pub fn with_symmetrizer(mut self, symmetrizer: Symmetrizer) -> Self {
        self.symmetrizer = symmetrizer;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RelaxObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn settings(&self) -> &RelaxSettings {
        &self.settings
    }

    /// Runs the job to completion.
    ///
    /// # Errors
    /// `MissingArtifact` when a relaxation run exits without writing the
    /// results file; the job keeps the structure it had before that run.
    /// Adapter failures (spawn, I/O) during relaxation surface as `Engine`.
    /// Once the loop has finished, a static run that fails to start or to
    /// report its exit is degraded to the fallback instead.
    pub fn run(&mut self, job: &mut RelaxationJob) -> Result<RelaxOutcome> {
        self.settings.validate()?;
        let mut report = RelaxReport::new(job.id());

        let target = job.target_forces();
        let force_target = self.settings.force_target_factor * target;
        let mut config = EngineConfig::relaxation(
            force_target,
            self.settings.relax_max_steps,
            self.settings.max_scc_iterations,
        );

        self.enter(job, Phase::Configuring);
        self.launch(job, &config)?;

        loop {
            let status = self.await_exit(job)?;

            let results_path = self.settings.artifacts.results_path(job.workspace());
            if !results_path.exists() {
                self.emit(job, RelaxEvent::MissingArtifact {
                    path: results_path.clone(),
                });
                return Err(RelaxError::MissingArtifact { path: results_path });
            }

            self.enter(job, Phase::Evaluating);
            let result = self.collect(job);
            let verdict = policy::evaluate(
                &result.report,
                target,
                self.settings.good_threshold_factor,
            );

            // Score before deciding: a converged run finalizes right away.
            let assessment = scoring::assess(job.score, &result.progress, target);
            job.score = assessment.score;
            for note in assessment.notes {
                self.emit(job, RelaxEvent::Note(note));
            }
            self.emit(job, RelaxEvent::Evaluated {
                iteration: job.iteration,
                max_force: result.report.max_force(),
                max_stress: result.report.max_stress(),
                good_forces: verdict.good_forces,
                good_stress: verdict.good_stress,
                score: job.score,
            });
            report.push(IterationRecord::new(
                job.iteration,
                Phase::Running,
                exit_code(status),
                &result.report,
                job.score,
            ));

            if job.score.value() >= self.settings.finalize_score {
                break;
            }

            let mode = policy::decide(verdict.good_forces, verdict.good_stress);
            self.emit(job, RelaxEvent::Decision { mode });
            if let Some(record) = report.last_mut() {
                record.mode = mode;
            }
            config = policy::next_config(&config, &verdict, mode);

            self.adopt_final_geometry(job);
            self.adapter
                .archive(job.iteration)
                .context("Failed to archive run outputs")?;
            job.iteration += 1;
            self.launch(job, &config)?;
        }

        let final_results = self.finalize(job, &mut report)?;
        let (final_results, fell_back) = if final_results.is_complete() {
            (final_results, false)
        } else {
            self.emit(job, RelaxEvent::FallbackTriggered);
            let results = self.fallback(job);
            report.push(IterationRecord::new(
                job.iteration,
                Phase::FallbackStatic,
                None,
                &results,
                job.score,
            ));
            (results, true)
        };

        self.enter(job, Phase::Done);
        self.emit(job, RelaxEvent::Finished {
            score: job.score,
            iterations: job.iteration,
            fell_back,
        });

        Ok(RelaxOutcome {
            structure: job.structure().clone(),
            score: job.score,
            iterations: job.iteration,
            final_results,
            fell_back,
            report,
        })
    }

    /// Static single-point run on the best geometry known so far.
    fn finalize(&mut self, job: &mut RelaxationJob, report: &mut RelaxReport) -> Result<ResultsReport> {
        self.enter(job, Phase::Finalizing);
        self.adopt_final_geometry(job);
        self.adapter
            .archive(job.iteration)
            .context("Failed to archive run outputs")?;

        // A static run that cannot be started or watched leaves no results,
        // which sends the job to the fallback like any incomplete run.
        let config = EngineConfig::static_run(self.settings.max_scc_iterations);
        let launched = self.launch(job, &config);
        let status = match launched.and_then(|()| self.await_exit(job)) {
            Ok(status) => Some(status),
            Err(e) => {
                self.emit(job, RelaxEvent::Degraded {
                    reason: format!("static run failed: {}", e),
                });
                None
            }
        };

        // A missing file reads as an empty report and sends us to the fallback.
        let results = self
            .reader
            .read_results(&self.settings.artifacts.results_path(job.workspace()));
        report.push(IterationRecord::new(
            job.iteration,
            Phase::Finalizing,
            status.and_then(exit_code),
            &results,
            job.score,
        ));
        Ok(results)
    }

    /// Short best-effort relaxation after an incomplete static run.
    ///
    /// Never fails: engine errors are reported as `Degraded` events and the
    /// job still ends in `Done`. Returns whatever results the run left behind.
    pub fn fallback(&mut self, job: &mut RelaxationJob) -> ResultsReport {
        self.enter(job, Phase::FallbackStatic);
        let config = EngineConfig::fallback(
            self.settings.force_target_factor * job.target_forces(),
            self.settings.fallback_max_steps,
            self.settings.max_scc_iterations,
        );

        match self.launch(job, &config) {
            Ok(()) => self.spin_until_exit(job),
            Err(e) => self.emit(job, RelaxEvent::Degraded {
                reason: format!("fallback run could not be started: {}", e),
            }),
        }

        let geometry_path = self.settings.artifacts.final_geometry_path(job.workspace());
        if let Some(structure) = self.reader.read_final_geometry(&geometry_path) {
            job.adopt(structure);
        }
        let results = self
            .reader
            .read_results(&self.settings.artifacts.results_path(job.workspace()));
        self.enter(job, Phase::Done);
        results
    }

    fn launch(&mut self, job: &mut RelaxationJob, config: &EngineConfig) -> Result<()> {
        self.adapter
            .configure(job.workspace(), job.structure(), &self.settings.kpoints)
            .context("Failed to configure engine")?;
        self.adapter
            .apply_config(config)
            .context("Failed to apply engine configuration")?;
        self.adapter.submit().context("Failed to submit engine run")?;
        self.emit(job, RelaxEvent::Submitted {
            iteration: job.iteration,
            config: config.clone(),
        });
        if job.phase == Phase::Configuring || job.phase == Phase::Evaluating {
            self.enter(job, Phase::Running);
        }
        Ok(())
    }

    /// Blocks or polls until the engine process has exited.
    fn await_exit(&mut self, job: &mut RelaxationJob) -> Result<RunStatus> {
        if job.is_blocking() {
            self.adapter.wait().context("Failed to wait for engine")?;
        }
        if job.phase == Phase::Running {
            self.enter(job, Phase::Polling);
        }
        loop {
            match self.adapter.poll().context("Failed to poll engine")? {
                RunStatus::Exited(code) => {
                    self.emit(job, RelaxEvent::Exited { code });
                    return Ok(RunStatus::Exited(code));
                }
                RunStatus::Running => {
                    // Observability only; the job is not touched here.
                    let progress = self
                        .reader
                        .read_progress_log(&self.settings.artifacts.progress_log_path(job.workspace()));
                    self.emit(job, RelaxEvent::Progress {
                        steps: progress.steps(),
                        max_force: progress.last_max_force(),
                        max_lattice_force: progress.last_max_lattice_force(),
                    });
                }
                RunStatus::NotStarted => {
                    self.emit(job, RelaxEvent::Waiting { label: job.label() });
                }
            }
            self.pause();
        }
    }

    /// Fallback polling: no artifact checks, errors end the wait.
    fn spin_until_exit(&mut self, job: &RelaxationJob) {
        if job.is_blocking() {
            if let Err(e) = self.adapter.wait() {
                self.emit(job, RelaxEvent::Degraded {
                    reason: format!("waiting for fallback run failed: {}", e),
                });
                return;
            }
        }
        loop {
            match self.adapter.poll() {
                Ok(RunStatus::Exited(code)) => {
                    self.emit(job, RelaxEvent::Exited { code });
                    return;
                }
                Ok(RunStatus::Running) => {}
                Ok(RunStatus::NotStarted) => {
                    self.emit(job, RelaxEvent::Degraded {
                        reason: "fallback run never started".to_string(),
                    });
                    return;
                }
                Err(e) => {
                    self.emit(job, RelaxEvent::Degraded {
                        reason: format!("polling fallback run failed: {}", e),
                    });
                    return;
                }
            }
            self.pause();
        }
    }

    fn collect(&self, job: &RelaxationJob) -> IterationResult {
        let artifacts = &self.settings.artifacts;
        IterationResult {
            report: self.reader.read_results(&artifacts.results_path(job.workspace())),
            progress: self
                .reader
                .read_progress_log(&artifacts.progress_log_path(job.workspace())),
        }
    }

    /// Takes the engine's last geometry (or keeps the current structure when
    /// the run wrote none), symmetrizes it and makes it the job's structure.
    fn adopt_final_geometry(&self, job: &mut RelaxationJob) {
        let path = self.settings.artifacts.final_geometry_path(job.workspace());
        let geometry = self
            .reader
            .read_final_geometry(&path)
            .unwrap_or_else(|| job.structure().clone());
        job.adopt(self.symmetrizer.apply(&geometry));
    }

    fn pause(&self) {
        let interval = self.settings.poll_interval();
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    fn enter(&self, job: &mut RelaxationJob, phase: Phase) {
        let from = job.phase;
        job.phase = phase;
        if from != phase {
            self.emit(job, RelaxEvent::PhaseChanged { from, to: phase });
        }
    }

    fn emit(&self, job: &RelaxationJob, event: RelaxEvent) {
        self.observer.on_event(job.id(), &event);
    }
}

fn exit_code(status: RunStatus) -> Option<i32> {
    match status {
        RunStatus::Exited(code) => code,
        _ => None,
    }
}

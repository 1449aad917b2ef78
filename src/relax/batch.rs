use rayon::prelude::*;

use crate::engine::adapter::EngineAdapter;
use crate::engine::readers::OutputReader;
use crate::error::{RelaxError, Result};
use crate::relax::controller::{RelaxOutcome, RelaxationController};
use crate::relax::job::RelaxationJob;

/// A job together with the controller (and so the engine) it owns.
pub struct BatchEntry<A: EngineAdapter, R: OutputReader> {
    pub controller: RelaxationController<A, R>,
    pub job: RelaxationJob,
}

impl<A: EngineAdapter, R: OutputReader> BatchEntry<A, R> {
    pub fn new(controller: RelaxationController<A, R>, job: RelaxationJob) -> Self {
        Self { controller, job }
    }
}

/// Relaxes independent jobs in parallel on the global rayon pool.
///
/// Jobs share no mutable state; each returns its own result, in input order.
pub fn relax_all<A, R>(entries: Vec<BatchEntry<A, R>>) -> Vec<(RelaxationJob, Result<RelaxOutcome>)>
where
    A: EngineAdapter,
    R: OutputReader,
{
    entries
        .into_par_iter()
        .map(|entry| {
            let BatchEntry {
                mut controller,
                mut job,
            } = entry;
            let outcome = controller.run(&mut job);
            (job, outcome)
        })
        .collect()
}

/// Same as [`relax_all`] on a dedicated pool of `threads` workers, to cap the
/// number of engine processes alive at once.
pub fn relax_all_with_threads<A, R>(
    entries: Vec<BatchEntry<A, R>>,
    threads: usize,
) -> Result<Vec<(RelaxationJob, Result<RelaxOutcome>)>>
where
    A: EngineAdapter,
    R: OutputReader,
{
    if threads == 0 {
        return Err(RelaxError::InvalidSettings(
            "a batch needs at least one worker thread".to_string(),
        ));
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("relax-worker-{}", i))
        .build()
        .map_err(|e| RelaxError::InvalidSettings(e.to_string()))?;
    Ok(pool.install(|| relax_all(entries)))
}

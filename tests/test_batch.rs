use std::collections::HashSet;
use std::sync::Arc;

use crossbeam_channel::unbounded;

use cellrelax::core::symmetry::Symmetrizer;
use cellrelax::engine::external::json::JsonArtifactReader;
use cellrelax::relax::batch::{relax_all, relax_all_with_threads, BatchEntry};
use cellrelax::relax::events::{JobEvent, RelaxEvent, RelaxObserver};
use cellrelax::{RelaxError, RelaxationController, RelaxationJob};

use crate::common::{complete, fast_settings, silicon, ScriptedEngine, ScriptedRun};

mod common;

fn converged() -> ScriptedRun {
    ScriptedRun::with_results(complete(5e-4, 5e-4, -12.5)).progress(&[1e-2, 5e-4], &[5e-4])
}

fn entry(
    root: &std::path::Path,
    name: &str,
    runs: Vec<ScriptedRun>,
    observer: Arc<dyn RelaxObserver>,
) -> BatchEntry<ScriptedEngine, JsonArtifactReader> {
    let job = RelaxationJob::new(root.join(name), &silicon(), 1e-3, &Symmetrizer::Identity).unwrap();
    let controller = RelaxationController::new(ScriptedEngine::new(runs), JsonArtifactReader, fast_settings())
        .with_observer(observer);
    BatchEntry::new(controller, job)
}

#[test]
fn independent_jobs_finish_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, rx) = unbounded::<JobEvent>();
    let observer: Arc<dyn RelaxObserver> = Arc::new(tx);

    let entries = vec![
        entry(dir.path(), "a", vec![converged(), ScriptedRun::with_results(complete(1e-4, 1e-4, -1.0))], observer.clone()),
        entry(dir.path(), "b", vec![ScriptedRun::default()], observer.clone()),
        entry(dir.path(), "c", vec![converged(), ScriptedRun::with_results(complete(1e-4, 1e-4, -3.0))], observer.clone()),
    ];
    drop(observer);

    let results = relax_all(entries);
    assert_eq!(results.len(), 3);

    let labels: Vec<String> = results.iter().map(|(job, _)| job.label()).collect();
    assert_eq!(labels, vec!["a", "b", "c"]);

    assert_eq!(results[0].1.as_ref().unwrap().final_results.total_energy, Some(-1.0));
    assert!(matches!(results[1].1, Err(RelaxError::MissingArtifact { .. })));
    assert_eq!(results[2].1.as_ref().unwrap().final_results.total_energy, Some(-3.0));

    // Events from every job arrive on the shared channel, tagged by job.
    let ids: HashSet<_> = results.iter().map(|(job, _)| job.id()).collect();
    let events: Vec<JobEvent> = rx.try_iter().collect();
    let seen: HashSet<_> = events.iter().map(|e| e.job).collect();
    assert_eq!(seen, ids);

    let finished = events
        .iter()
        .filter(|e| matches!(e.event, RelaxEvent::Finished { .. }))
        .count();
    assert_eq!(finished, 2);
}

#[test]
fn dedicated_pool_runs_the_same_batch() {
    let dir = tempfile::tempdir().unwrap();
    let observer: Arc<dyn RelaxObserver> = Arc::new(cellrelax::relax::events::NullObserver);
    let entries = (0..4)
        .map(|i| {
            entry(
                dir.path(),
                &format!("job{}", i),
                vec![converged(), ScriptedRun::with_results(complete(1e-4, 1e-4, -(i as f64)))],
                observer.clone(),
            )
        })
        .collect();

    let results = relax_all_with_threads(entries, 2).unwrap();
    for (i, (_, outcome)) in results.iter().enumerate() {
        let outcome = outcome.as_ref().unwrap();
        assert_eq!(outcome.final_results.total_energy, Some(-(i as f64)));
    }

    let none: Vec<BatchEntry<ScriptedEngine, JsonArtifactReader>> = Vec::new();
    assert!(matches!(
        relax_all_with_threads(none, 0),
        Err(RelaxError::InvalidSettings(_))
    ));
}

//! Asynchronous patch generation: runs the mesh builder on a worker pool and
//! hands finished meshes back through a channel drained once per frame.
//!
//! Workers only see the immutable [`PatchRequest`] and the shared height
//! field; each result is moved back by value, so no mesh state is shared
//! across threads while a patch is being built.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use glam::DVec3;

use crate::builder::{PatchRequest, build_patch_mesh};
use crate::error::GenerationError;
use crate::mesh::{PatchMesh, SkirtEdges};
use crate::seams::{HeightField, NodeKey};
use crate::settings::SchedulerSettings;

/// A patch to build for a specific node.
#[derive(Clone, Debug)]
pub struct GenerationTask {
    /// The node the mesh is for.
    pub key: NodeKey,
    /// Builder input.
    pub request: PatchRequest,
}

/// Outcome of one generation task.
#[derive(Debug)]
pub struct GenerationResult {
    /// The node the mesh was built for. It may no longer exist.
    pub key: NodeKey,
    /// Skirt set the mesh was built with.
    pub skirts: SkirtEdges,
    /// Floating origin the positions are relative to.
    pub origin: DVec3,
    /// Build time in microseconds.
    pub elapsed_us: u64,
    /// The mesh, or why it could not be built.
    pub outcome: Result<PatchMesh, GenerationError>,
}

/// Build one task, turning a panicking height field into an error.
fn run_task(task: &GenerationTask, height: &dyn HeightField) -> GenerationResult {
    let start = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| build_patch_mesh(&task.request, height)))
        .unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(GenerationError::Panicked(message))
        });
    GenerationResult {
        key: task.key,
        skirts: task.request.skirts,
        origin: task.request.origin,
        elapsed_us: start.elapsed().as_micros() as u64,
        outcome,
    }
}

/// Worker pool that builds patch meshes off the traversal thread.
///
/// The traversal thread submits tasks with [`submit`](Self::submit) and
/// collects results each frame with [`drain_results`](Self::drain_results);
/// it never blocks on a worker. With zero worker threads, tasks are built
/// inline inside `submit` and still delivered through the result channel, so
/// completions are observed at the same point of the frame either way.
pub struct GenerationScheduler {
    /// Channel sender for submitting tasks to workers.
    task_sender: Option<Sender<GenerationTask>>,
    /// Sender used by inline execution to queue its own results.
    inline_sender: Sender<GenerationResult>,
    /// Channel receiver for collecting completed results on the traversal thread.
    result_receiver: Receiver<GenerationResult>,
    /// Handles to the worker threads (for shutdown).
    worker_handles: Vec<JoinHandle<()>>,
    /// Build tasks inside `submit`. Cleared by shutdown.
    inline: bool,
    /// Height field, for inline execution.
    height: Arc<dyn HeightField>,
    /// Maximum number of tasks in flight.
    budget: usize,
    /// Current number of tasks queued or running (or, inline, not yet drained).
    in_flight: Arc<AtomicUsize>,
}

impl GenerationScheduler {
    /// Spawn the worker pool.
    pub fn new(settings: SchedulerSettings, height: Arc<dyn HeightField>) -> Self {
        let budget = settings.max_in_flight.max(1);
        let (task_tx, task_rx) = crossbeam_channel::bounded::<GenerationTask>(budget.min(4096));
        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::with_capacity(settings.worker_threads);
        for index in 0..settings.worker_threads {
            let rx = task_rx.clone();
            let tx = result_tx.clone();
            let field = Arc::clone(&height);

            let handle = std::thread::Builder::new()
                .name(format!("lod-gen-{index}"))
                .spawn(move || {
                    while let Ok(task) = rx.recv() {
                        let result = run_task(&task, field.as_ref());
                        // The receiver only disappears when the scheduler is dropped.
                        let _ = tx.send(result);
                    }
                })
                .expect("Failed to spawn patch generation worker thread");
            handles.push(handle);
        }

        Self {
            task_sender: (settings.worker_threads > 0).then_some(task_tx),
            inline_sender: result_tx,
            result_receiver: result_rx,
            worker_handles: handles,
            inline: settings.worker_threads == 0,
            height,
            budget,
            in_flight,
        }
    }

    /// Submit a task. Returns it back if the budget is exhausted or the
    /// scheduler has been shut down.
    #[allow(clippy::result_large_err)]
    pub fn submit(&self, task: GenerationTask) -> Result<(), GenerationTask> {
        if self.in_flight.load(Ordering::Relaxed) >= self.budget {
            return Err(task);
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        if self.inline {
            let result = run_task(&task, self.height.as_ref());
            // Our own receiver is alive as long as `self` is.
            let _ = self.inline_sender.send(result);
            return Ok(());
        }

        let Some(sender) = &self.task_sender else {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return Err(task);
        };
        sender.try_send(task).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            e.into_inner()
        })
    }

    /// Drain every finished result. Called once per frame on the traversal thread.
    pub fn drain_results(&self) -> Vec<GenerationResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_receiver.try_recv() {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            results.push(result);
        }
        results
    }

    /// Tasks submitted whose results have not been drained yet.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Number of worker threads (0 = inline).
    pub fn worker_count(&self) -> usize {
        self.worker_handles.len()
    }

    /// Shut down all worker threads.
    ///
    /// Drops the task sender so workers exit once the queue is empty, then
    /// joins them. Results already produced stay drainable. Every later
    /// `submit` is refused, inline schedulers included.
    pub fn shutdown(&mut self) {
        self.inline = false;
        self.task_sender.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for GenerationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basis::PatchBasis;
    use crate::seams::FlatHeightField;
    use std::time::Duration;

    fn task(id: u64, detail: u32) -> GenerationTask {
        GenerationTask {
            key: NodeKey {
                id,
                path_hash: id,
                depth: 1,
            },
            request: PatchRequest {
                basis: PatchBasis::FLAT,
                center_local: DVec3::new(id as f64 * 10.0, 0.0, 0.0),
                size: 10.0,
                detail,
                skirts: SkirtEdges::NONE,
                origin: DVec3::ZERO,
                with_collision: false,
            },
        }
    }

    fn wait_for(scheduler: &GenerationScheduler, count: usize) -> Vec<GenerationResult> {
        let mut received = Vec::new();
        let start = Instant::now();
        while received.len() < count {
            received.extend(scheduler.drain_results());
            assert!(start.elapsed().as_secs() < 10, "Timed out waiting for results");
            std::thread::sleep(Duration::from_millis(1));
        }
        received
    }

    #[test]
    fn test_submitted_task_produces_mesh() {
        let scheduler = GenerationScheduler::new(
            SchedulerSettings {
                worker_threads: 2,
                max_in_flight: 8,
            },
            Arc::new(FlatHeightField),
        );
        assert!(scheduler.submit(task(7, 4)).is_ok());

        let results = wait_for(&scheduler, 1);
        assert_eq!(results[0].key.id, 7);
        let mesh = results[0].outcome.as_ref().unwrap();
        assert_eq!(mesh.surface_triangle_count(), 32);
        assert_eq!(scheduler.in_flight_count(), 0);
    }

    #[test]
    fn test_concurrent_tasks_do_not_interfere() {
        let scheduler = GenerationScheduler::new(
            SchedulerSettings {
                worker_threads: 4,
                max_in_flight: 16,
            },
            Arc::new(FlatHeightField),
        );
        for id in 0..8 {
            assert!(scheduler.submit(task(id, 3)).is_ok());
        }

        let received = wait_for(&scheduler, 8);
        let mut ids: Vec<_> = received.iter().map(|r| r.key.id).collect();
        ids.sort();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());
        for result in &received {
            let mesh = result.outcome.as_ref().unwrap();
            let x0 = mesh.positions[0][0];
            assert!((x0 - (result.key.id as f32 * 10.0 - 5.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_inline_scheduler_delivers_on_drain() {
        let scheduler = GenerationScheduler::new(SchedulerSettings::inline(), Arc::new(FlatHeightField));
        assert_eq!(scheduler.worker_count(), 0);
        assert!(scheduler.submit(task(1, 2)).is_ok());
        assert_eq!(scheduler.in_flight_count(), 1);

        let results = scheduler.drain_results();
        assert_eq!(results.len(), 1);
        assert_eq!(scheduler.in_flight_count(), 0);
        assert!(scheduler.drain_results().is_empty());
    }

    #[test]
    fn test_result_reports_requested_skirts() {
        let scheduler = GenerationScheduler::new(SchedulerSettings::inline(), Arc::new(FlatHeightField));
        let mut skirted = task(5, 2);
        skirted.request.skirts = SkirtEdges::ALL;
        skirted.request.origin = DVec3::new(1.0, 0.0, 0.0);
        assert!(scheduler.submit(skirted).is_ok());

        let results = scheduler.drain_results();
        assert_eq!(results[0].skirts, SkirtEdges::ALL);
        assert_eq!(results[0].origin, DVec3::new(1.0, 0.0, 0.0));
        assert_eq!(results[0].outcome.as_ref().unwrap().skirts, SkirtEdges::ALL);
    }

    #[test]
    fn test_budget_limits_active_tasks() {
        let scheduler = GenerationScheduler::new(
            SchedulerSettings {
                worker_threads: 0,
                max_in_flight: 2,
            },
            Arc::new(FlatHeightField),
        );
        let accepted = (0..5).filter(|&i| scheduler.submit(task(i, 1)).is_ok()).count();
        assert_eq!(accepted, 2);

        // Draining frees the budget again.
        assert_eq!(scheduler.drain_results().len(), 2);
        assert!(scheduler.submit(task(9, 1)).is_ok());
    }

    #[test]
    fn test_panicking_height_field_becomes_error() {
        let field: Arc<dyn HeightField> = Arc::new(|p: DVec3| {
            if p.x > 3.0 {
                panic!("sampler exploded");
            }
            p
        });
        let scheduler = GenerationScheduler::new(
            SchedulerSettings {
                worker_threads: 1,
                max_in_flight: 4,
            },
            field,
        );
        assert!(scheduler.submit(task(0, 2)).is_ok());
        let results = wait_for(&scheduler, 1);
        match &results[0].outcome {
            Err(GenerationError::Panicked(msg)) => assert!(msg.contains("sampler exploded")),
            other => panic!("expected a panic error, got {other:?}"),
        }

        // The worker survives and keeps serving.
        let calm = task(0, 1);
        let mut calm = calm;
        calm.request.center_local = DVec3::new(-10.0, 0.0, 0.0);
        assert!(scheduler.submit(calm).is_ok());
        let results = wait_for(&scheduler, 1);
        assert!(results[0].outcome.is_ok());
    }

    #[test]
    fn test_workers_are_named_by_index() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let field: Arc<dyn HeightField> = Arc::new(move |p: DVec3| {
            let name = std::thread::current().name().map(str::to_string);
            record.lock().unwrap().push(name);
            p
        });
        let scheduler = GenerationScheduler::new(
            SchedulerSettings {
                worker_threads: 1,
                max_in_flight: 2,
            },
            field,
        );
        assert!(scheduler.submit(task(0, 1)).is_ok());
        wait_for(&scheduler, 1);
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|name| name.as_deref() == Some("lod-gen-0")));
    }

    #[test]
    fn test_shutdown_refuses_new_work() {
        let mut scheduler = GenerationScheduler::new(
            SchedulerSettings {
                worker_threads: 1,
                max_in_flight: 4,
            },
            Arc::new(FlatHeightField),
        );
        scheduler.shutdown();
        assert_eq!(scheduler.worker_count(), 0);
        assert!(scheduler.submit(task(0, 1)).is_err());
        assert_eq!(scheduler.in_flight_count(), 0);
        assert!(scheduler.drain_results().is_empty());
    }

    #[test]
    fn test_shutdown_keeps_finished_results_drainable() {
        let mut scheduler = GenerationScheduler::new(
            SchedulerSettings {
                worker_threads: 2,
                max_in_flight: 4,
            },
            Arc::new(FlatHeightField),
        );
        assert!(scheduler.submit(task(3, 2)).is_ok());
        // Joining waits for the queued task to finish.
        scheduler.shutdown();
        let results = scheduler.drain_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key.id, 3);
        assert!(scheduler.submit(task(4, 2)).is_err());
    }

    #[test]
    fn test_inline_scheduler_refuses_after_shutdown() {
        let mut scheduler =
            GenerationScheduler::new(SchedulerSettings::inline(), Arc::new(FlatHeightField));
        assert!(scheduler.submit(task(1, 1)).is_ok());
        scheduler.shutdown();
        assert!(scheduler.submit(task(2, 1)).is_err());
        assert_eq!(scheduler.drain_results().len(), 1);
        assert_eq!(scheduler.in_flight_count(), 0);
    }
}

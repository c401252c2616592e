//! Shared periodic-job scheduler.
//!
//! Modules that need background work at a fixed cadence submit a callback
//! here instead of each spawning a thread. One worker thread runs every due
//! job in turn; callbacks must return promptly, a slow job delays the jobs
//! behind it. Jobs are owned by the submitting instance and the orchestrator
//! cancels them in the disable sweep.

use crate::error::CoreError;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Upper bound on concurrently scheduled jobs.
pub const MAX_SCHEDULED_JOBS: usize = 32;

/// Handle to a scheduled job, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

type JobFn = Box<dyn FnMut() + Send>;

struct Job {
    name: String,
    owner: String,
    interval: Duration,
    next_due: Instant,
    // The callback is shared with the worker so the table lock is not held
    // while a job runs.
    run: Arc<Mutex<JobFn>>,
}

struct Shared {
    jobs: Mutex<HashMap<u64, Job>>,
    wake: Condvar,
    running: AtomicBool,
    next_id: AtomicU64,
}

/// Fixed-cadence job runner backed by one worker thread.
pub struct JobScheduler {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl JobScheduler {
    /// Create a scheduler and spawn its worker thread.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            jobs: Mutex::new(HashMap::new()),
            wake: Condvar::new(),
            running: AtomicBool::new(true),
            next_id: AtomicU64::new(0),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || Self::worker_loop(&worker_shared));
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Schedule `run` every `interval`, first firing one interval from now.
    ///
    /// `owner` is the submitting instance; the orchestrator uses it to
    /// cancel the instance's jobs when it is disabled.
    ///
    /// # Errors
    /// Returns [`CoreError::ConfigInvalid`] for a zero interval and
    /// [`CoreError::CapacityExceeded`] when the job table is full.
    pub fn schedule_periodic(
        &self,
        name: &str,
        owner: &str,
        interval: Duration,
        run: impl FnMut() + Send + 'static,
    ) -> Result<JobId, CoreError> {
        if interval.is_zero() {
            return Err(CoreError::ConfigInvalid(format!("job '{name}' has a zero interval")));
        }
        let mut jobs = self.shared.jobs.lock();
        if jobs.len() >= MAX_SCHEDULED_JOBS {
            return Err(CoreError::CapacityExceeded("scheduled jobs"));
        }
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        jobs.insert(
            id,
            Job {
                name: name.to_string(),
                owner: owner.to_string(),
                interval,
                next_due: Instant::now() + interval,
                run: Arc::new(Mutex::new(Box::new(run))),
            },
        );
        info!("job '{name}' scheduled every {interval:?} by '{owner}'");
        self.shared.wake.notify_one();
        Ok(JobId(id))
    }

    /// Cancel a job. Returns whether it was still scheduled. A callback
    /// already in flight finishes, but the job never fires again.
    pub fn cancel(&self, id: JobId) -> bool {
        let removed = self.shared.jobs.lock().remove(&id.0);
        if let Some(job) = &removed {
            info!("job '{}' cancelled", job.name);
            self.shared.wake.notify_one();
        }
        removed.is_some()
    }

    /// Cancel every job owned by `owner`. Returns the number removed.
    pub(crate) fn cancel_owned(&self, owner: &str) -> usize {
        let mut jobs = self.shared.jobs.lock();
        let before = jobs.len();
        jobs.retain(|_, job| job.owner != owner);
        let removed = before - jobs.len();
        if removed > 0 {
            warn!("swept {removed} scheduled job(s) owned by '{owner}'");
            self.shared.wake.notify_one();
        }
        removed
    }

    /// Number of scheduled jobs.
    pub fn job_count(&self) -> usize {
        self.shared.jobs.lock().len()
    }

    fn worker_loop(shared: &Shared) {
        let mut due_runs: Vec<Arc<Mutex<JobFn>>> = Vec::new();
        loop {
            {
                let mut jobs = shared.jobs.lock();
                if !shared.running.load(Ordering::SeqCst) {
                    break;
                }
                let now = Instant::now();
                match jobs.values().map(|job| job.next_due).min() {
                    None => {
                        shared.wake.wait(&mut jobs);
                    }
                    Some(due) if due > now => {
                        let _ = shared.wake.wait_until(&mut jobs, due);
                    }
                    Some(_) => {
                        for job in jobs.values_mut() {
                            if job.next_due <= now {
                                job.next_due = now + job.interval;
                                due_runs.push(Arc::clone(&job.run));
                            }
                        }
                    }
                }
            }
            // Table lock released; run the due callbacks.
            for run in due_runs.drain(..) {
                let mut callback = run.lock();
                (*callback)();
            }
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

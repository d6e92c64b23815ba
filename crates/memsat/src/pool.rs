//! Fixed-size worker pool for the combination and lift phases.
//!
//! Workers are spawned once at calculator construction and live until the
//! pool is dropped; each resolution phase enqueues its jobs and then
//! blocks on a barrier until the in-flight count returns to zero. One
//! mutex guards the queue, the count, and the shared result expression;
//! workers take the lock only to pick up a job and to publish its result.
//!
//! Results accumulate in an ordered set, so the phase output is the same
//! whatever order the workers run in.

use crate::calculator::Expression;
use memsat_core::Model;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::trace;

/// One unit of phase work.
pub(crate) enum Job {
    /// Combine `left[i]` with `right[j]` unless they are incompatible.
    Combine {
        /// Models of the lower expression.
        left: Arc<Vec<Model>>,
        /// Index into `left`.
        i: usize,
        /// Models of the upper expression.
        right: Arc<Vec<Model>>,
        /// Index into `right`.
        j: usize,
    },
    /// Close the innermost scope of one model.
    Lift(Model),
}

struct State {
    queue: VecDeque<Job>,
    /// Jobs enqueued or executing; the phase barrier waits for zero.
    in_flight: usize,
    result: Expression,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    job_ready: Condvar,
    all_idle: Condvar,
}

pub(crate) struct WorkerPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub(crate) fn new(n_workers: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                in_flight: 0,
                result: Expression::new(),
                shutdown: false,
            }),
            job_ready: Condvar::new(),
            all_idle: Condvar::new(),
        });
        let workers = (0..n_workers.max(1))
            .map(|_| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || worker_loop(&shared))
            })
            .collect();
        WorkerPool { shared, workers }
    }

    /// Enqueues one job for the current phase.
    pub(crate) fn dispatch(&self, job: Job) {
        let mut state = self.shared.state.lock();
        state.queue.push_back(job);
        state.in_flight += 1;
        drop(state);
        self.shared.job_ready.notify_one();
    }

    /// Phase barrier: blocks until every dispatched job has published,
    /// then takes the accumulated result expression.
    pub(crate) fn barrier(&self) -> Expression {
        let mut state = self.shared.state.lock();
        while state.in_flight != 0 {
            self.shared.all_idle.wait(&mut state);
        }
        trace!(models = state.result.len(), "phase barrier released");
        std::mem::take(&mut state.result)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.job_ready.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if let Some(job) = state.queue.pop_front() {
                    break job;
                }
                if state.shutdown {
                    return;
                }
                shared.job_ready.wait(&mut state);
            }
        };
        let produced = match job {
            Job::Combine { left, i, right, j } => {
                let (m0, m1) = (&left[i], &right[j]);
                if m0.is_incompatible(m1) {
                    None
                } else {
                    Some(m0.conjoin(m1))
                }
            }
            Job::Lift(mut model) => {
                model.lift();
                Some(model)
            }
        };
        let mut state = shared.state.lock();
        if let Some(model) = produced {
            state.result.insert(model);
        }
        state.in_flight -= 1;
        if state.in_flight == 0 {
            shared.all_idle.notify_all();
        }
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Parallel compile job queue.
//!
//! Jobs are closures scheduled on a [`CompileQueue`]. A fixed set of scoped
//! worker threads plus the thread calling [`CompileQueue::run`] pull jobs,
//! most recently scheduled first. A failing or panicking job records its
//! error and does not stop the others; [`CompileQueue::wait`] reports the
//! first recorded error once the queue has drained.
//!
//! A job may depend on other jobs. It is not started before every
//! dependency has finished, whether the dependency succeeded or not.

use std::panic::{self, AssertUnwindSafe};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Body of a compile job.
pub type JobFn<'s> = Box<dyn FnOnce() -> Result<()> + Send + 's>;

/// Handle to a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobHandle(usize);

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting to be picked up
    Queued,
    /// Picked up by a thread
    Running,
    /// Finished successfully
    Completed,
    /// Returned an error or panicked
    Failed,
}

impl JobState {
    fn is_finished(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

struct Job<'s> {
    name: String,
    run: Option<JobFn<'s>>,
    depends_on: Vec<JobHandle>,
    state: JobState,
}

struct QueueState<'s> {
    jobs: Vec<Job<'s>>,
    /// Queued jobs, most recent last
    pending: Vec<usize>,
    active: usize,
    errors: Vec<Error>,
    shutdown: bool,
}

impl<'s> QueueState<'s> {
    fn is_runnable(&self, index: usize) -> bool {
        self.jobs[index]
            .depends_on
            .iter()
            .all(|dep| self.jobs[dep.0].state.is_finished())
    }

    /// Position in `pending` of the most recently queued runnable job.
    fn next_runnable(&self) -> Option<usize> {
        self.pending
            .iter()
            .rposition(|&index| self.is_runnable(index))
    }

    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.active == 0
    }
}

/// Queue of compile jobs borrowing data that lives for `'s`.
pub struct CompileQueue<'s> {
    state: Mutex<QueueState<'s>>,
    cond: Condvar,
}

impl Default for CompileQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> CompileQueue<'s> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: Vec::new(),
                pending: Vec::new(),
                active: 0,
                errors: Vec::new(),
                shutdown: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Adds a job.
    pub fn schedule<F>(&self, name: impl Into<String>, job: F) -> JobHandle
    where
        F: FnOnce() -> Result<()> + Send + 's,
    {
        let mut state = self.state.lock();
        let index = state.jobs.len();
        let name = name.into();
        trace!(job = %name, "scheduled");
        state.jobs.push(Job {
            name,
            run: Some(Box::new(job)),
            depends_on: Vec::new(),
            state: JobState::Queued,
        });
        state.pending.push(index);
        drop(state);
        self.cond.notify_one();
        JobHandle(index)
    }

    /// Delays `job` until `dependency` has finished.
    ///
    /// Has no effect once `job` has started.
    pub fn depends_on(&self, job: JobHandle, dependency: JobHandle) {
        let mut state = self.state.lock();
        if state.jobs[job.0].state == JobState::Queued {
            state.jobs[job.0].depends_on.push(dependency);
        }
    }

    /// Current state of a job.
    pub fn state(&self, job: JobHandle) -> JobState {
        self.state.lock().jobs[job.0].state
    }

    /// Runs one runnable job on the calling thread. Returns `false` when
    /// nothing was runnable.
    pub fn consume(&self) -> bool {
        let (index, name, run) = {
            let mut state = self.state.lock();
            let Some(position) = state.next_runnable() else {
                return false;
            };
            let index = state.pending.remove(position);
            state.active += 1;
            let job = &mut state.jobs[index];
            job.state = JobState::Running;
            (index, job.name.clone(), job.run.take())
        };

        let outcome = match run {
            Some(run) => panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
                Err(Error::internal(format!(
                    "job '{}' panicked: {}",
                    name,
                    panic_message(payload.as_ref())
                )))
            }),
            None => Err(Error::internal(format!("job '{}' started twice", name))),
        };

        let mut state = self.state.lock();
        state.active -= 1;
        let finished = match outcome {
            Ok(()) => {
                trace!(job = %name, "completed");
                JobState::Completed
            }
            Err(err) => {
                warn!(job = %name, error = %err, "job failed");
                state.errors.push(err);
                JobState::Failed
            }
        };
        state.jobs[index].state = finished;
        drop(state);
        self.cond.notify_all();
        true
    }

    /// Runs jobs on the calling thread until the queue is drained, then
    /// returns the first recorded error.
    pub fn wait(&self) -> Result<()> {
        loop {
            while self.consume() {}

            let mut state = self.state.lock();
            if state.is_drained() {
                break;
            }
            if state.next_runnable().is_some() {
                continue;
            }
            if state.active == 0 {
                // Nothing running and nothing runnable: the rest wait on each other
                let stuck = std::mem::take(&mut state.pending);
                for index in stuck {
                    let job = &mut state.jobs[index];
                    job.state = JobState::Failed;
                    job.run = None;
                    let err = Error::internal(format!("job '{}' is part of a dependency cycle", job.name));
                    state.errors.push(err);
                }
                break;
            }
            self.cond.wait(&mut state);
        }

        let state = self.state.lock();
        match state.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Every error recorded so far, in completion order.
    pub fn errors(&self) -> Vec<Error> {
        self.state.lock().errors.clone()
    }

    /// Drains the queue with `threads` threads, the caller included.
    pub fn run(&self, threads: usize) -> Result<()> {
        let workers = threads.max(1) - 1;
        debug!(workers, jobs = self.state.lock().pending.len(), "running compile queue");

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| self.work());
            }
            let result = self.wait();
            self.state.lock().shutdown = true;
            self.cond.notify_all();
            result
        })
    }

    fn work(&self) {
        loop {
            if self.consume() {
                continue;
            }
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            if state.next_runnable().is_none() {
                self.cond.wait(&mut state);
            }
            if state.shutdown {
                return;
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

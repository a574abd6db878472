/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use crate::error::{ClientError, ErrorCode};
use crate::storage::callback_table::panic_message;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, trace, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

const TASK_QUEUE_TAG: &str = "DeferredTaskQueue";
const TASK_QUEUE_FN_SUBMIT_TAG: &str = "submit";
const TASK_QUEUE_FN_WORKER_TAG: &str = "ordered_worker";
const TASK_QUEUE_FN_DRAIN_TAG: &str = "drain";

type Job = Box<dyn FnOnce() + Send>;

/// A unit of background work handed to a [DeferredTaskQueue]
pub enum Task {
    /// Work already running on its own thread
    Running(JoinHandle<()>),
    /// Work that has not started yet and must run after everything deferred before it
    Deferred(Job),
}

impl Task {
    /// Starts `f` on a new named thread
    ///
    /// Fails with [ErrorCode::NoMemory] when the thread cannot be created.
    pub fn spawn<F>(name: &str, f: F) -> Result<Self, ClientError>
    where
        F: FnOnce() + Send + 'static,
    {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(f)
            .map(Task::Running)
            .map_err(|err| {
                ClientError::fail_with_code(
                    ErrorCode::NoMemory,
                    format!("Unable to spawn thread {name}: {err}"),
                )
            })
    }

    pub fn deferred<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Task::Deferred(Box::new(f))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Task::Deferred(_))
    }
}

impl Debug for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Running(handle) => f
                .debug_tuple("Running")
                .field(&handle.thread().name())
                .finish(),
            Task::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

struct OrderedWorker {
    sender: Sender<Job>,
    handle: JoinHandle<()>,
}

impl OrderedWorker {
    fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    /// Closes the FIFO and waits for the worker to exit, unless called from the worker itself
    fn close_and_join(self) {
        let OrderedWorker { sender, handle } = self;
        drop(sender);

        if handle.thread().id() == thread::current().id() {
            trace!(
                "{}:{} - called from the ordered worker, not joining",
                TASK_QUEUE_TAG,
                TASK_QUEUE_FN_DRAIN_TAG
            );
            return;
        }
        if handle.join().is_err() {
            error!(
                "{}:{} - ordered worker exited by panic",
                TASK_QUEUE_TAG, TASK_QUEUE_FN_DRAIN_TAG
            );
        }
    }
}

/// Keeps track of a client's background work
///
/// Running tasks are only held on to and reaped lazily. Deferred tasks are executed one at a
/// time, in submission order, on a single worker thread that is started on first use.
pub struct DeferredTaskQueue {
    name: String,
    running: Mutex<VecDeque<JoinHandle<()>>>,
    ordered: Mutex<Option<OrderedWorker>>,
    shutdown: Arc<AtomicBool>,
}

impl DeferredTaskQueue {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            running: Mutex::new(VecDeque::new()),
            ordered: Mutex::new(None),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn submit(&self, task: Task) -> Result<(), ClientError> {
        match task {
            Task::Running(handle) => {
                let mut running = self.running.lock();
                let reaped = Self::reap_front(&mut running);
                running.push_back(handle);
                trace!(
                    "{}:{} - {}: reaped {reaped}, {} running",
                    TASK_QUEUE_TAG,
                    TASK_QUEUE_FN_SUBMIT_TAG,
                    self.name,
                    running.len()
                );
                Ok(())
            }
            Task::Deferred(job) => self.submit_ordered(job),
        }
    }

    /// Drops finished handles from the front, stopping at the first one still running
    fn reap_front(running: &mut VecDeque<JoinHandle<()>>) -> usize {
        let mut reaped = 0;
        while running.front().is_some_and(|handle| handle.is_finished()) {
            if let Some(handle) = running.pop_front() {
                if handle.join().is_err() {
                    warn!(
                        "{}:{} - a running task exited by panic",
                        TASK_QUEUE_TAG, TASK_QUEUE_FN_SUBMIT_TAG
                    );
                }
                reaped += 1;
            }
        }
        reaped
    }

    fn submit_ordered(&self, job: Job) -> Result<(), ClientError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(ClientError::fail_with_code(
                ErrorCode::Failed,
                format!("{} is shutting down", self.name),
            ));
        }

        let mut ordered = self.ordered.lock();
        if ordered.is_none() {
            *ordered = Some(self.start_worker()?);
        }

        let Some(worker) = ordered.as_ref() else {
            return Err(ClientError::fail_with_code(
                ErrorCode::Failed,
                "Ordered worker is not running",
            ));
        };
        worker.sender.send(job).map_err(|_| {
            ClientError::fail_with_code(
                ErrorCode::Failed,
                format!("Ordered worker of {} has exited", self.name),
            )
        })
    }

    fn start_worker(&self) -> Result<OrderedWorker, ClientError> {
        let (sender, receiver) = unbounded::<Job>();
        let shutdown = self.shutdown.clone();
        let thread_name = format!("{}-ordered", self.name);

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || Self::run_ordered(receiver, shutdown))
            .map_err(|err| {
                ClientError::fail_with_code(
                    ErrorCode::NoMemory,
                    format!("Unable to spawn {thread_name}: {err}"),
                )
            })?;

        trace!(
            "{}:{} - started {thread_name}",
            TASK_QUEUE_TAG,
            TASK_QUEUE_FN_SUBMIT_TAG
        );
        Ok(OrderedWorker { sender, handle })
    }

    fn run_ordered(receiver: Receiver<Job>, shutdown: Arc<AtomicBool>) {
        // Ends once every sender is gone and the FIFO is empty
        for job in receiver.iter() {
            if shutdown.load(Ordering::Acquire) {
                trace!(
                    "{}:{} - shutdown seen, dropping remaining tasks",
                    TASK_QUEUE_TAG,
                    TASK_QUEUE_FN_WORKER_TAG
                );
                break;
            }
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                error!(
                    "{}:{} - deferred task panicked: {}",
                    TASK_QUEUE_TAG,
                    TASK_QUEUE_FN_WORKER_TAG,
                    panic_message(payload.as_ref())
                );
            }
        }
    }

    /// Runs every deferred task submitted so far to completion and stops the worker
    ///
    /// A later deferred submission starts a fresh worker. When called from a deferred task
    /// the remaining tasks still run but this call does not wait for them.
    pub fn drain(&self) {
        let worker = self.ordered.lock().take();
        if let Some(worker) = worker {
            worker.close_and_join();
        }
    }

    /// Whether the current thread is this queue's ordered worker
    pub fn is_worker_thread(&self) -> bool {
        self.ordered
            .lock()
            .as_ref()
            .is_some_and(|worker| worker.thread_id() == thread::current().id())
    }

    /// Number of running task handles still held, finished or not
    pub fn running_len(&self) -> usize {
        self.running.lock().len()
    }
}

impl Drop for DeferredTaskQueue {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(worker) = self.ordered.get_mut().take() {
            worker.close_and_join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn test_ordered_tasks_complete_in_submission_order() {
        let queue = DeferredTaskQueue::new("ordered-test");
        let counter = Arc::new(AtomicUsize::new(0));
        let observed = Arc::new(Mutex::new(Vec::new()));

        for k in 0..20 {
            let counter = counter.clone();
            let observed = observed.clone();
            queue
                .submit(Task::deferred(move || {
                    if k % 3 == 0 {
                        thread::sleep(Duration::from_millis(2));
                    }
                    let seq = counter.fetch_add(1, Ordering::SeqCst);
                    observed.lock().push((k, seq));
                }))
                .unwrap();
        }
        queue.drain();

        let observed = observed.lock();
        assert_eq!(observed.len(), 20);
        for (k, seq) in observed.iter() {
            assert_eq!(k, seq);
        }
    }

    #[test]
    fn test_reaping_stops_at_first_unfinished_task() {
        let queue = DeferredTaskQueue::new("reap-test");
        let release = Arc::new(Barrier::new(2));

        let blocker = release.clone();
        queue
            .submit(Task::spawn("blocked", move || {
                blocker.wait();
            })
            .unwrap())
            .unwrap();

        let quick = thread::spawn(|| {});
        while !quick.is_finished() {
            thread::sleep(Duration::from_millis(1));
        }
        queue.submit(Task::Running(quick)).unwrap();
        queue.submit(Task::spawn("noop", || {}).unwrap()).unwrap();

        // The finished task sits behind the blocked one and is kept
        assert_eq!(queue.running_len(), 3);

        release.wait();
        while !queue.running.lock().iter().all(|h| h.is_finished()) {
            thread::sleep(Duration::from_millis(1));
        }
        queue.submit(Task::spawn("last", || {}).unwrap()).unwrap();
        assert_eq!(queue.running_len(), 1);
    }

    #[test]
    fn test_drop_waits_for_in_flight_and_skips_queued() {
        let started = Arc::new(Barrier::new(2));
        let finished = Arc::new(AtomicBool::new(false));
        let queued_ran = Arc::new(AtomicBool::new(false));

        let queue = DeferredTaskQueue::new("drop-test");
        {
            let started = started.clone();
            let finished = finished.clone();
            queue
                .submit(Task::deferred(move || {
                    started.wait();
                    thread::sleep(Duration::from_millis(50));
                    finished.store(true, Ordering::SeqCst);
                }))
                .unwrap();
        }
        {
            let queued_ran = queued_ran.clone();
            queue
                .submit(Task::deferred(move || {
                    queued_ran.store(true, Ordering::SeqCst);
                }))
                .unwrap();
        }

        started.wait();
        drop(queue);

        assert!(finished.load(Ordering::SeqCst));
        assert!(!queued_ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panicking_task_does_not_stop_the_worker() {
        let queue = DeferredTaskQueue::new("panic-test");
        let ran = Arc::new(AtomicBool::new(false));

        queue.submit(Task::deferred(|| panic!("task failed"))).unwrap();
        let ran_cb = ran.clone();
        queue
            .submit(Task::deferred(move || ran_cb.store(true, Ordering::SeqCst)))
            .unwrap();
        queue.drain();

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drain_from_worker_does_not_deadlock() {
        let queue = Arc::new(DeferredTaskQueue::new("self-drain"));
        let ran = Arc::new(AtomicBool::new(false));

        let inner_queue = queue.clone();
        let inner_ran = ran.clone();
        queue
            .submit(Task::deferred(move || {
                assert!(inner_queue.is_worker_thread());
                inner_queue.drain();
                inner_ran.store(true, Ordering::SeqCst);
            }))
            .unwrap();

        while !ran.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!queue.is_worker_thread());
    }
}

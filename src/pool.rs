//! An elastic worker thread pool over a single shared FIFO queue.
//!
//! Callers enqueue boxed closures; idle workers claim them in FIFO order
//! and run them outside the pool lock, so concurrent execution of multiple
//! items is the normal case and lock hold time is bounded by queue
//! bookkeeping, not job duration. The worker set grows on demand up to a
//! maximum and shrinks back toward a minimum once a worker has idled past
//! the linger interval. Termination queues a sentinel that drains the queue
//! and winds every worker down.
//!
//! There is exactly one scheduling policy — this FIFO — and no work
//! stealing, priorities, or cancellation of a claimed item.

use std::collections::VecDeque;
use std::panic;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};

use crate::sync::{Cond, Mutex, MutexGuard};
use crate::thread::Thread;
use crate::{Result, ThreadError};

/// Linger interval used by [`ThreadPool::with_defaults`].
pub const DEFAULT_LINGER: Duration = Duration::from_secs(60);

/// A queued unit of work.
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one enqueued work item for [`ThreadPool::wait`].
///
/// Tickets are unique for the lifetime of the pool, so waiting on one can
/// never be confused with waiting on any other item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobTicket(u64);

/// One entry in the pool's queue.
///
/// The terminal marker is its own variant rather than a magic work item:
/// it is matched structurally, never claimed, and never executed.
enum Entry {
    Job(WorkItem),
    Sentinel,
}

struct WorkItem {
    ticket: u64,
    /// Taken by the claiming worker; `Some` while the item is unclaimed.
    job: Option<Job>,
    /// Set by waiters; a worker broadcasts `done` when removing an awaited
    /// item after running it.
    awaited: bool,
}

/// Queue and counters, all mutated only under the pool lock.
struct PoolState {
    /// Claimed prefix (items currently executing, in claim order) followed
    /// by the unclaimed suffix, FIFO.
    queue: VecDeque<Entry>,
    /// Index of the first unclaimed entry; everything before it is owned
    /// by some running worker.
    next_claim: usize,
    worker_count: usize,
    idle_count: usize,
    next_ticket: u64,
    next_worker_id: u32,
    terminating: bool,
}

struct Shared {
    lock: Mutex<PoolState>,
    /// Idle workers wait here for the queue to become non-empty.
    work: Cond,
    /// External waiters (wait/wait_all/terminate) wait here for
    /// completions and for the worker count to reach zero.
    done: Cond,
    min_workers: usize,
    max_workers: usize,
    linger: Duration,
}

/// A dynamically-sized worker thread pool.
///
/// Workers are spawned on demand up to `max_workers` and shrink back to
/// `min_workers` after idling past the linger interval. Enqueueing never
/// blocks the caller; a pool at capacity simply leaves the item queued
/// until a worker comes back around.
pub struct ThreadPool {
    shared: Arc<Shared>,
    terminated: bool,
}

impl ThreadPool {
    /// Creates a pool and immediately spawns `min_workers` workers.
    ///
    /// Spawning is best effort: the pool proceeds with however many workers
    /// actually started, and later enqueues will try to make up the
    /// difference.
    ///
    /// # Errors
    ///
    /// `InvalidState` if `max_workers == 0` or `min_workers > max_workers`.
    pub fn new(min_workers: usize, max_workers: usize, linger: Duration) -> Result<ThreadPool> {
        if max_workers == 0 || min_workers > max_workers {
            return Err(ThreadError::InvalidState(
                "worker bounds must satisfy 0 < max and min <= max",
            ));
        }
        let shared = Arc::new(Shared {
            lock: Mutex::new(PoolState {
                queue: VecDeque::new(),
                next_claim: 0,
                worker_count: 0,
                idle_count: 0,
                next_ticket: 0,
                next_worker_id: 0,
                terminating: false,
            }),
            work: Cond::new(),
            done: Cond::new(),
            min_workers,
            max_workers,
            linger,
        });

        {
            let mut state = shared.lock.lock()?;
            for _ in 0..min_workers {
                spawn_worker(&shared, &mut state);
            }
            debug!(
                "pool started with {} of {} requested workers",
                state.worker_count, min_workers
            );
        }

        Ok(ThreadPool {
            shared,
            terminated: false,
        })
    }

    /// Creates a pool sized from the machine's CPU count, with
    /// [`DEFAULT_LINGER`] as the linger interval.
    pub fn with_defaults() -> Result<ThreadPool> {
        let min = num_cpus::get();
        ThreadPool::new(min, min * 2, DEFAULT_LINGER)
    }

    /// Appends a work item to the queue.
    ///
    /// Never blocks and never fails on capacity. If a worker is idle, one
    /// is woken; otherwise, if the pool is below `max_workers`, a new
    /// worker is spawned (a spawn failure is tolerated — the item stays
    /// queued for the next opportunity). At capacity with no idle worker,
    /// the item simply waits for a worker to come back around.
    ///
    /// # Errors
    ///
    /// `InvalidState` once termination has begun.
    pub fn enqueue<F>(&self, job: F) -> Result<JobTicket>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.lock.lock()?;
        if state.terminating {
            return Err(ThreadError::InvalidState("enqueue into a terminating pool"));
        }
        let ticket = JobTicket(state.next_ticket);
        state.next_ticket += 1;
        state.queue.push_back(Entry::Job(WorkItem {
            ticket: ticket.0,
            job: Some(Box::new(job)),
            awaited: false,
        }));
        if state.idle_count > 0 {
            self.shared.work.signal();
        } else if state.worker_count < self.shared.max_workers {
            spawn_worker(&self.shared, &mut state);
        }
        Ok(ticket)
    }

    /// Blocks until the item identified by `ticket` is no longer in the
    /// pool — because it finished, or was never there to begin with (a
    /// no-op for an absent ticket).
    ///
    /// The queue is re-scanned under the lock after every wake, since a
    /// completion broadcast may have been for a different item, and the
    /// item is re-marked awaited before each wait so the flag cannot be
    /// lost.
    pub fn wait(&self, ticket: JobTicket) -> Result<()> {
        let mut state = self.shared.lock.lock()?;
        loop {
            let mut found = false;
            for entry in state.queue.iter_mut() {
                if let Entry::Job(item) = entry {
                    if item.ticket == ticket.0 {
                        item.awaited = true;
                        found = true;
                        break;
                    }
                }
            }
            if !found {
                return Ok(());
            }
            state = self.shared.done.wait(state)?;
        }
    }

    /// Blocks until the queue holds no work items, queued or running.
    ///
    /// Items enqueued while this call is blocked are waited for too: every
    /// wake re-marks whatever is in the queue. This does not fence new
    /// enqueues — under a producer that never goes idle, this call may
    /// never return.
    pub fn wait_all(&self) -> Result<()> {
        let mut state = self.shared.lock.lock()?;
        loop {
            let mut any = false;
            for entry in state.queue.iter_mut() {
                if let Entry::Job(item) = entry {
                    item.awaited = true;
                    any = true;
                }
            }
            if !any {
                return Ok(());
            }
            state = self.shared.done.wait(state)?;
        }
    }

    /// Drains the queue and winds the pool down.
    ///
    /// Appends the shutdown sentinel, wakes every idle worker, and blocks
    /// until the live worker count reaches zero — all previously queued
    /// items run first, since the sentinel sits behind them in FIFO order.
    /// The pool is inert afterwards; any concurrent or subsequent
    /// `enqueue` fails.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the pool was already terminated.
    pub fn terminate(&mut self) -> Result<()> {
        if self.terminated {
            return Err(ThreadError::InvalidState("pool already terminated"));
        }
        self.terminated = true;
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let mut state = self.shared.lock.lock()?;
        state.terminating = true;
        state.queue.push_back(Entry::Sentinel);
        self.shared.work.broadcast();
        while state.worker_count > 0 {
            state = self.shared.done.wait(state)?;
        }
        debug!("pool terminated");
        state.queue.clear();
        Ok(())
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> Result<usize> {
        Ok(self.shared.lock.lock()?.worker_count)
    }

    /// Number of workers currently blocked awaiting work.
    pub fn idle_count(&self) -> Result<usize> {
        Ok(self.shared.lock.lock()?.idle_count)
    }

    /// Number of work items still queued or running.
    pub fn pending(&self) -> Result<usize> {
        let state = self.shared.lock.lock()?;
        Ok(state
            .queue
            .iter()
            .filter(|e| matches!(e, Entry::Job(_)))
            .count())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.terminated {
            self.terminated = true;
            let _ = self.shutdown();
        }
    }
}

/// Spawns one worker, best effort, with the pool lock held.
///
/// The count is bumped only on success; on failure nothing changes and any
/// queued items wait for the next opportunity. There is no retry.
fn spawn_worker(shared: &Arc<Shared>, state: &mut MutexGuard<'_, PoolState>) {
    let id = state.next_worker_id;
    state.next_worker_id += 1;
    let shared_for_worker = Arc::clone(shared);
    match Thread::spawn_named(format!("pool-worker-{id}"), move || {
        worker_loop(&shared_for_worker, id)
    }) {
        Ok(mut thread) => {
            // Workers are never joined; termination tracks them by count.
            let _ = thread.detach();
            state.worker_count += 1;
        }
        Err(e) => {
            debug!("worker spawn failed, deferring work: {e}");
        }
    }
}

fn worker_loop(shared: &Shared, id: u32) {
    debug!("worker {id} started");
    if let Err(e) = run_worker(shared, id) {
        // Pool bookkeeping is unusable (poisoned lock). Nothing can be
        // recovered for this instance; the worker can only bail out.
        error!("worker {id} exiting on pool error: {e}");
    }
}

/// State machine per worker: Idle -> Running -> Idle -> ... until either a
/// linger timeout above the minimum (shrink) or the sentinel (terminate).
fn run_worker(shared: &Shared, id: u32) -> Result<()> {
    let mut state = shared.lock.lock()?;
    loop {
        state.idle_count += 1;
        while state.next_claim >= state.queue.len() {
            if state.worker_count <= shared.min_workers {
                state = shared.work.wait(state)?;
            } else {
                let (reacquired, timed_out) = shared.work.wait_timeout(state, shared.linger)?;
                state = reacquired;
                // Re-check the minimum under the lock: several workers can
                // time out together, and only those still above it may go.
                if timed_out
                    && state.next_claim >= state.queue.len()
                    && state.worker_count > shared.min_workers
                {
                    state.idle_count -= 1;
                    debug!("worker {id}: idle past linger interval, shrinking");
                    exit_worker(shared, &mut state);
                    return Ok(());
                }
            }
        }
        state.idle_count -= 1;

        let claim_index = state.next_claim;
        let claimed = match &mut state.queue[claim_index] {
            // The sentinel is left in place so every other worker sees it.
            Entry::Sentinel => None,
            Entry::Job(item) => {
                let job = item
                    .job
                    .take()
                    .expect("unclaimed work item missing its closure");
                Some((item.ticket, job))
            }
        };
        let Some((ticket, job)) = claimed else {
            debug!("worker {id}: shutdown sentinel reached");
            exit_worker(shared, &mut state);
            return Ok(());
        };
        state.next_claim += 1;
        drop(state);

        // Run outside the lock. A panicking job must not take the worker
        // down with it, or a waiter on this ticket would hang.
        if panic::catch_unwind(panic::AssertUnwindSafe(job)).is_err() {
            error!("worker {id}: job panicked");
        }

        state = shared.lock.lock()?;
        let pos = state
            .queue
            .iter()
            .take(state.next_claim)
            .position(|e| matches!(e, Entry::Job(item) if item.ticket == ticket))
            .expect("completed work item missing from queue");
        let entry = state
            .queue
            .remove(pos)
            .expect("queue shrank under the pool lock");
        state.next_claim -= 1;
        if let Entry::Job(item) = entry {
            if item.awaited {
                shared.done.broadcast();
            }
        }
    }
}

/// Worker exit bookkeeping, with the pool lock held.
fn exit_worker(shared: &Shared, state: &mut MutexGuard<'_, PoolState>) {
    state.worker_count -= 1;
    if state.worker_count == 0 {
        if state.terminating {
            // Hard invariant: every item ahead of the sentinel must have
            // been executed before the last worker can exit.
            assert!(
                matches!(state.queue.front(), Some(Entry::Sentinel)),
                "thread pool terminated with work still queued"
            );
        }
        shared.done.broadcast();
    }
}

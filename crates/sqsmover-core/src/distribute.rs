//! Parallel move loops sharing one message budget.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::MoveError;
use crate::mover::BatchMover;

/// Number of workers worth running for `budget` messages read `max_per_read`
/// at a time: at most `parallelism`, at most one per read, at least one.
pub fn effective_parallelism(budget: usize, parallelism: usize, max_per_read: usize) -> usize {
    let reads = budget.div_ceil(max_per_read.max(1));
    parallelism.min(reads).max(1)
}

/// Outcome of a distributed run.
#[derive(Debug, Default)]
pub struct Distribution {
    /// Messages sent and deleted across all workers
    pub moved: usize,
    /// Budget left unreserved when the last worker stopped
    pub remaining: usize,
    pub workers: usize,
    /// First hard error any worker hit
    pub error: Option<MoveError>,
}

/// State shared by all move loops.
struct Shared {
    /// Messages not yet reserved by a worker
    remaining: AtomicUsize,
    moved: AtomicUsize,
    /// Set once any worker has failed; polled before every reservation
    failed: AtomicBool,
    errors: mpsc::Sender<MoveError>,
}

impl Shared {
    /// Takes up to `max` units off the budget in one step, so two workers
    /// can never claim the same tail.
    fn reserve(&self, max: usize) -> Option<usize> {
        self.remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| {
                (left > 0).then(|| left - left.min(max))
            })
            .ok()
            .map(|before| before.min(max))
    }

    fn release(&self, unused: usize) {
        if unused > 0 {
            self.remaining.fetch_add(unused, Ordering::AcqRel);
        }
    }

    /// Records `error` unless another worker got there first.
    fn fail(&self, error: MoveError) {
        self.failed.store(true, Ordering::Release);
        if self.errors.try_send(error).is_err() {
            log::debug!("a move error was already recorded, dropping this one");
        }
    }

    fn stopped(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }
}

/// Runs several [`BatchMover`] loops against one shared budget.
pub struct WorkDistributor {
    mover: BatchMover,
    max_per_read: usize,
}

impl WorkDistributor {
    pub fn new(mover: BatchMover, max_per_read: usize) -> Self {
        Self {
            mover,
            max_per_read: max_per_read.max(1),
        }
    }

    /// Moves up to `budget` messages with up to `parallelism` workers and
    /// waits for all of them to stop.
    ///
    /// A worker stops when the budget is used up, when a receive comes back
    /// empty, or when any worker has recorded a hard error. Calls already in
    /// flight are never interrupted.
    pub async fn distribute(&self, budget: usize, parallelism: usize) -> Distribution {
        let workers = effective_parallelism(budget, parallelism, self.max_per_read);
        let (errors, mut first_error) = mpsc::channel(1);
        let shared = Arc::new(Shared {
            remaining: AtomicUsize::new(budget),
            moved: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            errors,
        });

        log::info!("will move ~{budget} messages using {workers} workers");

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let mover = self.mover.clone();
            let shared = shared.clone();
            let max_per_read = self.max_per_read;
            tasks.spawn(async move {
                move_loop(worker, mover, &shared, max_per_read, budget).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                shared.fail(MoveError::Worker(e.to_string()));
            }
        }

        Distribution {
            moved: shared.moved.load(Ordering::Acquire),
            remaining: shared.remaining.load(Ordering::Acquire),
            workers,
            error: first_error.try_recv().ok(),
        }
    }
}

async fn move_loop(
    worker: usize,
    mover: BatchMover,
    shared: &Shared,
    max_per_read: usize,
    budget: usize,
) {
    while !shared.stopped() {
        let Some(reserved) = shared.reserve(max_per_read) else {
            break;
        };

        let result = mover.move_batch(reserved).await;
        let moved = result.moved.min(reserved);
        let total = shared.moved.fetch_add(moved, Ordering::AcqRel) + moved;
        shared.release(reserved - moved);

        if let Some(error) = result.error {
            log::error!("worker {worker} stopped: {error}");
            shared.fail(error);
            break;
        }

        if moved == 0 {
            log::info!("no more messages to move in worker {worker}");
            break;
        }

        log::info!("moved {total}/{budget} messages");
    }
}

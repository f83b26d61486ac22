/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{self, OperationError, TransferError};

/// Part number recorded for a worker task that panicked or was aborted.
const UNKNOWN_PART: u64 = u64::MAX;

/// A unit of work identified by its part number.
pub(crate) trait PartJob: Send + 'static {
    fn part_number(&self) -> u64;
}

/// Fixed-size set of workers pulling part jobs from a shared queue.
///
/// The first failure stops the pool: no new job is started after it, jobs already in
/// flight run to completion. Cancelling the caller's token has the same effect.
#[derive(Debug)]
pub(crate) struct PartWorkerPool {
    concurrency: usize,
    cancel: CancellationToken,
    stop: CancellationToken,
}

/// Everything the pool observed while draining the queue.
#[derive(Debug)]
pub(crate) struct PoolOutcome<T> {
    /// Successful jobs, ascending by part number
    pub(crate) completed: Vec<(u64, T)>,
    /// Failed jobs, ascending by part number
    pub(crate) failures: Vec<(u64, TransferError)>,
    /// The caller's cancellation token fired before the pool finished
    pub(crate) cancelled: bool,
}

impl<T> PoolOutcome<T> {
    /// The failure with the lowest part number, if any job failed
    pub(crate) fn first_failure(&mut self) -> Option<TransferError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(self.failures.remove(0).1)
        }
    }
}

impl PartWorkerPool {
    pub(crate) fn new(concurrency: usize, cancel: &CancellationToken) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancel: cancel.clone(),
            stop: cancel.child_token(),
        }
    }

    /// Token that fires once the pool stops accepting work.
    ///
    /// Producers feeding the queue should stop when it fires, and may cancel it to stop
    /// the pool themselves.
    pub(crate) fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Run `work` for every job received on `jobs` until the queue closes or the pool stops.
    ///
    /// The receiver is closed before returning so that blocked producers are released.
    pub(crate) async fn run<J, T, F, Fut>(
        self,
        jobs: async_channel::Receiver<J>,
        work: F,
    ) -> PoolOutcome<T>
    where
        J: PartJob,
        T: Send + 'static,
        F: Fn(J) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TransferError>> + Send + 'static,
    {
        let mut workers = JoinSet::new();
        for worker_id in 0..self.concurrency {
            let worker = run_worker(jobs.clone(), work.clone(), self.stop.clone());
            workers.spawn(worker.instrument(tracing::trace_span!("part-worker", worker_id)));
        }

        let mut completed = Vec::new();
        let mut failures = Vec::new();
        while let Some(join_result) = workers.join_next().await {
            match join_result {
                Ok(mut result) => {
                    completed.append(&mut result.completed);
                    failures.append(&mut result.failures);
                }
                Err(err) => {
                    tracing::error!(error = ?err, "part worker did not complete");
                    self.stop.cancel();
                    failures.push((
                        UNKNOWN_PART,
                        error::part_failed(UNKNOWN_PART, OperationError::TaskFailed(err)),
                    ));
                }
            }
        }
        jobs.close();

        completed.sort_by_key(|(part_number, _)| *part_number);
        failures.sort_by_key(|(part_number, _)| *part_number);

        PoolOutcome {
            completed,
            failures,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

struct WorkerResult<T> {
    completed: Vec<(u64, T)>,
    failures: Vec<(u64, TransferError)>,
}

async fn run_worker<J, T, F, Fut>(
    jobs: async_channel::Receiver<J>,
    work: F,
    stop: CancellationToken,
) -> WorkerResult<T>
where
    J: PartJob,
    F: Fn(J) -> Fut,
    Fut: Future<Output = Result<T, TransferError>>,
{
    let mut result = WorkerResult {
        completed: Vec::new(),
        failures: Vec::new(),
    };

    loop {
        let job = tokio::select! {
            biased;
            _ = stop.cancelled() => {
                tracing::trace!("pool stopped, worker finished");
                break;
            }
            job = jobs.recv() => match job {
                Ok(job) => job,
                Err(_) => {
                    tracing::trace!("job queue closed, worker finished");
                    break;
                }
            },
        };

        let part_number = job.part_number();
        match work(job)
            .instrument(tracing::debug_span!("part", part_number))
            .await
        {
            Ok(output) => result.completed.push((part_number, output)),
            Err(err) => {
                tracing::debug!(part_number, error = %err, "part failed, stopping pool");
                stop.cancel();
                result.failures.push((part_number, err));
            }
        }
    }

    result
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::config::Config;
use crate::error::{self, TransferError};
use crate::io::TransferSink;
use crate::planner::PartPlan;
use crate::store::{ObjectPath, ObjectStore};
use crate::worker::PartWorkerPool;

mod discovery;
pub(crate) mod header;
mod worker;

/// Request types for downloads
pub mod request;

pub use self::request::{DownloadRequest, DownloadRequestBuilder};

/// Shared context used across a single download request
#[derive(Debug, Clone)]
pub(crate) struct DownloadContext {
    store: Arc<dyn ObjectStore>,
    config: Arc<Config>,
    source: Arc<ObjectPath>,
}

impl DownloadContext {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, config: Config, source: ObjectPath) -> Self {
        Self {
            store,
            config: Arc::new(config),
            source: Arc::new(source),
        }
    }

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn source(&self) -> &ObjectPath {
        &self.source
    }

    fn part_size(&self) -> u64 {
        self.config.part_size().bytes()
    }

    fn concurrency(&self) -> usize {
        self.config.concurrency().get()
    }
}

/// Response type for a single download object request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct DownloadResponse {
    bytes_written: u64,
    object_size: u64,
}

impl DownloadResponse {
    /// Bytes written to the sink
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Total size of the object, independent of any requested range
    pub fn object_size(&self) -> u64 {
        self.object_size
    }
}

/// Download the object (or range) described by `request` into `sink`.
///
/// Every failure after the transfer starts is reported as
/// [`TransferError::DownloadFailed`] with the bytes written so far.
pub(crate) async fn download(
    ctx: DownloadContext,
    request: DownloadRequest,
    sink: Arc<dyn TransferSink>,
) -> Result<DownloadResponse, TransferError> {
    let cancel = request.cancellation_token.clone();
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    let discovery = discovery::discover_obj(&ctx, &request)
        .await
        .map_err(|e| failed(0, e))?;
    tracing::debug!(
        source = %ctx.source(),
        object_size = discovery.object_size,
        window = ?discovery.window,
        "object discovered"
    );

    let window = discovery.window.clone();
    let remaining = discovery.remaining();
    let mut bytes_written = 0;
    let mut next_part_number = 1;
    if let Some(chunk) = discovery.initial_chunk {
        let len = chunk.len() as u64;
        sink.write_at(0, chunk)
            .await
            .map_err(|e| failed(0, error::part_failed(1, e)))?;
        bytes_written += len;
        next_part_number = 2;
    }

    let plan = PartPlan::new(remaining, ctx.part_size()).starting_at(next_part_number);
    if plan.part_count() == 0 {
        tracing::debug!(bytes_written, "download complete");
        return Ok(DownloadResponse {
            bytes_written,
            object_size: discovery.object_size,
        });
    }
    tracing::trace!(chunks = plan.part_count(), "distributing chunks");

    let pool = PartWorkerPool::new(ctx.concurrency(), &cancel);
    let stop = pool.stop_token();
    let (tx, rx) = async_channel::bounded(ctx.concurrency());
    let work = worker::download_chunk_fn(ctx.clone(), sink);

    let (_queued, mut outcome) = tokio::join!(
        worker::distribute_work(plan, window.start, tx, stop),
        pool.run(rx, work)
    );

    bytes_written += outcome.completed.iter().map(|(_, n)| n).sum::<u64>();
    let failure = outcome
        .first_failure()
        .or_else(|| outcome.cancelled.then_some(TransferError::Cancelled));
    if let Some(cause) = failure {
        tracing::debug!(bytes_written, error = %cause, "download failed");
        return Err(failed(bytes_written, cause));
    }

    tracing::debug!(bytes_written, "download complete");
    Ok(DownloadResponse {
        bytes_written,
        object_size: discovery.object_size,
    })
}

fn failed(bytes_written: u64, cause: TransferError) -> TransferError {
    TransferError::DownloadFailed {
        bytes_written,
        source: Box::new(cause),
    }
}

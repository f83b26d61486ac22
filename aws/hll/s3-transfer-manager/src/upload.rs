/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{self, TransferError};
use crate::io::part_reader::{PartData, PartReader};
use crate::io::{RandomAccessBody, TransferSource};
use crate::planner::{PartPlan, MAX_PARTS};
use crate::store::CompletedPart;
use crate::worker::{PartJob, PartWorkerPool, PoolOutcome};

mod context;
mod session;

/// Request types for uploads
pub mod request;

/// Response types for uploads
pub mod response;

pub(crate) use self::context::UploadContext;
use self::session::MultipartUploadSession;

pub use self::request::{UploadRequest, UploadRequestBuilder};
pub use self::response::UploadResponse;

/// Where the bytes of a single part come from
#[derive(Debug)]
enum PartBody {
    /// Already buffered (sequential sources)
    Loaded(Bytes),
    /// Read on demand by the worker (random-access sources)
    Deferred(RandomAccessBody, Range<u64>),
}

#[derive(Debug)]
struct UploadPartJob {
    part_number: u64,
    body: PartBody,
    // held until the part finishes uploading, bounding buffered parts
    _permit: Option<OwnedSemaphorePermit>,
}

impl PartJob for UploadPartJob {
    fn part_number(&self) -> u64 {
        self.part_number
    }
}

/// Upload `request` to the store described by `ctx`.
///
/// Sources no larger than one part are sent with a single `PutObject`. Anything larger goes
/// through a multipart upload that is either completed or cleaned up according to the
/// configured failure policy before returning.
pub(crate) async fn upload(
    ctx: UploadContext,
    mut request: UploadRequest,
) -> Result<UploadResponse, TransferError> {
    let cancel = request.cancellation_token.clone();
    if cancel.is_cancelled() {
        return Err(TransferError::Cancelled);
    }

    match request.take_body().into_source() {
        TransferSource::RandomAccess(body) => upload_random_access(ctx, body, cancel).await,
        TransferSource::Sequential(reader) => upload_sequential(ctx, reader, cancel).await,
    }
}

async fn upload_random_access(
    ctx: UploadContext,
    body: RandomAccessBody,
    cancel: CancellationToken,
) -> Result<UploadResponse, TransferError> {
    let len = body.len();
    let plan = PartPlan::for_upload(len, ctx.part_size());

    if plan.is_single_part() {
        tracing::debug!(
            len,
            part_size = plan.part_size(),
            "object fits in a single part; sending as a single PutObject request"
        );
        let data = body.read_range(0..len).await?;
        return put_single(&ctx, data).await;
    }

    if plan.part_size() != ctx.part_size() {
        tracing::debug!(
            requested = ctx.part_size(),
            effective = plan.part_size(),
            "part size grown to stay within {MAX_PARTS} parts"
        );
    }

    let session = create_session(&ctx).await?;
    tracing::trace!(
        upload_id = session.upload_id(),
        parts = plan.part_count(),
        "distributing parts"
    );

    let pool = PartWorkerPool::new(ctx.concurrency(), &cancel);
    let stop = pool.stop_token();
    let (tx, rx) = async_channel::bounded(ctx.concurrency());
    let work = upload_part_fn(ctx.clone(), session.upload_id());

    let (produced, outcome) = tokio::join!(
        distribute_parts(plan, body, tx, stop),
        pool.run(rx, work)
    );

    finish_multipart(&ctx, session, outcome, produced).await
}

async fn upload_sequential(
    ctx: UploadContext,
    reader: Box<dyn tokio::io::AsyncRead + Send + Unpin>,
    cancel: CancellationToken,
) -> Result<UploadResponse, TransferError> {
    let part_size = ctx.part_size();
    let buffer_size = usize::try_from(part_size).map_err(|_| {
        error::invalid_configuration(format!("part size {part_size} cannot be buffered"))
    })?;
    let mut reader = PartReader::new(reader, buffer_size);
    let semaphore = Arc::new(Semaphore::new(ctx.concurrency()));

    // one part of look-ahead decides between single-shot and multipart
    let first = match reader.next_part().await? {
        Some(part) => part,
        None => {
            tracing::debug!("source is empty; sending as a single PutObject request");
            return put_single(&ctx, Bytes::new()).await;
        }
    };
    if (first.data.len() as u64) < part_size {
        tracing::debug!(len = first.data.len(), "source exhausted within the first part");
        return put_single(&ctx, first.data).await;
    }
    let second = match reader.next_part().await? {
        Some(part) => part,
        None => {
            tracing::debug!(len = first.data.len(), "source is exactly one part");
            return put_single(&ctx, first.data).await;
        }
    };

    let session = create_session(&ctx).await?;
    let read_ahead = vec![
        (first, semaphore.clone().try_acquire_owned().ok()),
        (second, semaphore.clone().try_acquire_owned().ok()),
    ];

    let pool = PartWorkerPool::new(ctx.concurrency(), &cancel);
    let stop = pool.stop_token();
    let (tx, rx) = async_channel::bounded(ctx.concurrency());
    let work = upload_part_fn(ctx.clone(), session.upload_id());

    let producer = SequentialProducer {
        reader,
        semaphore,
        max_parts: MAX_PARTS,
        part_size,
    };
    let (produced, outcome) = tokio::join!(
        producer.distribute(read_ahead, tx, stop),
        pool.run(rx, work)
    );

    finish_multipart(&ctx, session, outcome, produced).await
}

async fn put_single(ctx: &UploadContext, data: Bytes) -> Result<UploadResponse, TransferError> {
    let len = data.len() as u64;
    let output = ctx.store().put_object(ctx.destination(), data).await?;
    tracing::debug!(destination = %ctx.destination(), len, "single request upload complete");
    Ok(UploadResponse::single_shot(output, len))
}

async fn create_session(ctx: &UploadContext) -> Result<MultipartUploadSession, TransferError> {
    let upload_id = ctx
        .store()
        .create_multipart_upload(ctx.destination())
        .await?;
    tracing::debug!(
        destination = %ctx.destination(),
        upload_id = %upload_id,
        "multipart upload started"
    );
    Ok(MultipartUploadSession::new(
        upload_id,
        ctx.destination().clone(),
    ))
}

/// Build the worker function uploading a single part. Returns the part validator and size.
fn upload_part_fn(
    ctx: UploadContext,
    upload_id: &str,
) -> impl Fn(UploadPartJob) -> BoxFuture<'static, Result<(CompletedPart, u64), TransferError>>
       + Clone
       + Send
       + Sync
       + 'static {
    let upload_id: Arc<str> = Arc::from(upload_id);
    move |job: UploadPartJob| {
        let ctx = ctx.clone();
        let upload_id = upload_id.clone();
        async move {
            let part_number = job.part_number;
            let data = match job.body {
                PartBody::Loaded(data) => data,
                PartBody::Deferred(ref body, ref range) => body
                    .read_range(range.clone())
                    .await
                    .map_err(|e| error::part_failed(part_number, e))?,
            };
            let size = data.len() as u64;
            tracing::trace!(size, "uploading part");
            let completed = ctx
                .store()
                .upload_part(ctx.destination(), &upload_id, part_number, data)
                .await
                .map_err(|e| error::part_failed(part_number, e))?;
            Ok::<_, TransferError>((completed, size))
        }
        .boxed()
    }
}

/// Queue every part of `plan`. Stops early once the pool stops.
async fn distribute_parts(
    plan: PartPlan,
    body: RandomAccessBody,
    tx: async_channel::Sender<UploadPartJob>,
    stop: CancellationToken,
) -> Result<u64, TransferError> {
    let mut queued = 0;
    for part in plan.parts() {
        let job = UploadPartJob {
            part_number: part.part_number,
            body: PartBody::Deferred(body.clone(), part.range),
            _permit: None,
        };
        if !send_job(&tx, job, &stop).await {
            break;
        }
        queued += 1;
    }
    tx.close();
    tracing::trace!(queued, "parts fully distributed");
    Ok(queued)
}

/// Reads parts off a sequential source, at most `concurrency` of them buffered at a time.
struct SequentialProducer {
    reader: PartReader,
    semaphore: Arc<Semaphore>,
    max_parts: u64,
    part_size: u64,
}

impl SequentialProducer {
    async fn distribute(
        mut self,
        read_ahead: Vec<(PartData, Option<OwnedSemaphorePermit>)>,
        tx: async_channel::Sender<UploadPartJob>,
        stop: CancellationToken,
    ) -> Result<u64, TransferError> {
        let result = self.produce(read_ahead, &tx, &stop).await;
        tx.close();
        if result.is_err() {
            stop.cancel();
        }
        result
    }

    async fn produce(
        &mut self,
        read_ahead: Vec<(PartData, Option<OwnedSemaphorePermit>)>,
        tx: &async_channel::Sender<UploadPartJob>,
        stop: &CancellationToken,
    ) -> Result<u64, TransferError> {
        let mut queued = 0;
        for (part, permit) in read_ahead {
            if !self.send_part(part, permit, tx, stop).await? {
                return Ok(queued);
            }
            queued += 1;
        }

        loop {
            let permit = tokio::select! {
                biased;
                _ = stop.cancelled() => return Ok(queued),
                permit = self.semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Ok(queued),
                },
            };
            let part = tokio::select! {
                biased;
                _ = stop.cancelled() => return Ok(queued),
                part = self.reader.next_part() => part?,
            };
            let Some(part) = part else {
                tracing::trace!(queued, "source exhausted, parts fully distributed");
                return Ok(queued);
            };
            if !self.send_part(part, Some(permit), tx, stop).await? {
                return Ok(queued);
            }
            queued += 1;
        }
    }

    /// Queue one part. Returns `Ok(false)` when the pool stopped accepting work.
    async fn send_part(
        &mut self,
        part: PartData,
        permit: Option<OwnedSemaphorePermit>,
        tx: &async_channel::Sender<UploadPartJob>,
        stop: &CancellationToken,
    ) -> Result<bool, TransferError> {
        if part.part_number > self.max_parts {
            tracing::debug!(
                part_number = part.part_number,
                max_parts = self.max_parts,
                "source exceeds the part ceiling"
            );
            return Err(TransferError::TooManyParts {
                max_parts: self.max_parts,
                part_size: self.part_size,
            });
        }
        let job = UploadPartJob {
            part_number: part.part_number,
            body: PartBody::Loaded(part.data),
            _permit: permit,
        };
        Ok(send_job(tx, job, stop).await)
    }
}

async fn send_job(
    tx: &async_channel::Sender<UploadPartJob>,
    job: UploadPartJob,
    stop: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = stop.cancelled() => false,
        sent = tx.send(job) => sent.is_ok(),
    }
}

/// Complete the multipart upload if every queued part succeeded, otherwise clean it up.
async fn finish_multipart(
    ctx: &UploadContext,
    mut session: MultipartUploadSession,
    mut outcome: PoolOutcome<(CompletedPart, u64)>,
    produced: Result<u64, TransferError>,
) -> Result<UploadResponse, TransferError> {
    for (_, (part, size)) in outcome.completed.drain(..) {
        session.record(part, size);
    }

    // a part failure wins over a producer failure, which wins over cancellation
    let (queued, producer_error) = match produced {
        Ok(queued) => (queued, None),
        Err(err) => (0, Some(err)),
    };
    let failure = outcome
        .first_failure()
        .or(producer_error)
        .or_else(|| outcome.cancelled.then_some(TransferError::Cancelled));
    if let Some(cause) = failure {
        return Err(abort_session(ctx, session, cause).await);
    }

    debug_assert_eq!(queued, session.part_count());

    tracing::trace!(
        upload_id = session.upload_id(),
        parts = session.part_count(),
        "completing multipart upload"
    );
    let completed = ctx
        .store()
        .complete_multipart_upload(
            session.destination(),
            session.upload_id(),
            session.ordered_parts(),
        )
        .await;

    match completed {
        Ok(output) => {
            tracing::debug!(
                upload_id = session.upload_id(),
                parts = session.part_count(),
                bytes = session.bytes(),
                "multipart upload complete"
            );
            let (part_count, bytes) = (session.part_count(), session.bytes());
            Ok(UploadResponse::multipart(
                output,
                session.into_upload_id(),
                part_count,
                bytes,
            ))
        }
        Err(err) => {
            tracing::error!(error = %err, "completing multipart upload failed");
            Err(abort_session(ctx, session, err.into()).await)
        }
    }
}

/// Apply the failure policy to `session` and wrap `cause` with the upload ID.
async fn abort_session(
    ctx: &UploadContext,
    session: MultipartUploadSession,
    cause: TransferError,
) -> TransferError {
    let abort_error = if ctx.config.leave_parts_on_error() {
        tracing::debug!(
            upload_id = session.upload_id(),
            error = %cause,
            "multipart upload failed; retaining uploaded parts"
        );
        None
    } else {
        tracing::debug!(
            upload_id = session.upload_id(),
            error = %cause,
            "multipart upload failed; aborting"
        );
        match ctx
            .store()
            .abort_multipart_upload(session.destination(), session.upload_id())
            .await
        {
            Ok(()) => None,
            Err(abort_err) => {
                tracing::error!(
                    upload_id = session.upload_id(),
                    error = %abort_err,
                    "aborting multipart upload failed"
                );
                Some(abort_err)
            }
        }
    };

    TransferError::MultipartFailure {
        upload_id: session.into_upload_id(),
        source: Box::new(cause),
        abort_error,
    }
}

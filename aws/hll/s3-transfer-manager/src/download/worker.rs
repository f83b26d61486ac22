/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::Range;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::download::discovery::check_length;
use crate::download::header;
use crate::download::DownloadContext;
use crate::error::{self, TransferError};
use crate::io::TransferSink;
use crate::planner::PartPlan;
use crate::worker::PartJob;

#[derive(Debug, Clone)]
pub(super) struct ChunkJob {
    // absolute byte range of the object to download
    pub(super) range: Range<u64>,
    // where the chunk lands in the sink
    pub(super) sink_offset: u64,
    pub(super) part_number: u64,
}

impl ChunkJob {
    /// Size of this chunk in bytes
    pub(super) fn size(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// `Range` header value requesting this chunk
    pub(super) fn range_header(&self) -> header::Range {
        header::Range::bytes_inclusive(self.range.start, self.range.end - 1)
    }
}

impl PartJob for ChunkJob {
    fn part_number(&self) -> u64 {
        self.part_number
    }
}

/// Worker function that downloads one chunk and writes it to `sink`.
///
/// Resolves to the number of bytes written.
pub(super) fn download_chunk_fn(
    ctx: DownloadContext,
    sink: Arc<dyn TransferSink>,
) -> impl Fn(ChunkJob) -> BoxFuture<'static, Result<u64, TransferError>> + Clone + Send + Sync + 'static
{
    move |job: ChunkJob| {
        let ctx = ctx.clone();
        let sink = sink.clone();
        async move { download_chunk(&ctx, sink.as_ref(), job).await }.boxed()
    }
}

/// Download an individual chunk of data
async fn download_chunk(
    ctx: &DownloadContext,
    sink: &dyn TransferSink,
    job: ChunkJob,
) -> Result<u64, TransferError> {
    let part_number = job.part_number;
    tracing::trace!(range = %job.range_header(), "fetching chunk");

    let inclusive = job.range.start..=(job.range.end - 1);
    let output = ctx
        .store()
        .get_object_range(ctx.source(), inclusive)
        .await
        .map_err(|e| error::part_failed(part_number, e))?;
    check_length(part_number, job.size(), output.data.len() as u64)?;

    sink.write_at(job.sink_offset, output.data)
        .await
        .map_err(|e| error::part_failed(part_number, e))?;
    Ok(job.size())
}

/// Queue every chunk of `plan`. Sink offsets are relative to `window_start`.
pub(super) async fn distribute_work(
    plan: PartPlan,
    window_start: u64,
    tx: async_channel::Sender<ChunkJob>,
    stop: CancellationToken,
) -> u64 {
    let mut queued = 0;
    for part in plan.parts() {
        let job = ChunkJob {
            sink_offset: part.range.start - window_start,
            range: part.range,
            part_number: part.part_number,
        };
        tracing::trace!("distributing chunk(size={}): {:?}", job.size(), job);

        let sent = tokio::select! {
            biased;
            _ = stop.cancelled() => false,
            sent = tx.send(job) => sent.is_ok(),
        };
        if !sent {
            tracing::trace!(queued, "pool stopped before all chunks were distributed");
            break;
        }
        queued += 1;
    }

    tx.close();
    queued
}

#[cfg(test)]
mod tests {
    use crate::download::worker::distribute_work;
    use crate::planner::PartPlan;
    use std::ops::Range;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_distribute_work() {
        let plan = PartPlan::new(100..191, 20).starting_at(2);
        let (tx, rx) = async_channel::unbounded();

        tokio::spawn(distribute_work(plan, 80, tx, CancellationToken::new()));

        let mut chunks = Vec::new();
        while let Ok(chunk) = rx.recv().await {
            chunks.push(chunk);
        }

        let expected_ranges = vec![100..120u64, 120..140, 140..160, 160..180, 180..191];
        let actual_ranges: Vec<Range<u64>> = chunks.iter().map(|c| c.range.clone()).collect();
        assert_eq!(expected_ranges, actual_ranges);
        assert!(rx.is_closed());

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(i as u64 + 2, chunk.part_number);
            assert_eq!(chunk.range.start - 80, chunk.sink_offset);
        }
        assert_eq!("bytes=180-190", chunks[4].range_header().to_string());
    }
}

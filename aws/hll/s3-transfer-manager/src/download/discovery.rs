/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io;
use std::ops::Range;

use bytes::Bytes;

use crate::error::{self, TransferError};

use super::header::ByteRange;
use super::{DownloadContext, DownloadRequest};

#[derive(Debug, Clone, PartialEq)]
enum ObjectDiscoveryStrategy {
    // The caller supplied the object size; no request is needed.
    // The overall transfer is optionally constrained to the given range.
    KnownSize(u64, Option<ByteRange>),
    // Fetch the first chunk of the window with a ranged get. The response also carries
    // the object size.
    RangedGet { start: u64, end: Option<u64> },
    // Suffix ranges need the object size before the window is known; probe with a
    // one byte get.
    SizeProbe(ByteRange),
}

/// Discovered object size (optionally with the first chunk of data)
#[derive(Debug)]
pub(super) struct ObjectDiscovery {
    /// absolute window of the object to transfer
    pub(super) window: Range<u64>,

    /// total object size
    pub(super) object_size: u64,

    /// the first chunk of the window if fetched during discovery
    pub(super) initial_chunk: Option<Bytes>,
}

impl ObjectDiscovery {
    /// Absolute range of data remaining to be fetched
    pub(super) fn remaining(&self) -> Range<u64> {
        let fetched = self.initial_chunk.as_ref().map_or(0, |c| c.len() as u64);
        (self.window.start + fetched)..self.window.end
    }
}

impl ObjectDiscoveryStrategy {
    fn from_request(request: &DownloadRequest) -> ObjectDiscoveryStrategy {
        if let Some(size) = request.object_size {
            return ObjectDiscoveryStrategy::KnownSize(size, request.range);
        }
        match request.range {
            None => ObjectDiscoveryStrategy::RangedGet {
                start: 0,
                end: None,
            },
            Some(ByteRange::AllFrom(start)) => ObjectDiscoveryStrategy::RangedGet {
                start,
                end: None,
            },
            Some(ByteRange::Inclusive(start, end)) => ObjectDiscoveryStrategy::RangedGet {
                start,
                end: Some(end),
            },
            Some(suffix @ ByteRange::Last(_)) => ObjectDiscoveryStrategy::SizeProbe(suffix),
        }
    }
}

/// Discover the size of an object and the window to transfer.
///
/// Returns the window, the object size, and _(if available)_ the first chunk of data.
pub(super) async fn discover_obj(
    ctx: &DownloadContext,
    request: &DownloadRequest,
) -> Result<ObjectDiscovery, TransferError> {
    let strategy = ObjectDiscoveryStrategy::from_request(request);
    tracing::trace!(?strategy, "discovering object");
    match strategy {
        ObjectDiscoveryStrategy::KnownSize(object_size, range) => Ok(ObjectDiscovery {
            window: range.map_or(0..object_size, |r| r.resolve(object_size)),
            object_size,
            initial_chunk: None,
        }),
        ObjectDiscoveryStrategy::RangedGet { start, end } => {
            let chunk_end = start
                .saturating_add(ctx.part_size() - 1)
                .min(end.unwrap_or(u64::MAX));
            let output = ctx
                .store()
                .get_object_range(ctx.source(), start..=chunk_end)
                .await
                .map_err(|e| error::part_failed(1, e))?;

            let object_size = output.total_size;
            let window = match end {
                Some(end) => ByteRange::Inclusive(start, end).resolve(object_size),
                None => ByteRange::AllFrom(start).resolve(object_size),
            };
            let expected = window.end.min(chunk_end.saturating_add(1)) - window.start;
            check_length(1, expected, output.data.len() as u64)?;

            let initial_chunk = Some(output.data).filter(|data| !data.is_empty());
            Ok(ObjectDiscovery {
                window,
                object_size,
                initial_chunk,
            })
        }
        ObjectDiscoveryStrategy::SizeProbe(range) => {
            let output = ctx
                .store()
                .get_object_range(ctx.source(), 0..=0)
                .await
                .map_err(|e| error::part_failed(1, e))?;
            Ok(ObjectDiscovery {
                window: range.resolve(output.total_size),
                object_size: output.total_size,
                initial_chunk: None,
            })
        }
    }
}

/// Fail `part_number` when a ranged read returned a different number of bytes than asked for.
pub(super) fn check_length(part_number: u64, expected: u64, actual: u64) -> Result<(), TransferError> {
    if expected == actual {
        return Ok(());
    }
    Err(error::part_failed(
        part_number,
        io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {expected} bytes but received {actual}"),
        ),
    ))
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

pub(crate) mod part_reader;
mod path_body;
mod sink;
mod size_hint;
mod stream;

/// Error types related to I/O abstractions
pub mod error;

use std::io;
use std::ops::Range;

use bytes::Bytes;
use tokio::io::AsyncRead;

use self::path_body::PathBody;

pub use self::path_body::PathBodyBuilder;
pub use self::sink::{FileSink, MemorySink, TransferSink};
pub use self::size_hint::SizeHint;
pub use self::stream::InputStream;

/// How the bytes of an upload are obtained.
pub(crate) enum TransferSource {
    /// Any range can be read independently, any number of times.
    RandomAccess(RandomAccessBody),
    /// Bytes can only be read once, in order.
    Sequential(Box<dyn AsyncRead + Send + Unpin>),
}

impl std::fmt::Debug for TransferSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferSource::RandomAccess(body) => {
                f.debug_tuple("RandomAccess").field(body).finish()
            }
            TransferSource::Sequential(_) => f.write_str("Sequential"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum RandomAccessBody {
    Buf(Bytes),
    Fs(PathBody),
}

impl RandomAccessBody {
    pub(crate) fn len(&self) -> u64 {
        match self {
            RandomAccessBody::Buf(buf) => buf.len() as u64,
            RandomAccessBody::Fs(path_body) => path_body.length,
        }
    }

    /// Read `range` of the body. Buffers are sliced without copying.
    pub(crate) async fn read_range(&self, range: Range<u64>) -> Result<Bytes, io::Error> {
        match self {
            RandomAccessBody::Buf(buf) => {
                if range.end > buf.len() as u64 || range.start > range.end {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("range {range:?} is out of bounds for {} bytes", buf.len()),
                    ));
                }
                Ok(buf.slice(range.start as usize..range.end as usize))
            }
            RandomAccessBody::Fs(path_body) => path_body.read_range(range).await,
        }
    }
}

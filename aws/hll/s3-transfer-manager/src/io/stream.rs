/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::default::Default;
use std::fmt;
use std::path::Path;

use bytes::{Buf, Bytes};
use tokio::io::AsyncRead;

use crate::io::error::Error;
use crate::io::path_body::PathBody;
use crate::io::path_body::PathBodyBuilder;
use crate::io::size_hint::SizeHint;
use crate::io::{RandomAccessBody, TransferSource};

/// Source of binary data.
///
/// `InputStream` wraps a stream of data for ease of use. In-memory buffers and files are
/// random access: parts are read on demand by whichever worker uploads them. Streams created
/// with [`InputStream::from_reader`] are sequential: bytes are read once, in order, and
/// buffered part by part.
#[derive(Debug)]
pub struct InputStream {
    pub(super) inner: RawInputStream,
}

impl InputStream {
    /// Create a new `InputStream` from a static byte slice
    pub fn from_static(bytes: &'static [u8]) -> Self {
        let inner = RawInputStream::Buf(bytes.into());
        Self { inner }
    }

    /// Create a sequential-only `InputStream` from an async reader of unknown length.
    ///
    /// Parts are buffered in memory as they are read, at most `concurrency` at a time.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            inner: RawInputStream::Reader(ReaderBody(Box::new(reader))),
        }
    }

    /// Return the bounds on the remaining length of the `InputStream`
    pub fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }

    /// True if arbitrary byte ranges of this stream can be read any number of times
    pub fn is_random_access(&self) -> bool {
        !matches!(self.inner, RawInputStream::Reader(_))
    }

    /// Returns a [`PathBodyBuilder`], allowing you to build a `InputStream` with
    /// full control over how the file is read (eg. specifying the length of
    /// the file or the starting offset to read from).
    ///
    /// ```no_run
    /// # {
    /// use s3_transfer_manager::io::InputStream;
    ///
    /// fn input_stream_from_file() -> InputStream {
    ///     let stream = InputStream::read_from()
    ///         .path("docs/some-large-file.csv")
    ///         // Specify the length of the file used (skips an additional call to retrieve the size)
    ///         .length(123_456)
    ///         .build()
    ///         .expect("valid path");
    ///     stream
    /// }
    /// # }
    /// ```
    pub fn read_from() -> PathBodyBuilder {
        PathBodyBuilder::new()
    }

    /// Create a new `InputStream` that reads data from a given `path`.
    ///
    /// ## Warning
    /// The contents of the file MUST not change. The length of the file is captured up front
    /// and parts are read independently, possibly out of order.
    ///
    /// # Examples
    /// ```no_run
    /// use s3_transfer_manager::io::InputStream;
    /// fn make_stream() -> InputStream {
    ///     InputStream::from_path("docs/rows.csv").expect("file should be readable")
    /// }
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Result<InputStream, Error> {
        Self::read_from().path(path).build()
    }

    pub(crate) fn into_source(self) -> TransferSource {
        match self.inner {
            RawInputStream::Buf(buf) => TransferSource::RandomAccess(RandomAccessBody::Buf(buf)),
            RawInputStream::Fs(path_body) => {
                TransferSource::RandomAccess(RandomAccessBody::Fs(path_body))
            }
            RawInputStream::Reader(reader) => TransferSource::Sequential(reader.0),
        }
    }
}

#[derive(Debug)]
pub(super) enum RawInputStream {
    /// In-memory buffer to read from
    Buf(Bytes),
    /// File based input
    Fs(PathBody),
    /// Sequential reader of unknown length
    Reader(ReaderBody),
}

impl RawInputStream {
    pub(super) fn size_hint(&self) -> SizeHint {
        match self {
            RawInputStream::Buf(bytes) => SizeHint::exact(bytes.remaining() as u64),
            RawInputStream::Fs(path_body) => SizeHint::exact(path_body.length),
            RawInputStream::Reader(_) => SizeHint::unknown(),
        }
    }
}

pub(super) struct ReaderBody(pub(super) Box<dyn AsyncRead + Send + Unpin>);

impl fmt::Debug for ReaderBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderBody").finish_non_exhaustive()
    }
}

impl Default for InputStream {
    fn default() -> Self {
        Self {
            inner: RawInputStream::Buf(Bytes::default()),
        }
    }
}

impl From<Bytes> for InputStream {
    fn from(value: Bytes) -> Self {
        Self {
            inner: RawInputStream::Buf(value),
        }
    }
}

impl From<Vec<u8>> for InputStream {
    fn from(value: Vec<u8>) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<&'static [u8]> for InputStream {
    fn from(slice: &'static [u8]) -> InputStream {
        Self::from(Bytes::from_static(slice))
    }
}

impl From<&'static str> for InputStream {
    fn from(slice: &'static str) -> InputStream {
        Self::from(Bytes::from_static(slice.as_bytes()))
    }
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::io::error::{Error, ErrorKind};
use crate::io::stream::{InputStream, RawInputStream};
use bytes::Bytes;
use std::fs;
use std::io::{self, SeekFrom};
use std::ops::Range;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Input stream designed to wrap file based input.
#[derive(Debug, Clone)]
pub(crate) struct PathBody {
    // The path to the file
    pub(crate) path: PathBuf,
    // The total number of bytes to read
    pub(crate) length: u64,
    // The byte-offset to start reading from
    pub(crate) offset: u64,
}

impl PathBody {
    /// Read `range` (relative to this body's offset) from the file.
    ///
    /// Each call opens its own handle so that parts can be read concurrently.
    pub(crate) async fn read_range(&self, range: Range<u64>) -> Result<Bytes, io::Error> {
        if range.end > self.length {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "range {range:?} is out of bounds for a body of {} bytes",
                    self.length
                ),
            ));
        }

        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(SeekFrom::Start(self.offset + range.start)).await?;
        let mut buf = vec![0; (range.end - range.start) as usize];
        file.read_exact(&mut buf).await?;
        Ok(Bytes::from(buf))
    }
}

/// Builder for creating [`InputStream`](InputStream) from a file/path.
///
/// ```no_run
/// # {
/// use s3_transfer_manager::io::InputStream;
///
/// fn input_stream_from_file() -> InputStream {
///     let stream = InputStream::read_from()
///         .path("docs/some-large-file.csv")
///         .build()
///         .expect("valid path");
///     stream
/// }
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PathBodyBuilder {
    path: Option<PathBuf>,
    length: Option<u64>,
    offset: Option<u64>,
}

impl PathBodyBuilder {
    /// Create a new [`PathBodyBuilder`].
    ///
    /// You must call [`path`](PathBodyBuilder::path) to specify what to read from.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the path to read from.
    pub fn path(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Specify the offset to start reading from (in bytes)
    ///
    /// When used in conjunction with [`length`](PathBodyBuilder::length), allows for reading a single "chunk" of a file.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Specify the length to read (in bytes).
    ///
    /// By pre-specifying the length, this API skips an additional call to retrieve the size from file-system metadata.
    ///
    /// <div class="warning">
    /// Setting the length manually will trigger no validation related to any offset provided or the actual size of
    /// the file. A length larger than the file makes the transfer fail when the missing bytes are read.
    /// </div>
    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    /// Returns a [`InputStream`] from this builder.
    pub fn build(self) -> Result<InputStream, Error> {
        let path = self.path.ok_or(ErrorKind::MissingPath)?;
        let offset = self.offset.unwrap_or_default();

        let length = match self.length {
            None => {
                let file_size = fs::metadata(&path)?.len();

                if offset > file_size {
                    return Err(ErrorKind::OffsetGreaterThanFileSize { offset, file_size }.into());
                }

                file_size - offset
            }
            Some(explicit) => explicit,
        };

        let body = PathBody {
            path,
            length,
            offset,
        };

        Ok(InputStream {
            inner: RawInputStream::Fs(body),
        })
    }
}

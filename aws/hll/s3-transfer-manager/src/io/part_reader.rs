/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Data for a single part
#[derive(Debug, Clone)]
pub(crate) struct PartData {
    pub(crate) data: Bytes,
    pub(crate) part_number: u64,
}

/// Splits a sequential reader into numbered parts.
///
/// Every part except the last is exactly `part_size` bytes. The reader only learns the
/// total length once the underlying stream is exhausted.
pub(crate) struct PartReader {
    reader: Box<dyn AsyncRead + Send + Unpin>,
    part_size: usize,
    next_part_number: u64,
    done: bool,
}

impl PartReader {
    pub(crate) fn new(reader: Box<dyn AsyncRead + Send + Unpin>, part_size: usize) -> Self {
        Self {
            reader,
            part_size,
            next_part_number: 1,
            done: false,
        }
    }

    /// Request the next part of data.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    pub(crate) async fn next_part(&mut self) -> Result<Option<PartData>, io::Error> {
        if self.done {
            return Ok(None);
        }

        let mut buf = Vec::with_capacity(self.part_size);
        (&mut self.reader)
            .take(self.part_size as u64)
            .read_to_end(&mut buf)
            .await?;

        if buf.len() < self.part_size {
            self.done = true;
        }
        if buf.is_empty() {
            return Ok(None);
        }

        let part_number = self.next_part_number;
        self.next_part_number += 1;
        Ok(Some(PartData {
            data: Bytes::from(buf),
            part_number,
        }))
    }
}

impl fmt::Debug for PartReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartReader")
            .field("part_size", &self.part_size)
            .field("next_part_number", &self.next_part_number)
            .field("done", &self.done)
            .finish()
    }
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io::{self, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

/// Random-access destination for downloaded data.
///
/// Parts complete in any order; each one is written at its own offset.
pub trait TransferSink: Send + Sync + std::fmt::Debug {
    /// Write `data` starting at `offset`.
    fn write_at(&self, offset: u64, data: Bytes) -> BoxFuture<'_, Result<(), io::Error>>;
}

/// [`TransferSink`] writing to a file on disk.
#[derive(Debug)]
pub struct FileSink {
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl FileSink {
    /// Create (or truncate) the file at `path`
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self::from(file))
    }

    /// Flush buffered data to disk
    pub async fn sync_all(&self) -> Result<(), io::Error> {
        let file = self.file.lock().await;
        file.sync_all().await
    }
}

impl From<tokio::fs::File> for FileSink {
    fn from(file: tokio::fs::File) -> Self {
        Self {
            file: tokio::sync::Mutex::new(file),
        }
    }
}

impl TransferSink for FileSink {
    fn write_at(&self, offset: u64, data: Bytes) -> BoxFuture<'_, Result<(), io::Error>> {
        async move {
            let mut file = self.file.lock().await;
            file.seek(SeekFrom::Start(offset)).await?;
            file.write_all(&data).await?;
            file.flush().await
        }
        .boxed()
    }
}

/// [`TransferSink`] collecting data into a growable in-memory buffer.
///
/// Gaps left by parts that were never written read back as zeroes.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Mutex<Vec<u8>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the bytes written so far
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of bytes spanned by the writes so far
    pub fn len(&self) -> usize {
        self.buf.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TransferSink for MemorySink {
    fn write_at(&self, offset: u64, data: Bytes) -> BoxFuture<'_, Result<(), io::Error>> {
        let result = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds memory"))
            .map(|start| {
                let mut buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
                let end = start + data.len();
                if buf.len() < end {
                    buf.resize(end, 0);
                }
                buf[start..end].copy_from_slice(&data);
            });
        futures_util::future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSink, MemorySink, TransferSink};
    use bytes::Bytes;

    #[tokio::test]
    async fn test_memory_sink_out_of_order() {
        let sink = MemorySink::new();
        sink.write_at(5, Bytes::from_static(b"world")).await.unwrap();
        sink.write_at(0, Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(b"helloworld".to_vec(), sink.to_vec());
    }

    #[tokio::test]
    async fn test_file_sink_out_of_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let sink = FileSink::create(&path).await.unwrap();
        sink.write_at(6, Bytes::from_static(b"sink")).await.unwrap();
        sink.write_at(0, Bytes::from_static(b"file ")).await.unwrap();
        sink.write_at(5, Bytes::from_static(b" ")).await.unwrap();
        sink.sync_all().await.unwrap();

        assert_eq!(b"file  sink".to_vec(), std::fs::read(&path).unwrap());
    }
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use s3_transfer_manager::download::DownloadRequest;
use s3_transfer_manager::error::{OperationError, TransferError};
use s3_transfer_manager::io::{FileSink, MemorySink};
use s3_transfer_manager::planner::MIN_PART_SIZE;
use s3_transfer_manager::test_util::InMemoryStore;
use s3_transfer_manager::types::{ConcurrencySetting, TargetPartSize};
use s3_transfer_manager::{Client, Config};
use tokio_util::sync::CancellationToken;

const PART_SIZE: u64 = MIN_PART_SIZE;

fn client(store: &Arc<InMemoryStore>, concurrency: usize) -> Client {
    let config = Config::builder()
        .part_size(TargetPartSize::Explicit(PART_SIZE))
        .concurrency(ConcurrencySetting::Explicit(concurrency))
        .build();
    Client::new(store.clone(), config)
}

fn seeded_store(len: u64) -> (Arc<InMemoryStore>, Bytes) {
    let data: Bytes = (0..len)
        .map(|i| (i % 239) as u8)
        .collect::<Vec<_>>()
        .into();
    let store = InMemoryStore::new().into_shared();
    store.put("test-bucket", "test-key", data.clone());
    (store, data)
}

fn request() -> DownloadRequest {
    DownloadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_download_whole_object() {
    let (store, data) = seeded_store(3 * PART_SIZE + 123);
    let sink = Arc::new(MemorySink::new());

    let resp = client(&store, 2)
        .download(request(), sink.clone())
        .await
        .unwrap();

    assert_eq!(data.len() as u64, resp.bytes_written());
    assert_eq!(data.len() as u64, resp.object_size());
    assert_eq!(data.to_vec(), sink.to_vec());

    let mut gets = store.get_calls();
    assert_eq!(0..=PART_SIZE - 1, gets[0]);
    gets.sort_by_key(|r| *r.start());
    let starts: Vec<_> = gets.iter().map(|r| *r.start()).collect();
    assert_eq!(vec![0, PART_SIZE, 2 * PART_SIZE, 3 * PART_SIZE], starts);
}

#[tokio::test]
async fn test_download_object_smaller_than_a_part() {
    let (store, data) = seeded_store(100);
    let sink = Arc::new(MemorySink::new());

    let resp = client(&store, 2)
        .download(request(), sink.clone())
        .await
        .unwrap();

    assert_eq!(100, resp.bytes_written());
    assert_eq!(data.to_vec(), sink.to_vec());
    assert_eq!(1, store.get_calls().len());
}

#[tokio::test]
async fn test_download_empty_object() {
    let (store, _) = seeded_store(0);
    let sink = Arc::new(MemorySink::new());

    let resp = client(&store, 2)
        .download(request(), sink.clone())
        .await
        .unwrap();

    assert_eq!(0, resp.bytes_written());
    assert_eq!(0, resp.object_size());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_download_inclusive_range() {
    let (store, data) = seeded_store(3 * PART_SIZE);
    let (start, end) = (100, PART_SIZE + 200);
    let req = DownloadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .range(format!("bytes={start}-{end}"))
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());

    let resp = client(&store, 2).download(req, sink.clone()).await.unwrap();

    assert_eq!(end - start + 1, resp.bytes_written());
    assert_eq!(3 * PART_SIZE, resp.object_size());
    assert_eq!(
        &data[start as usize..=end as usize],
        &sink.to_vec()[..]
    );
}

#[tokio::test]
async fn test_download_suffix_range() {
    let (store, data) = seeded_store(PART_SIZE + 10);
    let req = DownloadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .range("bytes=-50")
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());

    let resp = client(&store, 2).download(req, sink.clone()).await.unwrap();

    assert_eq!(50, resp.bytes_written());
    assert_eq!(&data[data.len() - 50..], &sink.to_vec()[..]);
    // size probe, then the suffix itself
    assert_eq!(0..=0, store.get_calls()[0]);
    assert_eq!(2, store.get_calls().len());
}

#[tokio::test]
async fn test_download_with_known_size() {
    let (store, data) = seeded_store(2 * PART_SIZE + 7);
    let req = DownloadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .object_size(data.len() as u64)
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());

    let resp = client(&store, 3).download(req, sink.clone()).await.unwrap();

    assert_eq!(data.len() as u64, resp.bytes_written());
    assert_eq!(data.to_vec(), sink.to_vec());
    assert_eq!(3, store.get_calls().len());
}

#[tokio::test]
async fn test_partial_failure_reports_bytes_written() {
    let (store, _) = seeded_store(4 * PART_SIZE);
    store.fail_get_at(2 * PART_SIZE);
    let sink = Arc::new(MemorySink::new());

    let err = client(&store, 1)
        .download(request(), sink.clone())
        .await
        .unwrap_err();

    assert_eq!(Some(2 * PART_SIZE), err.bytes_written());
    assert!(
        matches!(
            err.root_cause(),
            TransferError::PartFailed { part_number: 3, .. }
        ),
        "{err:?}"
    );
    // nothing is requested after the failure
    assert_eq!(3, store.get_calls().len());
    assert_eq!(2 * PART_SIZE as usize, sink.len());
}

#[tokio::test]
async fn test_short_read_fails_the_part() {
    let (store, _) = seeded_store(2 * PART_SIZE);
    store.short_get_at(PART_SIZE);
    let sink = Arc::new(MemorySink::new());

    let err = client(&store, 2)
        .download(request(), sink)
        .await
        .unwrap_err();

    assert_eq!(Some(PART_SIZE), err.bytes_written());
    match err.root_cause() {
        TransferError::PartFailed {
            part_number: 2,
            source: OperationError::Io(e),
        } => assert_eq!(io::ErrorKind::UnexpectedEof, e.kind()),
        other => panic!("unexpected root cause: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_object() {
    let store = InMemoryStore::new().into_shared();
    let sink = Arc::new(MemorySink::new());

    let err = client(&store, 2)
        .download(request(), sink)
        .await
        .unwrap_err();

    assert_eq!(Some(0), err.bytes_written());
    match err.root_cause() {
        TransferError::PartFailed {
            part_number: 1,
            source: OperationError::Store(e),
        } => assert_eq!(Some("NoSuchKey"), e.code()),
        other => panic!("unexpected root cause: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_download_respects_concurrency() {
    let store = InMemoryStore::new()
        .with_delay(Duration::from_millis(20))
        .into_shared();
    let data = Bytes::from(vec![7u8; 6 * PART_SIZE as usize]);
    store.put("test-bucket", "test-key", data.clone());
    let sink = Arc::new(MemorySink::new());

    client(&store, 3)
        .download(request(), sink.clone())
        .await
        .unwrap();

    assert!(store.max_in_flight() <= 3, "{}", store.max_in_flight());
    assert_eq!(data.to_vec(), sink.to_vec());
}

#[tokio::test]
async fn test_download_to_file() {
    let (store, data) = seeded_store(2 * PART_SIZE + 17);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("object");
    let sink = Arc::new(FileSink::create(&path).await.unwrap());

    client(&store, 4)
        .download(request(), sink.clone())
        .await
        .unwrap();
    sink.sync_all().await.unwrap();

    assert_eq!(data.to_vec(), std::fs::read(&path).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_download_keeps_in_flight_ranges() {
    let store = InMemoryStore::new()
        .with_delay(Duration::from_millis(100))
        .into_shared();
    store.put(
        "test-bucket",
        "test-key",
        Bytes::from(vec![3u8; 6 * PART_SIZE as usize]),
    );
    let token = CancellationToken::new();
    let req = DownloadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .cancellation_token(token.clone())
        .build()
        .unwrap();
    let sink = Arc::new(MemorySink::new());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        token.cancel();
    });
    let err = client(&store, 2)
        .download(req, sink.clone())
        .await
        .unwrap_err();
    canceller.await.unwrap();

    // first chunk, two ranges before the cancel, two in flight when it fired
    assert_eq!(5, store.get_calls().len());
    assert_eq!(Some(5 * PART_SIZE), err.bytes_written());
    assert!(matches!(err.root_cause(), TransferError::Cancelled), "{err:?}");
    assert_eq!(5 * PART_SIZE as usize, sink.len());
}

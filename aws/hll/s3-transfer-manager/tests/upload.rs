/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use s3_transfer_manager::config::TransferOverrides;
use s3_transfer_manager::error::{OperationError, TransferError};
use s3_transfer_manager::io::InputStream;
use s3_transfer_manager::planner::MIN_PART_SIZE;
use s3_transfer_manager::test_util::InMemoryStore;
use s3_transfer_manager::types::{ConcurrencySetting, TargetPartSize};
use s3_transfer_manager::upload::UploadRequest;
use s3_transfer_manager::{Client, Config};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::CancellationToken;

const PART_SIZE: u64 = MIN_PART_SIZE;

fn client(store: &Arc<InMemoryStore>, concurrency: usize) -> Client {
    let config = Config::builder()
        .part_size(TargetPartSize::Explicit(PART_SIZE))
        .concurrency(ConcurrencySetting::Explicit(concurrency))
        .build();
    Client::new(store.clone(), config)
}

fn object(len: u64) -> Bytes {
    (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
}

fn request(body: impl Into<InputStream>) -> UploadRequest {
    UploadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .body(body.into())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_small_object_uses_single_request() {
    let store = InMemoryStore::new().into_shared();
    let data = object(1024);

    let resp = client(&store, 4).upload(request(data.clone())).await.unwrap();

    assert_eq!(None, resp.upload_id());
    assert_eq!(1, resp.part_count());
    assert_eq!(1024, resp.content_length());
    assert_eq!(1, store.put_calls());
    assert_eq!(0, store.open_uploads());
    assert_eq!(Some(data), store.object("test-bucket", "test-key"));
}

#[tokio::test(start_paused = true)]
async fn test_multipart_completes_in_order_within_concurrency() {
    let store = InMemoryStore::new()
        .with_delay(Duration::from_millis(50))
        .into_shared();
    let data = object(3 * PART_SIZE + 123);

    let resp = client(&store, 2).upload(request(data.clone())).await.unwrap();

    assert_eq!(Some("upload-1"), resp.upload_id());
    assert_eq!(4, resp.part_count());
    assert_eq!(data.len() as u64, resp.content_length());
    assert_eq!(vec![vec![1, 2, 3, 4]], store.complete_calls());
    assert!(store.max_in_flight() <= 2, "{}", store.max_in_flight());
    assert_eq!(0, store.put_calls());
    assert_eq!(Some(data), store.object("test-bucket", "test-key"));
}

#[tokio::test]
async fn test_part_failure_aborts_upload() {
    let store = InMemoryStore::new().into_shared();
    store.fail_part(2);

    let err = client(&store, 1)
        .upload(request(object(3 * PART_SIZE)))
        .await
        .unwrap_err();

    let upload_id = err.upload_id().expect("multipart failure").to_string();
    assert!(err.abort_error().is_none());
    assert!(
        matches!(
            err.root_cause(),
            TransferError::PartFailed { part_number: 2, .. }
        ),
        "{err:?}"
    );
    assert_eq!(1, store.abort_calls());
    assert_eq!(None, store.list_parts(&upload_id));
    assert_eq!(0, store.open_uploads());
    assert!(store.complete_calls().is_empty());
    assert_eq!(None, store.object("test-bucket", "test-key"));
}

#[tokio::test]
async fn test_retain_policy_keeps_parts() {
    let store = InMemoryStore::new().into_shared();
    store.fail_part(3);

    let req = UploadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .body(object(3 * PART_SIZE).into())
        .overrides(TransferOverrides::new().leave_parts_on_error(true))
        .build()
        .unwrap();
    let err = client(&store, 1).upload(req).await.unwrap_err();

    let upload_id = err.upload_id().expect("multipart failure");
    assert_eq!(0, store.abort_calls());
    assert_eq!(1, store.open_uploads());
    assert_eq!(Some(vec![1, 2]), store.list_parts(upload_id));
}

#[tokio::test]
async fn test_abort_failure_is_reported() {
    let store = InMemoryStore::new().into_shared();
    store.fail_part(1);
    store.fail_abort();

    let err = client(&store, 2)
        .upload(request(object(2 * PART_SIZE)))
        .await
        .unwrap_err();

    let abort_error = err.abort_error().expect("abort failure attached");
    assert!(abort_error.is_transport());
    assert!(
        matches!(
            err.root_cause(),
            TransferError::PartFailed { part_number: 1, .. }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn test_complete_failure_aborts_upload() {
    let store = InMemoryStore::new().into_shared();
    store.fail_complete();

    let err = client(&store, 4)
        .upload(request(object(2 * PART_SIZE + 1)))
        .await
        .unwrap_err();

    assert!(err.upload_id().is_some());
    assert_eq!(vec![vec![1, 2, 3]], store.complete_calls());
    assert_eq!(1, store.abort_calls());
    assert_eq!(0, store.open_uploads());
    match err.root_cause() {
        TransferError::Operation(OperationError::Store(e)) => {
            assert_eq!(Some("InjectedFailure"), e.code());
        }
        other => panic!("unexpected root cause: {other:?}"),
    }
}

#[tokio::test]
async fn test_create_failure_has_no_upload_id() {
    let store = InMemoryStore::new().into_shared();
    store.fail_create();

    let err = client(&store, 4)
        .upload(request(object(2 * PART_SIZE)))
        .await
        .unwrap_err();

    assert!(
        matches!(err, TransferError::Operation(OperationError::Store(_))),
        "{err:?}"
    );
    assert_eq!(None, err.upload_id());
    assert_eq!(0, store.abort_calls());
}

#[tokio::test]
async fn test_sequential_source_multipart() {
    let store = InMemoryStore::new().into_shared();
    let data = object(2 * PART_SIZE + 5);
    let body = InputStream::from_reader(Cursor::new(data.to_vec()));

    let resp = client(&store, 2).upload(request(body)).await.unwrap();

    assert_eq!(3, resp.part_count());
    assert_eq!(vec![vec![1, 2, 3]], store.complete_calls());
    assert_eq!(Some(data), store.object("test-bucket", "test-key"));
}

#[tokio::test]
async fn test_sequential_source_of_exactly_one_part() {
    let store = InMemoryStore::new().into_shared();
    let data = object(PART_SIZE);
    let body = InputStream::from_reader(Cursor::new(data.to_vec()));

    let resp = client(&store, 2).upload(request(body)).await.unwrap();

    assert_eq!(None, resp.upload_id());
    assert_eq!(1, store.put_calls());
    assert_eq!(0, store.open_uploads());
    assert_eq!(Some(data), store.object("test-bucket", "test-key"));
}

#[tokio::test]
async fn test_empty_sequential_source() {
    let store = InMemoryStore::new().into_shared();
    let body = InputStream::from_reader(Cursor::new(Vec::new()));

    let resp = client(&store, 2).upload(request(body)).await.unwrap();

    assert_eq!(0, resp.content_length());
    assert_eq!(1, store.put_calls());
    assert_eq!(Some(Bytes::new()), store.object("test-bucket", "test-key"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_upload_aborts() {
    let store = InMemoryStore::new()
        .with_delay(Duration::from_millis(100))
        .into_shared();
    let token = CancellationToken::new();
    let req = UploadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .body(object(8 * PART_SIZE).into())
        .cancellation_token(token.clone())
        .build()
        .unwrap();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        token.cancel();
    });
    let err = client(&store, 2).upload(req).await.unwrap_err();
    canceller.await.unwrap();

    assert!(err.upload_id().is_some());
    assert!(matches!(err.root_cause(), TransferError::Cancelled), "{err:?}");
    assert_eq!(1, store.abort_calls());
    assert_eq!(0, store.open_uploads());
    assert!(store.complete_calls().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let store = InMemoryStore::new().into_shared();
    let token = CancellationToken::new();
    token.cancel();
    let req = UploadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .body(object(2 * PART_SIZE).into())
        .cancellation_token(token)
        .build()
        .unwrap();

    let err = client(&store, 2).upload(req).await.unwrap_err();

    assert!(matches!(err, TransferError::Cancelled), "{err:?}");
    assert_eq!(0, store.open_uploads());
    assert_eq!(0, store.put_calls());
}

#[tokio::test]
async fn test_invalid_part_size_rejected_before_any_request() {
    let store = InMemoryStore::new().into_shared();
    let req = UploadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .body(object(10).into())
        .overrides(TransferOverrides::new().part_size(TargetPartSize::Explicit(1024)))
        .build()
        .unwrap();

    let err = client(&store, 2).upload(req).await.unwrap_err();

    assert!(matches!(err, TransferError::InvalidConfiguration(_)), "{err:?}");
    assert_eq!(0, store.put_calls());
}

#[tokio::test]
async fn test_config_changes_apply_to_later_transfers() {
    let store = InMemoryStore::new().into_shared();
    let client = client(&store, 2);
    client.upload(request(object(2 * PART_SIZE))).await.unwrap();
    assert_eq!(vec![vec![1, 2]], store.complete_calls());

    client.set_config(
        Config::builder()
            .part_size(TargetPartSize::Explicit(2 * PART_SIZE))
            .build(),
    );
    assert_eq!(2 * PART_SIZE, client.config().part_size().bytes());
    client.upload(request(object(2 * PART_SIZE))).await.unwrap();

    // now fits in a single part
    assert_eq!(1, store.complete_calls().len());
    assert_eq!(1, store.put_calls());
}

#[tokio::test]
#[tracing_test::traced_test]
async fn test_upload_logs_completion() {
    let store = InMemoryStore::new().into_shared();
    client(&store, 2)
        .upload(request(object(PART_SIZE + 1)))
        .await
        .unwrap();
    assert!(logs_contain("multipart upload complete"));
}

/// Yields `remaining` bytes, then fails every read
struct FailingReader {
    remaining: usize,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.remaining == 0 {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "source read failed",
            )));
        }
        let n = buf.remaining().min(self.remaining);
        buf.put_slice(&vec![1u8; n]);
        self.remaining -= n;
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_source_read_failure_aborts_upload() {
    let store = InMemoryStore::new().into_shared();
    let body = InputStream::from_reader(FailingReader {
        remaining: 3 * PART_SIZE as usize,
    });

    let err = client(&store, 2).upload(request(body)).await.unwrap_err();

    assert!(err.upload_id().is_some(), "{err:?}");
    assert!(err.abort_error().is_none());
    assert_eq!(1, store.abort_calls());
    assert_eq!(0, store.open_uploads());
    assert!(store.complete_calls().is_empty());
    match err.root_cause() {
        TransferError::Operation(OperationError::Io(e)) => {
            assert_eq!(io::ErrorKind::ConnectionReset, e.kind());
        }
        other => panic!("unexpected root cause: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_config_change_not_observed_by_in_flight_upload() {
    let store = InMemoryStore::new()
        .with_delay(Duration::from_millis(100))
        .into_shared();
    let client = client(&store, 1);

    let (resp, _) = tokio::join!(client.upload(request(object(4 * PART_SIZE))), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.set_config(
            Config::builder()
                .part_size(TargetPartSize::Explicit(8 * PART_SIZE))
                .concurrency(ConcurrencySetting::Explicit(7))
                .build(),
        );
    });

    let resp = resp.unwrap();
    assert_eq!(4, resp.part_count());
    assert_eq!(vec![vec![1, 2, 3, 4]], store.complete_calls());
    assert_eq!(1, store.max_in_flight());
    assert_eq!(8 * PART_SIZE, client.config().part_size().bytes());
}

fn assert_send<T: Send>(_: &T) {}

#[test]
fn test_transfer_futures_are_send() {
    let store = InMemoryStore::new().into_shared();
    let client = client(&store, 2);

    let sequential = request(InputStream::from_reader(Cursor::new(vec![0u8; 16])));
    assert_send(&client.upload(sequential));

    let download = s3_transfer_manager::download::DownloadRequest::builder()
        .bucket("test-bucket")
        .key("test-key")
        .build()
        .unwrap();
    let sink = Arc::new(s3_transfer_manager::io::MemorySink::new());
    assert_send(&client.download(download, sink));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_uploads_on_spawned_tasks() {
    let store = InMemoryStore::new().into_shared();
    let client = client(&store, 2);

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..4u64 {
        let client = client.clone();
        tasks.spawn(async move {
            let req = UploadRequest::builder()
                .bucket("test-bucket")
                .key(format!("key-{i}"))
                .body(InputStream::from_reader(Cursor::new(
                    object(2 * PART_SIZE + i).to_vec(),
                )))
                .build()
                .unwrap();
            client.upload(req).await
        });
    }
    while let Some(result) = tasks.join_next().await {
        assert_eq!(3, result.unwrap().unwrap().part_count());
    }

    assert_eq!(4, store.complete_calls().len());
    assert_eq!(0, store.open_uploads());
    for i in 0..4u64 {
        assert_eq!(
            Some(object(2 * PART_SIZE + i)),
            store.object("test-bucket", &format!("key-{i}"))
        );
    }
}

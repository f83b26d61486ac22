/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! In-memory [`ObjectStore`] with failure injection, for tests.
//!
//! Uploads, parts and objects live in process memory. Individual operations can be made
//! to fail, delayed, or instrumented to observe how many part operations run at once.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::store::{
    CompletedPart, GetRangeOutput, ObjectPath, ObjectStore, PutObjectOutput, RegionProbe,
    StoreError,
};

#[derive(Debug, Default)]
struct State {
    objects: HashMap<ObjectPath, Bytes>,
    uploads: HashMap<String, Upload>,
    next_upload_id: u64,
    get_calls: Vec<RangeInclusive<u64>>,
    put_calls: usize,
    abort_calls: usize,
    complete_calls: Vec<Vec<u64>>,
    bucket_regions: HashMap<String, String>,
    probed_regions: Vec<String>,
    failures: Failures,
}

#[derive(Debug)]
struct Upload {
    destination: ObjectPath,
    parts: BTreeMap<u64, Bytes>,
}

#[derive(Debug, Default)]
struct Failures {
    create: bool,
    complete: bool,
    abort: bool,
    parts: HashSet<u64>,
    gets_at: HashSet<u64>,
    short_gets_at: HashSet<u64>,
    probe_regions: HashSet<String>,
}

/// Tracks simultaneous part operations
#[derive(Debug, Default)]
struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

struct InFlightGuard<'a>(&'a InFlight);

impl InFlight {
    fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory object store for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    in_flight: InFlight,
    delay: Option<Duration>,
    region: Option<String>,
    region_hints: bool,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every part operation (upload part, ranged get) by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Region reported by [`ObjectStore::region`]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Report the owning region when a bucket is probed in the wrong one
    pub fn with_region_hints(mut self, region_hints: bool) -> Self {
        self.region_hints = region_hints;
        self
    }

    /// Wrap the store for use with a [`Client`](crate::Client)
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store an object directly
    pub fn put(&self, bucket: &str, key: &str, data: Bytes) {
        self.state()
            .objects
            .insert(ObjectPath::new(bucket, key), data);
    }

    /// Contents of an object, if it exists
    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state()
            .objects
            .get(&ObjectPath::new(bucket, key))
            .cloned()
    }

    /// Part numbers uploaded under `upload_id`, or `None` if the upload does not exist
    /// (never created, completed, or aborted).
    pub fn list_parts(&self, upload_id: &str) -> Option<Vec<u64>> {
        self.state()
            .uploads
            .get(upload_id)
            .map(|u| u.parts.keys().copied().collect())
    }

    /// Number of multipart uploads that are neither completed nor aborted
    pub fn open_uploads(&self) -> usize {
        self.state().uploads.len()
    }

    /// Ranges requested through [`ObjectStore::get_object_range`], in call order
    pub fn get_calls(&self) -> Vec<RangeInclusive<u64>> {
        self.state().get_calls.clone()
    }

    /// Number of successful single request uploads
    pub fn put_calls(&self) -> usize {
        self.state().put_calls
    }

    /// Number of abort requests received
    pub fn abort_calls(&self) -> usize {
        self.state().abort_calls
    }

    /// Part numbers passed to each complete request, in call order
    pub fn complete_calls(&self) -> Vec<Vec<u64>> {
        self.state().complete_calls.clone()
    }

    /// Highest number of part operations observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.in_flight.max.load(Ordering::SeqCst)
    }

    /// Place `bucket` in `region`
    pub fn set_bucket_region(&self, bucket: &str, region: &str) {
        self.state()
            .bucket_regions
            .insert(bucket.to_string(), region.to_string());
    }

    /// Regions probed so far, in call order
    pub fn probed_regions(&self) -> Vec<String> {
        self.state().probed_regions.clone()
    }

    /// Fail creating multipart uploads
    pub fn fail_create(&self) {
        self.state().failures.create = true;
    }

    /// Fail uploading `part_number`
    pub fn fail_part(&self, part_number: u64) {
        self.state().failures.parts.insert(part_number);
    }

    /// Fail completing multipart uploads
    pub fn fail_complete(&self) {
        self.state().failures.complete = true;
    }

    /// Fail aborting multipart uploads (with a transport error)
    pub fn fail_abort(&self) {
        self.state().failures.abort = true;
    }

    /// Fail ranged gets starting at `offset`
    pub fn fail_get_at(&self, offset: u64) {
        self.state().failures.gets_at.insert(offset);
    }

    /// Return one byte less than requested for ranged gets starting at `offset`
    pub fn short_get_at(&self, offset: u64) {
        self.state().failures.short_gets_at.insert(offset);
    }

    /// Fail probes against `region` with a transport error
    pub fn fail_probe_in(&self, region: &str) {
        self.state()
            .failures
            .probe_regions
            .insert(region.to_string());
    }

    async fn part_delay(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn injected(operation: &str) -> StoreError {
    StoreError::service("InjectedFailure", format!("{operation} failed on purpose"))
}

fn no_such_upload(upload_id: &str) -> StoreError {
    StoreError::service("NoSuchUpload", format!("upload `{upload_id}` does not exist"))
}

fn complete_upload(
    state: &mut State,
    dest: &ObjectPath,
    upload_id: &str,
    parts: &[CompletedPart],
) -> Result<PutObjectOutput, StoreError> {
    if state.failures.complete {
        return Err(injected("CompleteMultipartUpload"));
    }
    if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
        return Err(StoreError::service(
            "InvalidPartOrder",
            "parts must be in ascending order",
        ));
    }
    let upload = state
        .uploads
        .remove(upload_id)
        .ok_or_else(|| no_such_upload(upload_id))?;
    let mut object = BytesMut::new();
    for part in parts {
        let data = upload.parts.get(&part.part_number).ok_or_else(|| {
            StoreError::service("InvalidPart", format!("part {} missing", part.part_number))
        })?;
        object.extend_from_slice(data);
    }
    state.objects.insert(upload.destination, object.freeze());
    Ok(PutObjectOutput {
        location: Some(format!("memory://{dest}")),
        e_tag: Some(format!("\"{upload_id}-{}\"", parts.len())),
        version_id: None,
    })
}

impl ObjectStore for InMemoryStore {
    fn create_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        let mut state = self.state();
        let result = if state.failures.create {
            Err(injected("CreateMultipartUpload"))
        } else {
            state.next_upload_id += 1;
            let upload_id = format!("upload-{}", state.next_upload_id);
            state.uploads.insert(
                upload_id.clone(),
                Upload {
                    destination: dest.clone(),
                    parts: BTreeMap::new(),
                },
            );
            Ok(upload_id)
        };
        futures_util::future::ready(result).boxed()
    }

    fn upload_part<'a>(
        &'a self,
        _dest: &'a ObjectPath,
        upload_id: &'a str,
        part_number: u64,
        data: Bytes,
    ) -> BoxFuture<'a, Result<CompletedPart, StoreError>> {
        async move {
            let _guard = self.in_flight.enter();
            self.part_delay().await;

            let mut state = self.state();
            if state.failures.parts.contains(&part_number) {
                return Err(injected("UploadPart"));
            }
            let upload = state
                .uploads
                .get_mut(upload_id)
                .ok_or_else(|| no_such_upload(upload_id))?;
            let e_tag = format!("\"{upload_id}-{part_number}-{}\"", data.len());
            upload.parts.insert(part_number, data);
            Ok(CompletedPart { part_number, e_tag })
        }
        .boxed()
    }

    fn complete_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
        upload_id: &'a str,
        parts: Vec<CompletedPart>,
    ) -> BoxFuture<'a, Result<PutObjectOutput, StoreError>> {
        let mut state = self.state();
        state
            .complete_calls
            .push(parts.iter().map(|p| p.part_number).collect());

        let result = complete_upload(&mut state, dest, upload_id, &parts);
        drop(state);
        futures_util::future::ready(result).boxed()
    }

    fn abort_multipart_upload<'a>(
        &'a self,
        _dest: &'a ObjectPath,
        upload_id: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        let mut state = self.state();
        state.abort_calls += 1;
        let result = if state.failures.abort {
            Err(StoreError::transport("connection reset during abort"))
        } else {
            state
                .uploads
                .remove(upload_id)
                .map(|_| ())
                .ok_or_else(|| no_such_upload(upload_id))
        };
        drop(state);
        futures_util::future::ready(result).boxed()
    }

    fn put_object<'a>(
        &'a self,
        dest: &'a ObjectPath,
        data: Bytes,
    ) -> BoxFuture<'a, Result<PutObjectOutput, StoreError>> {
        let mut state = self.state();
        state.put_calls += 1;
        state.objects.insert(dest.clone(), data);
        drop(state);
        futures_util::future::ready(Ok(PutObjectOutput {
            location: Some(format!("memory://{dest}")),
            e_tag: Some("\"single\"".to_string()),
            version_id: None,
        }))
        .boxed()
    }

    fn get_object_range<'a>(
        &'a self,
        src: &'a ObjectPath,
        range: RangeInclusive<u64>,
    ) -> BoxFuture<'a, Result<GetRangeOutput, StoreError>> {
        async move {
            let _guard = self.in_flight.enter();
            self.part_delay().await;

            let mut state = self.state();
            state.get_calls.push(range.clone());
            let start = *range.start();
            if state.failures.gets_at.contains(&start) {
                return Err(injected("GetObject"));
            }
            let object = state
                .objects
                .get(src)
                .cloned()
                .ok_or_else(|| StoreError::service("NoSuchKey", format!("{src} does not exist")))?;

            let total_size = object.len() as u64;
            let begin = start.min(total_size) as usize;
            let mut end = range.end().saturating_add(1).min(total_size) as usize;
            if state.failures.short_gets_at.contains(&start) && end > begin {
                end -= 1;
            }
            Ok(GetRangeOutput {
                data: object.slice(begin..end.max(begin)),
                total_size,
            })
        }
        .boxed()
    }

    fn probe_bucket_region<'a>(
        &'a self,
        bucket: &'a str,
        region: &'a str,
    ) -> BoxFuture<'a, Result<RegionProbe, StoreError>> {
        let mut state = self.state();
        state.probed_regions.push(region.to_string());
        let result = if state.failures.probe_regions.contains(region) {
            Err(StoreError::transport(format!("could not connect to {region}")))
        } else {
            Ok(match state.bucket_regions.get(bucket) {
                Some(actual) if actual == region => RegionProbe::Found {
                    region_hint: self.region_hints.then(|| actual.clone()),
                },
                Some(actual) if self.region_hints => RegionProbe::Moved {
                    region_hint: Some(actual.clone()),
                },
                Some(_) | None => RegionProbe::NotFound,
            })
        };
        drop(state);
        futures_util::future::ready(result).boxed()
    }

    fn region(&self) -> Option<String> {
        self.region.clone()
    }
}

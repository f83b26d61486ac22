/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Every remote call made by the transfer manager goes through [`ObjectStore`].
//!
//! Implementations are responsible for signing, retries, and the wire protocol. The
//! transfer manager only orchestrates many of these calls against one logical transfer.

use std::fmt;
use std::ops::RangeInclusive;

use bytes::Bytes;
use futures_util::future::BoxFuture;

use crate::error::BoxError;

/// Bucket and key identifying a single object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    bucket: String,
    key: String,
}

impl ObjectPath {
    /// Create a new object path
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// The bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The object key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Validator returned for a single uploaded part.
///
/// The full list, ordered by part number, is required to complete a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number
    pub part_number: u64,
    /// Entity tag (or other opaque validator) returned by the service for this part
    pub e_tag: String,
}

/// Result of writing a whole object, either via `PutObject` or by completing a multipart upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Final location of the object
    pub location: Option<String>,
    /// Entity tag of the object
    pub e_tag: Option<String>,
    /// Version ID of the object when versioning is enabled
    pub version_id: Option<String>,
}

/// Result of a ranged read.
#[derive(Debug, Clone)]
pub struct GetRangeOutput {
    /// The bytes of the requested range
    pub data: Bytes,
    /// Total size of the object, independent of the range requested
    pub total_size: u64,
}

/// Outcome of probing a bucket against one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionProbe {
    /// The bucket answered in the probed region.
    ///
    /// `region_hint` is set when the service also reported the bucket region explicitly.
    Found {
        /// Region reported by the service, if any
        region_hint: Option<String>,
    },
    /// The bucket exists but lives in a different region.
    Moved {
        /// Region reported by the service in a response header or error payload, if any
        region_hint: Option<String>,
    },
    /// The bucket did not answer in the probed region.
    NotFound,
}

/// Error returned by a single remote operation.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The request never produced a service response (connection, timeout, I/O).
    #[error("transport error")]
    Transport(#[source] BoxError),

    /// The service responded with an error.
    #[error("service error `{code}`: {message}")]
    Service {
        /// Service error code
        code: String,
        /// Human-readable message
        message: String,
    },
}

impl StoreError {
    /// Construct a transport error from any error type
    pub fn transport(err: impl Into<BoxError>) -> Self {
        StoreError::Transport(err.into())
    }

    /// Construct a service error
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    /// True if the request never reached a service response
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }

    /// The service error code, if the service responded with one
    pub fn code(&self) -> Option<&str> {
        match self {
            StoreError::Service { code, .. } => Some(code),
            StoreError::Transport(_) => None,
        }
    }
}

/// Remote object storage operations consumed by the transfer manager.
///
/// Each method is a single request. Implementations must be safe to call
/// concurrently from many tasks; retries (if any) belong inside the implementation.
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Begin a multipart upload, returning its upload ID.
    fn create_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
    ) -> BoxFuture<'a, Result<String, StoreError>>;

    /// Upload a single part of a multipart upload.
    fn upload_part<'a>(
        &'a self,
        dest: &'a ObjectPath,
        upload_id: &'a str,
        part_number: u64,
        data: Bytes,
    ) -> BoxFuture<'a, Result<CompletedPart, StoreError>>;

    /// Complete a multipart upload. `parts` are in ascending part number order.
    fn complete_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
        upload_id: &'a str,
        parts: Vec<CompletedPart>,
    ) -> BoxFuture<'a, Result<PutObjectOutput, StoreError>>;

    /// Abort a multipart upload, discarding every uploaded part.
    fn abort_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
        upload_id: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Write a whole object in one request.
    fn put_object<'a>(
        &'a self,
        dest: &'a ObjectPath,
        data: Bytes,
    ) -> BoxFuture<'a, Result<PutObjectOutput, StoreError>>;

    /// Read an inclusive byte range of an object.
    ///
    /// A range starting at or past the end of the object yields empty `data`
    /// (this is how zero-length objects are discovered). A range extending past
    /// the end is truncated to the object size.
    fn get_object_range<'a>(
        &'a self,
        src: &'a ObjectPath,
        range: RangeInclusive<u64>,
    ) -> BoxFuture<'a, Result<GetRangeOutput, StoreError>>;

    /// Probe `bucket` using an endpoint for `region`.
    fn probe_bucket_region<'a>(
        &'a self,
        bucket: &'a str,
        region: &'a str,
    ) -> BoxFuture<'a, Result<RegionProbe, StoreError>>;

    /// The region this store is configured for, if any.
    fn region(&self) -> Option<String> {
        None
    }
}

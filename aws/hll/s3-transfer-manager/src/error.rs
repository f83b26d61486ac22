/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::store::StoreError;
use std::io;
use tokio::task::JoinError;

/// Boxed error type used for opaque sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failed transfer result
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum TransferError {
    /// The effective configuration for a transfer was rejected before any remote call
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The request was invalid
    #[error("invalid meta request: {0}")]
    InvalidMetaRequest(String),

    /// The source needs more parts than the service accepts for a single multipart upload
    #[error("source requires more than {max_parts} parts at a part size of {part_size} bytes")]
    TooManyParts {
        /// The part count ceiling
        max_parts: u64,
        /// The part size in use when the ceiling was hit
        part_size: u64,
    },

    /// A single part operation failed
    #[error("part {part_number} failed")]
    PartFailed {
        /// The part that failed
        part_number: u64,
        /// Underlying failure
        #[source]
        source: OperationError,
    },

    /// A multipart upload failed after it was created.
    ///
    /// Carries the upload ID so that callers can inspect, resume, or clean up.
    #[error("multipart upload `{upload_id}` failed")]
    MultipartFailure {
        /// The multipart upload ID
        upload_id: String,
        /// The original cause of the failure
        #[source]
        source: Box<TransferError>,
        /// Failure of the cleanup (abort) attempt, if one was made and failed
        abort_error: Option<StoreError>,
    },

    /// A download failed after some data may have been written to the sink
    #[error("download failed after writing {bytes_written} bytes")]
    DownloadFailed {
        /// Bytes written to the sink before the failure
        bytes_written: u64,
        /// The original cause of the failure
        #[source]
        source: Box<TransferError>,
    },

    /// No candidate region answered for the bucket
    #[error("bucket `{bucket}` was not found in any region of partition `{partition}`")]
    BucketNotFound {
        /// The bucket that was probed
        bucket: String,
        /// The partition that was searched
        partition: String,
    },

    /// A remote or local operation outside of a single part failed
    #[error(transparent)]
    Operation(#[from] OperationError),

    /// The transfer was cancelled by the caller
    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// The multipart upload ID, if this is a [`TransferError::MultipartFailure`]
    pub fn upload_id(&self) -> Option<&str> {
        match self {
            TransferError::MultipartFailure { upload_id, .. } => Some(upload_id),
            _ => None,
        }
    }

    /// Bytes written to the sink, if this is a [`TransferError::DownloadFailed`]
    pub fn bytes_written(&self) -> Option<u64> {
        match self {
            TransferError::DownloadFailed { bytes_written, .. } => Some(*bytes_written),
            _ => None,
        }
    }

    /// The failed cleanup attempt attached to a [`TransferError::MultipartFailure`]
    pub fn abort_error(&self) -> Option<&StoreError> {
        match self {
            TransferError::MultipartFailure { abort_error, .. } => abort_error.as_ref(),
            _ => None,
        }
    }

    /// The error that caused a multipart or download failure, or `self` otherwise
    pub fn root_cause(&self) -> &TransferError {
        match self {
            TransferError::MultipartFailure { source, .. }
            | TransferError::DownloadFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<StoreError> for TransferError {
    fn from(value: StoreError) -> Self {
        OperationError::Store(value).into()
    }
}

impl From<io::Error> for TransferError {
    fn from(value: io::Error) -> Self {
        OperationError::Io(value).into()
    }
}

/// Failure of a single operation issued by the transfer manager
#[derive(thiserror::Error, Debug)]
pub enum OperationError {
    /// The object store reported an error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading the source or writing the sink failed
    #[error(transparent)]
    Io(#[from] io::Error),

    /// An internal task failed to complete
    #[error("internal task failed to complete")]
    TaskFailed(#[from] JoinError),
}

// convenience to construct a TransferError from a part failure
pub(crate) fn part_failed<E: Into<OperationError>>(part_number: u64, e: E) -> TransferError {
    TransferError::PartFailed {
        part_number,
        source: e.into(),
    }
}

pub(crate) fn invalid_meta_request(message: String) -> TransferError {
    TransferError::InvalidMetaRequest(message)
}

pub(crate) fn invalid_configuration(message: String) -> TransferError {
    TransferError::InvalidConfiguration(message)
}

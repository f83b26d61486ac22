/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::MEBIBYTE;

/// Part size used when [`TargetPartSize::Auto`] is configured.
pub(crate) const DEFAULT_PART_SIZE: u64 = 8 * MEBIBYTE;

/// Concurrency used when [`ConcurrencySetting::Auto`] is configured.
pub(crate) const DEFAULT_CONCURRENCY: usize = 8;

/// The target part size for an upload or download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPartSize {
    /// Automatically configure an optimal target part size based on the execution environment.
    #[default]
    Auto,

    /// Explicitly configured part size.
    Explicit(u64),
}

impl TargetPartSize {
    /// The concrete part size in bytes
    pub fn bytes(&self) -> u64 {
        match self {
            TargetPartSize::Auto => DEFAULT_PART_SIZE,
            TargetPartSize::Explicit(explicit) => *explicit,
        }
    }
}

/// The concurrency settings to use for a single upload or download request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencySetting {
    /// Automatically configure an optimal concurrency setting based on the execution environment.
    #[default]
    Auto,

    /// Explicitly configured concurrency setting.
    Explicit(usize),
}

impl ConcurrencySetting {
    /// The concrete number of part operations allowed in flight per transfer
    pub fn get(&self) -> usize {
        match self {
            ConcurrencySetting::Auto => DEFAULT_CONCURRENCY,
            ConcurrencySetting::Explicit(explicit) => *explicit,
        }
    }
}

/// Policy for what to do with a multipart upload that failed after it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailedMultipartUploadPolicy {
    /// Abort the upload, discarding every part already uploaded.
    #[default]
    AbortUpload,

    /// Leave the upload and its parts in place. The upload ID is reported in the error
    /// so that the caller can inspect, resume, or abort it later.
    Retain,
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::error::{self, TransferError};
use crate::planner::MIN_PART_SIZE;
use crate::types::{ConcurrencySetting, FailedMultipartUploadPolicy, TargetPartSize};

/// Configuration for a [`Client`](crate::Client)
///
/// A `Config` is an immutable value. Per-call [`TransferOverrides`] produce a new value via
/// [`Config::with_overrides`] and never modify the original.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    part_size: TargetPartSize,
    concurrency: ConcurrencySetting,
    failed_multipart_upload_policy: FailedMultipartUploadPolicy,
}

impl Config {
    /// Create a new [`Builder`]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The target part size for uploads and downloads
    pub fn part_size(&self) -> &TargetPartSize {
        &self.part_size
    }

    /// The number of part operations allowed in flight per transfer
    pub fn concurrency(&self) -> &ConcurrencySetting {
        &self.concurrency
    }

    /// What to do with a multipart upload that failed after creation
    pub fn failed_multipart_upload_policy(&self) -> &FailedMultipartUploadPolicy {
        &self.failed_multipart_upload_policy
    }

    /// True if failed multipart uploads are left in place rather than aborted
    pub fn leave_parts_on_error(&self) -> bool {
        self.failed_multipart_upload_policy == FailedMultipartUploadPolicy::Retain
    }

    /// Derive the effective configuration for a single call
    pub fn with_overrides(&self, overrides: &TransferOverrides) -> Config {
        Config {
            part_size: overrides.part_size.unwrap_or(self.part_size),
            concurrency: overrides.concurrency.unwrap_or(self.concurrency),
            failed_multipart_upload_policy: overrides
                .failed_multipart_upload_policy
                .unwrap_or(self.failed_multipart_upload_policy),
        }
    }

    /// Reject configurations that can never produce a valid transfer
    pub fn validate(&self) -> Result<(), TransferError> {
        let part_size = self.part_size.bytes();
        if part_size < MIN_PART_SIZE {
            return Err(error::invalid_configuration(format!(
                "part size {part_size} is below the minimum of {MIN_PART_SIZE} bytes"
            )));
        }
        if self.concurrency.get() == 0 {
            return Err(error::invalid_configuration(
                "concurrency must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent style builder for [`Config`]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    part_size: TargetPartSize,
    concurrency: ConcurrencySetting,
    failed_multipart_upload_policy: FailedMultipartUploadPolicy,
}

impl Builder {
    /// Size of each part. Objects no larger than this are transferred in a single request.
    ///
    /// The minimum part size is 5 MiB; smaller values are rejected when a transfer starts.
    /// Default is [`TargetPartSize::Auto`].
    pub fn part_size(mut self, part_size: TargetPartSize) -> Self {
        self.part_size = part_size;
        self
    }

    /// Set the concurrency level this component is allowed to use.
    ///
    /// This sets the maximum number of concurrent in-flight part requests for a single
    /// transfer. Concurrent transfers each get their own allowance.
    /// Default is [`ConcurrencySetting::Auto`].
    pub fn concurrency(mut self, concurrency: ConcurrencySetting) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the policy for multipart uploads that fail after creation.
    pub fn failed_multipart_upload_policy(mut self, policy: FailedMultipartUploadPolicy) -> Self {
        self.failed_multipart_upload_policy = policy;
        self
    }

    /// Leave uploaded parts in place when a multipart upload fails instead of aborting it.
    pub fn leave_parts_on_error(self, leave_parts_on_error: bool) -> Self {
        self.failed_multipart_upload_policy(if leave_parts_on_error {
            FailedMultipartUploadPolicy::Retain
        } else {
            FailedMultipartUploadPolicy::AbortUpload
        })
    }

    /// Consumes the builder and constructs a [`Config`]
    pub fn build(self) -> Config {
        Config {
            part_size: self.part_size,
            concurrency: self.concurrency,
            failed_multipart_upload_policy: self.failed_multipart_upload_policy,
        }
    }
}

/// Per-call settings that take precedence over the client [`Config`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOverrides {
    part_size: Option<TargetPartSize>,
    concurrency: Option<ConcurrencySetting>,
    failed_multipart_upload_policy: Option<FailedMultipartUploadPolicy>,
}

impl TransferOverrides {
    /// Create an empty set of overrides
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the part size
    pub fn part_size(mut self, part_size: TargetPartSize) -> Self {
        self.part_size = Some(part_size);
        self
    }

    /// Override the concurrency
    pub fn concurrency(mut self, concurrency: ConcurrencySetting) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Override the failed multipart upload policy
    pub fn failed_multipart_upload_policy(mut self, policy: FailedMultipartUploadPolicy) -> Self {
        self.failed_multipart_upload_policy = Some(policy);
        self
    }

    /// Override whether parts are left in place when a multipart upload fails
    pub fn leave_parts_on_error(self, leave_parts_on_error: bool) -> Self {
        self.failed_multipart_upload_policy(if leave_parts_on_error {
            FailedMultipartUploadPolicy::Retain
        } else {
            FailedMultipartUploadPolicy::AbortUpload
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, TransferOverrides};
    use crate::error::TransferError;
    use crate::planner::MIN_PART_SIZE;
    use crate::types::{ConcurrencySetting, FailedMultipartUploadPolicy, TargetPartSize};

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(8 * 1024 * 1024, config.part_size().bytes());
        assert_eq!(8, config.concurrency().get());
        assert!(!config.leave_parts_on_error());
    }

    #[test]
    fn test_overrides_do_not_touch_base() {
        let base = Config::builder()
            .part_size(TargetPartSize::Explicit(MIN_PART_SIZE))
            .concurrency(ConcurrencySetting::Explicit(4))
            .build();
        let overrides = TransferOverrides::new()
            .concurrency(ConcurrencySetting::Explicit(16))
            .leave_parts_on_error(true);

        let effective = base.with_overrides(&overrides);
        assert_eq!(16, effective.concurrency().get());
        assert_eq!(MIN_PART_SIZE, effective.part_size().bytes());
        assert_eq!(
            FailedMultipartUploadPolicy::Retain,
            *effective.failed_multipart_upload_policy()
        );

        assert_eq!(4, base.concurrency().get());
        assert!(!base.leave_parts_on_error());
    }

    #[test]
    fn test_validate_rejects_small_part_size() {
        let config = Config::builder()
            .part_size(TargetPartSize::Explicit(MIN_PART_SIZE - 1))
            .build();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TransferError::InvalidConfiguration(_)), "{err:?}");
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = Config::builder()
            .concurrency(ConcurrencySetting::Explicit(0))
            .build();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TransferError::InvalidConfiguration(_)), "{err:?}");
    }
}

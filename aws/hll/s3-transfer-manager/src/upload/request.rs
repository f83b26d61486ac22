/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt::Debug;
use std::mem;

use tokio_util::sync::CancellationToken;

use crate::config::TransferOverrides;
use crate::error::{self, TransferError};
use crate::io::InputStream;
use crate::store::ObjectPath;

/// Request type for uploading a single object
#[non_exhaustive]
#[derive(Debug)]
pub struct UploadRequest {
    pub(crate) destination: ObjectPath,
    pub(crate) body: InputStream,
    pub(crate) overrides: TransferOverrides,
    pub(crate) cancellation_token: CancellationToken,
}

impl UploadRequest {
    /// Create a new builder for `UploadRequest`
    pub fn builder() -> UploadRequestBuilder {
        UploadRequestBuilder::default()
    }

    /// Split the body from the request by taking it and replacing it with the default.
    pub(crate) fn take_body(&mut self) -> InputStream {
        mem::take(&mut self.body)
    }

    /// The bucket to upload to
    pub fn bucket(&self) -> &str {
        self.destination.bucket()
    }

    /// The object key to upload to
    pub fn key(&self) -> &str {
        self.destination.key()
    }

    /// Object data
    pub fn body(&self) -> &InputStream {
        &self.body
    }

    /// Settings that take precedence over the client configuration for this upload
    pub fn overrides(&self) -> &TransferOverrides {
        &self.overrides
    }

    /// Token that cancels this upload when fired
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }
}

/// A builder for [`UploadRequest`].
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct UploadRequestBuilder {
    pub(crate) bucket: Option<String>,
    pub(crate) key: Option<String>,
    pub(crate) body: Option<InputStream>,
    pub(crate) overrides: Option<TransferOverrides>,
    pub(crate) cancellation_token: Option<CancellationToken>,
}

impl UploadRequestBuilder {
    /// The bucket name to upload to.
    /// This field is required.
    pub fn bucket(mut self, input: impl Into<String>) -> Self {
        self.bucket = Some(input.into());
        self
    }
    /// The bucket name to upload to.
    pub fn set_bucket(mut self, input: Option<String>) -> Self {
        self.bucket = input;
        self
    }
    /// The bucket name to upload to.
    pub fn get_bucket(&self) -> &Option<String> {
        &self.bucket
    }

    /// Object key for which the upload was initiated.
    /// This field is required.
    pub fn key(mut self, input: impl Into<String>) -> Self {
        self.key = Some(input.into());
        self
    }
    /// Object key for which the upload was initiated.
    pub fn set_key(mut self, input: Option<String>) -> Self {
        self.key = input;
        self
    }
    /// Object key for which the upload was initiated.
    pub fn get_key(&self) -> &Option<String> {
        &self.key
    }

    /// Object data. Defaults to an empty body.
    pub fn body(mut self, input: InputStream) -> Self {
        self.body = Some(input);
        self
    }
    /// Object data.
    pub fn set_body(mut self, input: Option<InputStream>) -> Self {
        self.body = input;
        self
    }
    /// Object data.
    pub fn get_body(&self) -> &Option<InputStream> {
        &self.body
    }

    /// Per-call settings that take precedence over the client configuration.
    pub fn overrides(mut self, input: TransferOverrides) -> Self {
        self.overrides = Some(input);
        self
    }

    /// Token used to cancel the upload.
    ///
    /// Cancelling stops new parts from being started. Parts already in flight finish, and the
    /// configured [`FailedMultipartUploadPolicy`](crate::types::FailedMultipartUploadPolicy)
    /// is applied to the multipart upload before the call returns.
    pub fn cancellation_token(mut self, input: CancellationToken) -> Self {
        self.cancellation_token = Some(input);
        self
    }

    /// Consumes the builder and constructs a [`UploadRequest`]
    pub fn build(self) -> Result<UploadRequest, TransferError> {
        let bucket = required(self.bucket, "bucket")?;
        let key = required(self.key, "key")?;
        Ok(UploadRequest {
            destination: ObjectPath::new(bucket, key),
            body: self.body.unwrap_or_default(),
            overrides: self.overrides.unwrap_or_default(),
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, TransferError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(error::invalid_meta_request(format!("{field} is required"))),
    }
}

#[cfg(test)]
mod tests {
    use super::UploadRequest;
    use crate::error::TransferError;

    #[test]
    fn test_bucket_and_key_required() {
        let err = UploadRequest::builder().key("k").build().unwrap_err();
        assert!(matches!(err, TransferError::InvalidMetaRequest(_)), "{err:?}");

        let err = UploadRequest::builder().bucket("b").key("").build().unwrap_err();
        assert!(err.to_string().contains("key is required"), "{err}");

        let request = UploadRequest::builder().bucket("b").key("k").build().unwrap();
        assert_eq!("b", request.bucket());
        assert_eq!("k", request.key());
        assert_eq!(Some(0), request.body().size_hint().exact_size());
    }
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::str::FromStr;

use tokio_util::sync::CancellationToken;

use crate::config::TransferOverrides;
use crate::error::{self, TransferError};
use crate::store::ObjectPath;

use super::header::{self, ByteRange};

/// Request type for downloading a single object
#[non_exhaustive]
#[derive(Debug)]
pub struct DownloadRequest {
    pub(crate) source: ObjectPath,
    pub(crate) range: Option<ByteRange>,
    pub(crate) object_size: Option<u64>,
    pub(crate) overrides: TransferOverrides,
    pub(crate) cancellation_token: CancellationToken,
}

impl DownloadRequest {
    /// Create a new builder for `DownloadRequest`
    pub fn builder() -> DownloadRequestBuilder {
        DownloadRequestBuilder::default()
    }

    /// The bucket to download from
    pub fn bucket(&self) -> &str {
        self.source.bucket()
    }

    /// The object key to download
    pub fn key(&self) -> &str {
        self.source.key()
    }

    /// The requested byte range as a `Range` header value, if any
    pub fn range(&self) -> Option<String> {
        self.range.map(|r| header::Range(r).to_string())
    }

    /// The object size supplied by the caller, if any
    pub fn object_size(&self) -> Option<u64> {
        self.object_size
    }

    /// Settings that take precedence over the client configuration for this download
    pub fn overrides(&self) -> &TransferOverrides {
        &self.overrides
    }

    /// Token that cancels this download when fired
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }
}

/// A builder for [`DownloadRequest`].
#[non_exhaustive]
#[derive(Debug, Default)]
pub struct DownloadRequestBuilder {
    pub(crate) bucket: Option<String>,
    pub(crate) key: Option<String>,
    pub(crate) range: Option<String>,
    pub(crate) object_size: Option<u64>,
    pub(crate) overrides: Option<TransferOverrides>,
    pub(crate) cancellation_token: Option<CancellationToken>,
}

impl DownloadRequestBuilder {
    /// The bucket name containing the object.
    /// This field is required.
    pub fn bucket(mut self, input: impl Into<String>) -> Self {
        self.bucket = Some(input.into());
        self
    }
    /// The bucket name containing the object.
    pub fn set_bucket(mut self, input: Option<String>) -> Self {
        self.bucket = input;
        self
    }
    /// The bucket name containing the object.
    pub fn get_bucket(&self) -> &Option<String> {
        &self.bucket
    }

    /// Key of the object to get.
    /// This field is required.
    pub fn key(mut self, input: impl Into<String>) -> Self {
        self.key = Some(input.into());
        self
    }
    /// Key of the object to get.
    pub fn set_key(mut self, input: Option<String>) -> Self {
        self.key = input;
        self
    }
    /// Key of the object to get.
    pub fn get_key(&self) -> &Option<String> {
        &self.key
    }

    /// Downloads the specified byte range of an object.
    ///
    /// Accepts a single range in one of the forms `bytes=<start>-<end>`, `bytes=<start>-`
    /// or `bytes=-<suffix length>`. The sink receives the range starting at offset 0.
    pub fn range(mut self, input: impl Into<String>) -> Self {
        self.range = Some(input.into());
        self
    }
    /// Downloads the specified byte range of an object.
    pub fn set_range(mut self, input: Option<String>) -> Self {
        self.range = input;
        self
    }
    /// Downloads the specified byte range of an object.
    pub fn get_range(&self) -> &Option<String> {
        &self.range
    }

    /// Total size of the object, when already known.
    ///
    /// Skips the request otherwise made to discover the size.
    pub fn object_size(mut self, input: u64) -> Self {
        self.object_size = Some(input);
        self
    }

    /// Per-call settings that take precedence over the client configuration.
    pub fn overrides(mut self, input: TransferOverrides) -> Self {
        self.overrides = Some(input);
        self
    }

    /// Token used to cancel the download. Ranges already in flight are allowed to finish.
    pub fn cancellation_token(mut self, input: CancellationToken) -> Self {
        self.cancellation_token = Some(input);
        self
    }

    /// Consumes the builder and constructs a [`DownloadRequest`]
    pub fn build(self) -> Result<DownloadRequest, TransferError> {
        let bucket = self
            .bucket
            .filter(|b| !b.is_empty())
            .ok_or_else(|| error::invalid_meta_request("bucket is required".to_string()))?;
        let key = self
            .key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| error::invalid_meta_request("key is required".to_string()))?;
        let range = self
            .range
            .as_deref()
            .map(header::Range::from_str)
            .transpose()?
            .map(|r| r.0);

        Ok(DownloadRequest {
            source: ObjectPath::new(bucket, key),
            range,
            object_size: self.object_size,
            overrides: self.overrides.unwrap_or_default(),
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::DownloadRequest;
    use crate::download::header::ByteRange;
    use crate::error::TransferError;

    #[test]
    fn test_range_parsed_at_build() {
        let request = DownloadRequest::builder()
            .bucket("b")
            .key("k")
            .range("bytes=100-")
            .build()
            .unwrap();
        assert_eq!(Some(ByteRange::AllFrom(100)), request.range);
        assert_eq!(Some("bytes=100-".to_string()), request.range());

        let err = DownloadRequest::builder()
            .bucket("b")
            .key("k")
            .range("bytes=0-1,5-6")
            .build()
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidMetaRequest(_)), "{err:?}");
    }

    #[test]
    fn test_missing_key_rejected() {
        let err = DownloadRequest::builder().bucket("b").build().unwrap_err();
        assert!(err.to_string().contains("key is required"), "{err}");
    }
}

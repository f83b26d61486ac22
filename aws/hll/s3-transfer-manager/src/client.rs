/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{Config, TransferOverrides};
use crate::download::{self, DownloadContext, DownloadRequest, DownloadResponse};
use crate::error::TransferError;
use crate::io::TransferSink;
use crate::region;
use crate::store::ObjectStore;
use crate::upload::{self, UploadContext, UploadRequest, UploadResponse};

/// Transfer manager client for moving large objects to and from an [`ObjectStore`].
///
/// Cloning a client is cheap; clones share the store and default configuration.
#[derive(Debug, Clone)]
pub struct Client {
    handle: Arc<Handle>,
}

#[derive(Debug)]
struct Handle {
    config: RwLock<Arc<Config>>,
    store: Arc<dyn ObjectStore>,
}

impl Client {
    /// Creates a new client from the store used for remote operations and the default
    /// configuration for transfers.
    pub fn new(store: Arc<dyn ObjectStore>, config: Config) -> Client {
        let handle = Handle {
            config: RwLock::new(Arc::new(config)),
            store,
        };
        Client {
            handle: Arc::new(handle),
        }
    }

    /// Snapshot of the current default configuration
    pub fn config(&self) -> Arc<Config> {
        self.handle
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the default configuration.
    ///
    /// Transfers already in progress keep the configuration they started with.
    pub fn set_config(&self, config: Config) {
        *self
            .handle
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Upload a single object.
    ///
    /// Objects larger than the part size are split into concurrent `UploadPart` requests.
    /// If a multipart upload fails after it was created the error is a
    /// [`TransferError::MultipartFailure`] carrying the upload ID.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, TransferError> {
        let config = self.effective_config(request.overrides())?;
        tracing::debug!(
            bucket = request.bucket(),
            key = request.key(),
            size_hint = ?request.body().size_hint(),
            "upload requested"
        );
        let ctx = UploadContext::new(
            self.handle.store.clone(),
            config,
            request.destination.clone(),
        );
        upload::upload(ctx, request).await
    }

    /// Download a single object (or a range of it) into `sink`.
    ///
    /// The object is fetched as concurrent ranged reads, each written to the sink at its own
    /// offset. Failures report the bytes already written through
    /// [`TransferError::DownloadFailed`].
    pub async fn download(
        &self,
        request: DownloadRequest,
        sink: Arc<dyn TransferSink>,
    ) -> Result<DownloadResponse, TransferError> {
        let config = self.effective_config(request.overrides())?;
        tracing::debug!(
            bucket = request.bucket(),
            key = request.key(),
            range = ?request.range(),
            "download requested"
        );
        let ctx = DownloadContext::new(self.handle.store.clone(), config, request.source.clone());
        download::download(ctx, request, sink).await
    }

    /// Determine the region that owns `bucket`.
    ///
    /// Returns [`TransferError::BucketNotFound`] if no region in the partition of the
    /// store's region answered for the bucket.
    pub async fn resolve_bucket_region(&self, bucket: &str) -> Result<String, TransferError> {
        region::resolve_bucket_region(self.handle.store.as_ref(), bucket).await
    }

    /// The defaults captured once for this call, merged with its overrides
    fn effective_config(&self, overrides: &TransferOverrides) -> Result<Config, TransferError> {
        let config = self.config().with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }
}

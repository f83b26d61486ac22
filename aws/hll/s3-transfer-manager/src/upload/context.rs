/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::config::Config;
use crate::store::{ObjectPath, ObjectStore};

/// Internal context used to drive a single Upload request
#[derive(Debug, Clone)]
pub(crate) struct UploadContext {
    /// store used for remote operations
    pub(crate) store: Arc<dyn ObjectStore>,
    /// effective configuration captured when the upload started
    pub(crate) config: Arc<Config>,
    /// where the object is written
    pub(crate) destination: Arc<ObjectPath>,
}

impl UploadContext {
    pub(crate) fn new(store: Arc<dyn ObjectStore>, config: Config, destination: ObjectPath) -> Self {
        Self {
            store,
            config: Arc::new(config),
            destination: Arc::new(destination),
        }
    }

    pub(crate) fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub(crate) fn destination(&self) -> &ObjectPath {
        &self.destination
    }

    pub(crate) fn part_size(&self) -> u64 {
        self.config.part_size().bytes()
    }

    pub(crate) fn concurrency(&self) -> usize {
        self.config.concurrency().get()
    }
}

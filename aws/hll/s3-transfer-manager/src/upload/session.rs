/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::BTreeMap;

use crate::store::{CompletedPart, ObjectPath};

/// State of one multipart upload, owned by the single upload call that created it.
#[derive(Debug)]
pub(crate) struct MultipartUploadSession {
    upload_id: String,
    destination: ObjectPath,
    completed: BTreeMap<u64, CompletedPart>,
    bytes: u64,
}

impl MultipartUploadSession {
    pub(crate) fn new(upload_id: String, destination: ObjectPath) -> Self {
        Self {
            upload_id,
            destination,
            completed: BTreeMap::new(),
            bytes: 0,
        }
    }

    pub(crate) fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub(crate) fn destination(&self) -> &ObjectPath {
        &self.destination
    }

    /// Record a completed part of `size` bytes
    pub(crate) fn record(&mut self, part: CompletedPart, size: u64) {
        if let Some(previous) = self.completed.insert(part.part_number, part) {
            tracing::warn!(
                part_number = previous.part_number,
                "part recorded twice, keeping the latest validator"
            );
        } else {
            self.bytes += size;
        }
    }

    pub(crate) fn part_count(&self) -> u64 {
        self.completed.len() as u64
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Completed parts in ascending part number order
    pub(crate) fn ordered_parts(&self) -> Vec<CompletedPart> {
        self.completed.values().cloned().collect()
    }

    pub(crate) fn into_upload_id(self) -> String {
        self.upload_id
    }
}

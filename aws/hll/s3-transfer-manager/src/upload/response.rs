/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::store::PutObjectOutput;

/// Common response fields for uploading an object
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub(crate) location: Option<String>,
    pub(crate) e_tag: Option<String>,
    pub(crate) version_id: Option<String>,
    pub(crate) upload_id: Option<String>,
    pub(crate) part_count: u64,
    pub(crate) content_length: u64,
}

impl UploadResponse {
    pub(crate) fn single_shot(output: PutObjectOutput, content_length: u64) -> Self {
        Self {
            location: output.location,
            e_tag: output.e_tag,
            version_id: output.version_id,
            upload_id: None,
            part_count: 1,
            content_length,
        }
    }

    pub(crate) fn multipart(
        output: PutObjectOutput,
        upload_id: String,
        part_count: u64,
        content_length: u64,
    ) -> Self {
        Self {
            location: output.location,
            e_tag: output.e_tag,
            version_id: output.version_id,
            upload_id: Some(upload_id),
            part_count,
            content_length,
        }
    }

    /// Final location of the object
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Entity tag for the uploaded object.
    pub fn e_tag(&self) -> Option<&str> {
        self.e_tag.as_deref()
    }

    /// Version ID of the object.
    pub fn version_id(&self) -> Option<&str> {
        self.version_id.as_deref()
    }

    /// ID for the initiated multipart upload.
    ///
    /// This will not be set for requests that are not split into multipart uploads.
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    /// Number of parts the object was sent in (1 for a single request)
    pub fn part_count(&self) -> u64 {
        self.part_count
    }

    /// Total bytes uploaded
    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

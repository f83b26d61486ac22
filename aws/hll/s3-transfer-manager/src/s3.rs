/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::error::Error as StdError;
use std::fmt;
use std::ops::RangeInclusive;

use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::download::header;
use crate::store::{
    CompletedPart, GetRangeOutput, ObjectPath, ObjectStore, PutObjectOutput, RegionProbe,
    StoreError,
};

const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";

/// [`ObjectStore`] backed by the AWS SDK for Rust S3 client.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    /// Wrap an existing S3 client
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Create a store from shared SDK configuration
    pub fn from_conf(sdk_config: &aws_types::SdkConfig) -> Self {
        Self::new(aws_sdk_s3::Client::new(sdk_config))
    }

    /// The underlying S3 client
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }

    async fn get_range(
        &self,
        src: &ObjectPath,
        range: RangeInclusive<u64>,
    ) -> Result<GetRangeOutput, StoreError> {
        let resp = self
            .client
            .get_object()
            .bucket(src.bucket())
            .key(src.key())
            .range(header::Range::bytes_inclusive(*range.start(), *range.end()))
            .send()
            .await;

        let resp = match resp {
            Ok(resp) => resp,
            Err(err) if err.code() == Some("InvalidRange") => {
                // the range starts at or past the end of the object (including empty objects)
                let total_size = self.object_size(src).await?;
                return Ok(GetRangeOutput {
                    data: Bytes::new(),
                    total_size,
                });
            }
            Err(err) => return Err(store_error(err)),
        };

        let total_size = total_size(resp.content_range(), resp.content_length())?;
        let data = resp
            .body
            .collect()
            .await
            .map_err(StoreError::transport)?
            .into_bytes();
        Ok(GetRangeOutput { data, total_size })
    }

    async fn object_size(&self, src: &ObjectPath) -> Result<u64, StoreError> {
        let head = self
            .client
            .head_object()
            .bucket(src.bucket())
            .key(src.key())
            .send()
            .await
            .map_err(store_error)?;
        total_size(None, head.content_length())
    }

    async fn probe(&self, bucket: &str, region: &str) -> Result<RegionProbe, StoreError> {
        let resp = self
            .client
            .head_bucket()
            .bucket(bucket)
            .customize()
            .config_override(
                aws_sdk_s3::config::Builder::default().region(Region::new(region.to_string())),
            )
            .send()
            .await;

        match resp {
            Ok(output) => Ok(RegionProbe::Found {
                region_hint: output.bucket_region().map(str::to_string),
            }),
            Err(SdkError::ServiceError(ctx)) => {
                let raw = ctx.raw();
                let region_hint = raw
                    .headers()
                    .get(BUCKET_REGION_HEADER)
                    .map(str::to_string);
                if raw.status().as_u16() == 404 {
                    Ok(RegionProbe::NotFound)
                } else {
                    Ok(RegionProbe::Moved { region_hint })
                }
            }
            Err(err) => Err(store_error(err)),
        }
    }
}

impl fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("region", &self.region())
            .finish_non_exhaustive()
    }
}

/// Total object size from a `Content-Range` (`bytes 0-499/700`) or `Content-Length` header
fn total_size(content_range: Option<&str>, content_length: Option<i64>) -> Result<u64, StoreError> {
    if let Some(range) = content_range {
        return range
            .split_once('/')
            .and_then(|(_, total)| total.parse().ok())
            .ok_or_else(|| {
                StoreError::service("InvalidResponse", format!("unparseable content range `{range}`"))
            });
    }
    content_length
        .and_then(|len| u64::try_from(len).ok())
        .ok_or_else(|| {
            StoreError::service(
                "InvalidResponse",
                "object size missing from both content range and content length",
            )
        })
}

fn part_number(part_number: u64) -> Result<i32, StoreError> {
    i32::try_from(part_number).map_err(|_| {
        StoreError::service(
            "InvalidArgument",
            format!("part number {part_number} is out of range"),
        )
    })
}

fn store_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(ctx) => {
            let err = ctx.err();
            StoreError::service(
                err.code().unwrap_or("Unknown"),
                err.message().unwrap_or_default(),
            )
        }
        other => StoreError::transport(other),
    }
}

impl ObjectStore for S3ObjectStore {
    fn create_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
    ) -> BoxFuture<'a, Result<String, StoreError>> {
        async move {
            let resp = self
                .client
                .create_multipart_upload()
                .bucket(dest.bucket())
                .key(dest.key())
                .send()
                .await
                .map_err(store_error)?;
            resp.upload_id
                .ok_or_else(|| StoreError::service("InvalidResponse", "upload ID missing"))
        }
        .boxed()
    }

    fn upload_part<'a>(
        &'a self,
        dest: &'a ObjectPath,
        upload_id: &'a str,
        part_number: u64,
        data: Bytes,
    ) -> BoxFuture<'a, Result<CompletedPart, StoreError>> {
        async move {
            let resp = self
                .client
                .upload_part()
                .bucket(dest.bucket())
                .key(dest.key())
                .upload_id(upload_id)
                .part_number(self::part_number(part_number)?)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(store_error)?;
            let e_tag = resp.e_tag.ok_or_else(|| {
                StoreError::service("InvalidResponse", format!("ETag missing for part {part_number}"))
            })?;
            Ok(CompletedPart { part_number, e_tag })
        }
        .boxed()
    }

    fn complete_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
        upload_id: &'a str,
        parts: Vec<CompletedPart>,
    ) -> BoxFuture<'a, Result<PutObjectOutput, StoreError>> {
        async move {
            let parts = parts
                .into_iter()
                .map(|p| {
                    Ok(S3CompletedPart::builder()
                        .part_number(self::part_number(p.part_number)?)
                        .e_tag(p.e_tag)
                        .build())
                })
                .collect::<Result<Vec<_>, StoreError>>()?;
            let resp = self
                .client
                .complete_multipart_upload()
                .bucket(dest.bucket())
                .key(dest.key())
                .upload_id(upload_id)
                .multipart_upload(
                    CompletedMultipartUpload::builder()
                        .set_parts(Some(parts))
                        .build(),
                )
                .send()
                .await
                .map_err(store_error)?;
            Ok(PutObjectOutput {
                location: resp.location,
                e_tag: resp.e_tag,
                version_id: resp.version_id,
            })
        }
        .boxed()
    }

    fn abort_multipart_upload<'a>(
        &'a self,
        dest: &'a ObjectPath,
        upload_id: &'a str,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            self.client
                .abort_multipart_upload()
                .bucket(dest.bucket())
                .key(dest.key())
                .upload_id(upload_id)
                .send()
                .await
                .map_err(store_error)?;
            Ok(())
        }
        .boxed()
    }

    fn put_object<'a>(
        &'a self,
        dest: &'a ObjectPath,
        data: Bytes,
    ) -> BoxFuture<'a, Result<PutObjectOutput, StoreError>> {
        async move {
            let resp = self
                .client
                .put_object()
                .bucket(dest.bucket())
                .key(dest.key())
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(store_error)?;
            Ok(PutObjectOutput {
                location: None,
                e_tag: resp.e_tag,
                version_id: resp.version_id,
            })
        }
        .boxed()
    }

    fn get_object_range<'a>(
        &'a self,
        src: &'a ObjectPath,
        range: RangeInclusive<u64>,
    ) -> BoxFuture<'a, Result<GetRangeOutput, StoreError>> {
        self.get_range(src, range).boxed()
    }

    fn probe_bucket_region<'a>(
        &'a self,
        bucket: &'a str,
        region: &'a str,
    ) -> BoxFuture<'a, Result<RegionProbe, StoreError>> {
        self.probe(bucket, region).boxed()
    }

    fn region(&self) -> Option<String> {
        self.client.config().region().map(|r| r.to_string())
    }
}

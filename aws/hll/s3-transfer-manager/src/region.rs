/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use crate::error::{self, TransferError};
use crate::store::{ObjectStore, RegionProbe};

/// Region probed first when the store does not report one.
pub const DEFAULT_REGION: &str = "us-east-1";

const AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "eu-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "ap-east-1",
    "sa-east-1",
    "me-south-1",
    "af-south-1",
];

const AWS_CN_REGIONS: &[&str] = &["cn-north-1", "cn-northwest-1"];

const AWS_US_GOV_REGIONS: &[&str] = &["us-gov-west-1", "us-gov-east-1"];

/// A group of regions sharing one namespace of buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Partition {
    /// Commercial regions
    Aws,
    /// China regions
    AwsCn,
    /// GovCloud (US) regions
    AwsUsGov,
}

impl Partition {
    /// The partition a region belongs to
    pub fn of_region(region: &str) -> Partition {
        if region.starts_with("cn-") {
            Partition::AwsCn
        } else if region.starts_with("us-gov-") {
            Partition::AwsUsGov
        } else {
            Partition::Aws
        }
    }

    /// Partition identifier, e.g. `aws-cn`
    pub fn id(&self) -> &'static str {
        match self {
            Partition::Aws => "aws",
            Partition::AwsCn => "aws-cn",
            Partition::AwsUsGov => "aws-us-gov",
        }
    }

    /// Well known regions probed when the service gives no region hint
    pub fn candidate_regions(&self) -> &'static [&'static str] {
        match self {
            Partition::Aws => AWS_REGIONS,
            Partition::AwsCn => AWS_CN_REGIONS,
            Partition::AwsUsGov => AWS_US_GOV_REGIONS,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Determine the region that owns `bucket`.
///
/// The store's own region is probed first. A region hint returned by the service is trusted
/// as is; without one, the well known regions of the same partition are probed in turn.
pub(crate) async fn resolve_bucket_region(
    store: &dyn ObjectStore,
    bucket: &str,
) -> Result<String, TransferError> {
    if bucket.is_empty() {
        return Err(error::invalid_meta_request("bucket is required".to_string()));
    }

    let current = store.region().unwrap_or_else(|| DEFAULT_REGION.to_string());
    let partition = Partition::of_region(&current);

    if let Some(region) = probe(store, bucket, &current).await? {
        return Ok(region);
    }

    for candidate in partition
        .candidate_regions()
        .iter()
        .filter(|r| **r != current)
    {
        if let Some(region) = probe(store, bucket, candidate).await? {
            return Ok(region);
        }
    }

    tracing::debug!(bucket, partition = %partition, "no candidate region answered for bucket");
    Err(TransferError::BucketNotFound {
        bucket: bucket.to_string(),
        partition: partition.id().to_string(),
    })
}

/// Probe one region. Returns the resolved region, or `None` to keep searching.
async fn probe(
    store: &dyn ObjectStore,
    bucket: &str,
    region: &str,
) -> Result<Option<String>, TransferError> {
    let outcome = store.probe_bucket_region(bucket, region).await?;
    tracing::trace!(bucket, region, ?outcome, "probed bucket region");
    Ok(match outcome {
        RegionProbe::Found { region_hint } => {
            Some(region_hint.unwrap_or_else(|| region.to_string()))
        }
        RegionProbe::Moved {
            region_hint: Some(hint),
        } => Some(hint),
        RegionProbe::Moved { region_hint: None } | RegionProbe::NotFound => None,
    })
}

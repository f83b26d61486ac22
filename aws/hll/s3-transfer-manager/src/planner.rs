/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::Range;

use crate::MEBIBYTE;

/// Minimum part size in bytes. Configurations below this floor are rejected.
pub const MIN_PART_SIZE: u64 = 5 * MEBIBYTE;

/// Maximum number of parts that a single multipart upload supports
pub const MAX_PARTS: u64 = 10_000;

/// Smallest part size `>= requested` that splits `len` bytes into at most `max_parts` parts.
pub fn effective_part_size(len: u64, requested: u64, max_parts: u64) -> u64 {
    let floor_for_ceiling = len.div_ceil(max_parts.max(1));
    requested.max(floor_for_ceiling).max(1)
}

/// A single planned part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    /// 1-based part number
    pub part_number: u64,
    /// Byte range of the part, relative to the planned range
    pub range: Range<u64>,
}

impl PartSpec {
    /// Size of this part in bytes
    pub fn len(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// True for a zero-length part
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Contiguous split of a byte range into parts.
///
/// Every part has length `part_size` except the last, which may be smaller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartPlan {
    range: Range<u64>,
    part_size: u64,
    first_part_number: u64,
}

impl PartPlan {
    /// Plan an upload of `len` bytes, growing `requested_part_size` if needed to
    /// stay within [`MAX_PARTS`].
    pub fn for_upload(len: u64, requested_part_size: u64) -> Self {
        let part_size = effective_part_size(len, requested_part_size, MAX_PARTS);
        Self::new(0..len, part_size)
    }

    /// Plan `range` in parts of exactly `part_size` bytes (no part count ceiling).
    pub fn new(range: Range<u64>, part_size: u64) -> Self {
        Self {
            range,
            part_size: part_size.max(1),
            first_part_number: 1,
        }
    }

    /// Number the parts of this plan starting from `first_part_number`
    pub(crate) fn starting_at(mut self, first_part_number: u64) -> Self {
        self.first_part_number = first_part_number;
        self
    }

    /// The part size used by this plan
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Total bytes covered by the plan
    pub fn total_len(&self) -> u64 {
        self.range.end.saturating_sub(self.range.start)
    }

    /// Number of parts in the plan
    pub fn part_count(&self) -> u64 {
        self.total_len().div_ceil(self.part_size)
    }

    /// True when the whole range fits in a single part (including the empty range)
    pub fn is_single_part(&self) -> bool {
        self.total_len() <= self.part_size
    }

    /// Iterate the parts in part number order
    pub fn parts(&self) -> impl Iterator<Item = PartSpec> + '_ {
        let end = self.range.end;
        (0..self.part_count()).map(move |idx| {
            let start = self.range.start + idx * self.part_size;
            PartSpec {
                part_number: self.first_part_number + idx,
                range: start..end.min(start.saturating_add(self.part_size)),
            }
        })
    }
}

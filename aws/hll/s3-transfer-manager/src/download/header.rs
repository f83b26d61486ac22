/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use core::fmt;
use std::ops;
use std::str::FromStr;

use crate::error::{self, TransferError};

/// Value of a `Range` header.
///
/// Only a single byte range is supported, matching what object stores accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Range(pub(crate) ByteRange);

impl Range {
    /// Range covering the inclusive offsets `start..=end`
    pub(crate) fn bytes_inclusive(start: u64, end: u64) -> Self {
        Range(ByteRange::Inclusive(start, end))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}", self.0)
    }
}

impl From<Range> for String {
    fn from(value: Range) -> Self {
        value.to_string()
    }
}

impl FromStr for Range {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(spec) = s.trim().strip_prefix("bytes=") else {
            return Err(error::invalid_meta_request(format!(
                "unsupported range header `{s}`; expected `bytes=<start>-<end>`, `bytes=<start>-` or `bytes=-<suffix>`"
            )));
        };
        if spec.contains(',') {
            return Err(error::invalid_meta_request(format!(
                "multiple byte ranges not supported for range header `{s}`"
            )));
        }
        ByteRange::from_str(spec)
            .map(Range)
            .map_err(|_| error::invalid_meta_request(format!("invalid range header `{s}`")))
    }
}

/// A single [RFC 9110 byte range](https://www.rfc-editor.org/rfc/rfc9110.html#name-byte-ranges)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ByteRange {
    /// Bytes `x` through `y`, inclusive ("bytes=x-y")
    Inclusive(u64, u64),

    /// Every byte from `x` on ("bytes=x-")
    AllFrom(u64),

    /// The last `n` bytes ("bytes=-n")
    Last(u64),
}

impl ByteRange {
    /// The half-open window this range selects from an object of `total` bytes.
    ///
    /// Offsets past the end are clamped, so the window may be empty.
    pub(crate) fn resolve(&self, total: u64) -> ops::Range<u64> {
        match *self {
            ByteRange::Inclusive(start, end) => {
                start.min(total)..end.saturating_add(1).min(total)
            }
            ByteRange::AllFrom(start) => start.min(total)..total,
            ByteRange::Last(n) => total.saturating_sub(n)..total,
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ByteRange::Inclusive(start, end) => write!(f, "{start}-{end}"),
            ByteRange::AllFrom(start) => write!(f, "{start}-"),
            ByteRange::Last(n) => write!(f, "-{n}"),
        }
    }
}

impl FromStr for ByteRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.split_once('-').ok_or(())?;
        match (start.trim(), end.trim()) {
            ("", "") => Err(()),
            ("", suffix) => suffix.parse().map(ByteRange::Last).map_err(|_| ()),
            (start, "") => start.parse().map(ByteRange::AllFrom).map_err(|_| ()),
            (start, end) => match (start.parse(), end.parse()) {
                (Ok(start), Ok(end)) if start <= end => Ok(ByteRange::Inclusive(start, end)),
                _ => Err(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteRange, Range};
    use crate::error::TransferError;
    use std::str::FromStr;

    #[test]
    fn test_byte_range_from_str() {
        assert_eq!(
            ByteRange::Last(500),
            Range::from_str("bytes=-500").unwrap().0
        );
        assert_eq!(
            ByteRange::AllFrom(200),
            Range::from_str("bytes=200-").unwrap().0
        );
        assert_eq!(
            ByteRange::Inclusive(200, 500),
            Range::from_str("bytes=200-500").unwrap().0
        );
        assert_eq!(
            "bytes=200-500",
            Range::bytes_inclusive(200, 500).to_string()
        );
    }

    fn assert_err_contains(r: Result<Range, TransferError>, msg: &str) {
        match r.unwrap_err() {
            TransferError::InvalidMetaRequest(m) => {
                assert!(m.contains(msg), "'{m}' does not contain '{msg}'");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_byte_range_from_str() {
        assert_err_contains(Range::from_str("bytes=-"), "invalid range header");
        assert_err_contains(Range::from_str("bytes=500-200"), "invalid range header");
        assert_err_contains(Range::from_str("bytes=abc-"), "invalid range header");
        assert_err_contains(Range::from_str("items=0-10"), "unsupported range header");
        assert_err_contains(
            Range::from_str("bytes=0-200,400-500"),
            "multiple byte ranges not supported",
        );
    }

    #[test]
    fn test_resolve_against_object_size() {
        assert_eq!(10..101, ByteRange::Inclusive(10, 100).resolve(500));
        assert_eq!(10..50, ByteRange::Inclusive(10, 100).resolve(50));
        assert_eq!(50..50, ByteRange::Inclusive(60, 100).resolve(50));
        assert_eq!(100..500, ByteRange::AllFrom(100).resolve(500));
        assert_eq!(400..500, ByteRange::Last(100).resolve(500));
        assert_eq!(0..50, ByteRange::Last(100).resolve(50));
        assert_eq!(0..0, ByteRange::AllFrom(0).resolve(0));
    }
}

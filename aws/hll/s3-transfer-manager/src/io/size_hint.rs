/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Bounds on the number of bytes an [`InputStream`](crate::io::InputStream) will produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeHint {
    lower: u64,
    upper: Option<u64>,
}

impl SizeHint {
    /// Set an exact size hint with upper and lower set to `size` bytes.
    pub fn exact(size: u64) -> Self {
        Self {
            lower: size,
            upper: Some(size),
        }
    }

    /// Nothing is known about the size.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Get the lower bound of the body size
    pub fn lower(&self) -> u64 {
        self.lower
    }

    /// Get the upper bound of the body size if known.
    pub fn upper(&self) -> Option<u64> {
        self.upper
    }

    /// The size, if upper and lower bounds agree.
    pub fn exact_size(&self) -> Option<u64> {
        self.upper.filter(|upper| *upper == self.lower)
    }
}

/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::error::Error as StdError;
use std::fmt;
use std::fmt::Formatter;
use std::io::{Error as StdIoError, ErrorKind as StdIoErrorKind};

#[derive(Debug)]
pub(crate) enum ErrorKind {
    MissingPath,
    OffsetGreaterThanFileSize { offset: u64, file_size: u64 },
    IOError(StdIoError),
}

/// An error occurred while constructing an [`InputStream`](crate::io::InputStream)
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl From<StdIoError> for Error {
    fn from(err: StdIoError) -> Self {
        ErrorKind::IOError(err).into()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::MissingPath => write!(f, "a path is required to read from a file"),
            ErrorKind::OffsetGreaterThanFileSize { offset, file_size } => write!(
                f,
                "offset must be less than or equal to file size but {offset} > {file_size}"
            ),
            ErrorKind::IOError(_) => write!(f, "I/O error"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::MissingPath | ErrorKind::OffsetGreaterThanFileSize { .. } => None,
            ErrorKind::IOError(err) => Some(err as _),
        }
    }
}

impl From<Error> for StdIoError {
    fn from(err: Error) -> Self {
        match err.kind {
            ErrorKind::IOError(inner) => inner,
            kind => StdIoError::new(StdIoErrorKind::InvalidInput, Error { kind }),
        }
    }
}

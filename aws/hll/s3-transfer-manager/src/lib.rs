/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/* Automatically managed default lints */
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
/* End of automatically managed default lints */

//! S3 Transfer Manager
//!
//! Moves large objects to and from an object store by splitting them into
//! bounded-size parts and transferring those parts concurrently.
//!
//! The remote service is reached exclusively through the [`ObjectStore`](store::ObjectStore)
//! trait, so any client (or a test double) can drive the transfers.
//!
//! ```no_run
//! # async fn example(store: std::sync::Arc<dyn s3_transfer_manager::store::ObjectStore>) -> Result<(), s3_transfer_manager::error::TransferError> {
//! use s3_transfer_manager::io::InputStream;
//! use s3_transfer_manager::upload::UploadRequest;
//! use s3_transfer_manager::{Client, Config};
//!
//! let client = Client::new(store, Config::default());
//! let request = UploadRequest::builder()
//!     .bucket("my-bucket")
//!     .key("some/large-object")
//!     .body(InputStream::from_path("/tmp/large-object").expect("readable file"))
//!     .build()?;
//! let response = client.upload(request).await?;
//! println!("uploaded to {:?}", response.location());
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Features
//!
//! - `test-util`: Enables utilities for unit tests. DO NOT ENABLE IN PRODUCTION.
//! - `aws-sdk-s3`: Enables [`S3ObjectStore`](s3::S3ObjectStore), an [`ObjectStore`](store::ObjectStore)
//!   backed by the AWS SDK for Rust.

#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub(crate) const MEBIBYTE: u64 = 1024 * 1024;

/// Transfer manager client
pub mod client;

/// Transfer manager configuration
pub mod config;

/// Abstractions for downloading objects
pub mod download;

/// Error types emitted by `s3-transfer-manager`
pub mod error;

/// Types and helpers for I/O
pub mod io;

/// Part size and part count planning
pub mod planner;

/// Bucket region discovery
pub mod region;

/// The remote operations consumed by the transfer manager
pub mod store;

/// Common types used by `s3-transfer-manager`
pub mod types;

/// Abstractions for uploading objects
pub mod upload;

/// Bounded pool of part workers
pub(crate) mod worker;

/// In-memory object store for tests
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

/// `ObjectStore` implementation for the AWS SDK S3 client
#[cfg(feature = "aws-sdk-s3")]
pub mod s3;

pub use self::client::Client;
pub use self::config::Config;

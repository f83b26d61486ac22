/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time;

use clap::{CommandFactory, Parser};
use s3_transfer_manager::download::DownloadRequest;
use s3_transfer_manager::io::{FileSink, InputStream};
use s3_transfer_manager::s3::S3ObjectStore;
use s3_transfer_manager::types::{ConcurrencySetting, TargetPartSize};
use s3_transfer_manager::upload::UploadRequest;
use s3_transfer_manager::{Client, Config};

type BoxError = Box<dyn Error + Send + Sync>;

const ONE_MEBIBYTE: u64 = 1024 * 1024;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "cp")]
#[command(about = "Copies a local file or S3 object to another location locally or in S3.")]
pub struct Args {
    /// Source to copy from <S3Uri | Local>
    #[arg(required = true)]
    source: TransferUri,

    /// Destination to copy to <S3Uri | Local>
    #[arg(required = true)]
    dest: TransferUri,

    /// Number of concurrent uploads/downloads to perform.
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Part size to use
    #[arg(long, default_value_t = 8388608)]
    part_size: u64,

    /// Resolve the bucket's region before transferring
    #[arg(long)]
    resolve_region: bool,
}

#[derive(Clone, Debug)]
enum TransferUri {
    /// Local filesystem source/destination
    Local(PathBuf),

    /// S3 source/destination
    S3 { bucket: String, key: String },
}

impl FromStr for TransferUri {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix("s3://") else {
            return Ok(TransferUri::Local(PathBuf::from(s)));
        };
        let (bucket, key) = rest
            .split_once('/')
            .ok_or("invalid s3 uri, missing '/' between bucket and key")?;
        Ok(TransferUri::S3 {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
        })
    }
}

fn invalid_arg(message: &str) -> ! {
    Args::command()
        .error(clap::error::ErrorKind::InvalidValue, message)
        .exit()
}

async fn client(args: &Args, bucket: &str) -> Result<Client, BoxError> {
    let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let tm_config = Config::builder()
        .concurrency(ConcurrencySetting::Explicit(args.concurrency))
        .part_size(TargetPartSize::Explicit(args.part_size))
        .build();

    let store = S3ObjectStore::from_conf(&sdk_config);
    if !args.resolve_region {
        return Ok(Client::new(Arc::new(store), tm_config));
    }

    let region = Client::new(Arc::new(store), tm_config.clone())
        .resolve_bucket_region(bucket)
        .await?;
    println!("bucket `{bucket}` is in {region}");
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .region(aws_sdk_s3::config::Region::new(region))
        .build();
    let store = S3ObjectStore::new(aws_sdk_s3::Client::from_conf(s3_config));
    Ok(Client::new(Arc::new(store), tm_config))
}

fn report(verb: &str, bytes: u64, elapsed: time::Duration) {
    let mebibytes = bytes as f64 / ONE_MEBIBYTE as f64;
    println!(
        "{verb} {bytes} bytes ({mebibytes} MiB) in {elapsed:?}; MiB/s: {}",
        mebibytes / elapsed.as_secs_f64(),
    );
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    use TransferUri::*;
    match (&args.source, &args.dest) {
        (Local(path), S3 { bucket, key }) => {
            let tm = client(&args, bucket).await?;
            let request = UploadRequest::builder()
                .bucket(bucket)
                .key(key)
                .body(InputStream::from_path(path)?)
                .build()?;

            let start = time::Instant::now();
            let response = tm.upload(request).await?;
            report("uploaded", response.content_length(), start.elapsed());
        }
        (S3 { bucket, key }, Local(path)) => {
            let tm = client(&args, bucket).await?;
            let request = DownloadRequest::builder()
                .bucket(bucket)
                .key(key)
                .build()?;
            let sink = Arc::new(FileSink::create(path).await?);

            let start = time::Instant::now();
            let response = tm.download(request, sink.clone()).await?;
            sink.sync_all().await?;
            report("downloaded", response.bytes_written(), start.elapsed());
        }
        (Local(_), Local(_)) => invalid_arg("local to local transfer not supported"),
        (S3 { .. }, S3 { .. }) => invalid_arg("s3 to s3 transfer not supported"),
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use imgstore_core::{ImageStore, StoreOptions};

use crate::config::{AppConfig, BackendConfig, StorageConfig};

#[derive(Args)]
pub struct InitArgs {
    /// Backend type: local or s3
    #[arg(long)]
    backend: String,

    /// Root directory for local backend
    #[arg(long)]
    path: Option<String>,

    /// S3 endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// S3 bucket name
    #[arg(long)]
    bucket: Option<String>,

    /// S3 region
    #[arg(long, default_value = "auto")]
    region: String,

    /// S3 access key
    #[arg(long)]
    access_key: Option<String>,

    /// S3 secret key
    #[arg(long)]
    secret_key: Option<String>,

    /// S3 key prefix
    #[arg(long)]
    prefix: Option<String>,

    /// Batch items processed concurrently
    #[arg(long, default_value_t = imgstore_core::store::DEFAULT_BATCH_CONCURRENCY)]
    batch_concurrency: usize,

    /// Check the backend for a clash before using a generated name
    #[arg(long)]
    verify_unique_names: bool,
}

fn backend_config(args: &InitArgs) -> Result<BackendConfig> {
    match args.backend.as_str() {
        "local" => {
            let path = args
                .path
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--path required for local backend"))?;
            Ok(BackendConfig::Local { path })
        }
        "s3" => {
            let required = |value: &Option<String>, flag: &str| {
                value
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("--{flag} required for S3 backend"))
            };
            Ok(BackendConfig::S3 {
                endpoint: required(&args.endpoint, "endpoint")?,
                region: args.region.clone(),
                bucket: required(&args.bucket, "bucket")?,
                access_key: required(&args.access_key, "access-key")?,
                secret_key: required(&args.secret_key, "secret-key")?,
                prefix: args.prefix.clone(),
            })
        }
        other => anyhow::bail!("unknown backend: {other} (supported: local, s3)"),
    }
}

pub async fn run(args: InitArgs) -> Result<()> {
    let backend = backend_config(&args)?;
    let options = StoreOptions {
        batch_concurrency: args.batch_concurrency,
        verify_unique_names: args.verify_unique_names,
    };

    // Opening creates a local root; listing proves the medium answers.
    let store = ImageStore::with_options(backend.open()?, options);
    let existing = store
        .list_all()
        .await
        .context("storage backend is not reachable")?;

    let config = AppConfig {
        storage: StorageConfig { options, backend },
    };
    config.save()?;

    info!(
        backend = store.backend_kind(),
        existing = existing.len(),
        config_path = %AppConfig::config_path().display(),
        "Storage configured"
    );
    println!("Storage initialized ({} images present).", existing.len());
    println!("Config: {}", AppConfig::config_path().display());
    Ok(())
}

//! medialib CLI — query and upload against configured media services
//!
//! Usage:
//!   medialib-cli services                          List registered services
//!   medialib-cli search <query> [--service s3]     Search a service
//!   medialib-cli upload <files..> [--prefix p]     Upload files
//!
//! Credentials come from --credentials or the MEDIALIB_CREDENTIALS env var,
//! as `accountId:accessKeyId:secretAccessKey:bucket[:region][:customDomain]`.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use medialib::prefs::{credential_key, MemoryPreferenceStore, PreferenceStore};
use medialib::{ServiceContext, ServiceRegistry, ServiceSettings, UploadFile};

const CREDENTIALS_ENV: &str = "MEDIALIB_CREDENTIALS";

#[derive(Parser)]
#[command(
    name = "medialib-cli",
    about = "medialib CLI — media library search and upload",
    version,
    long_about = "Query and upload against S3-compatible buckets and other registered media services."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered services and their capabilities
    Services,
    /// Search a service for assets
    Search {
        /// Search text (empty lists everything)
        #[arg(default_value = "")]
        query: String,
        /// Service id (see `services`)
        #[arg(long, default_value = "s3")]
        service: String,
        /// Credential string (falls back to MEDIALIB_CREDENTIALS)
        #[arg(long)]
        credentials: Option<String>,
        /// Key prefix to list under
        #[arg(long)]
        prefix: Option<String>,
        /// Custom public domain for asset URLs
        #[arg(long)]
        domain: Option<String>,
    },
    /// Upload files to a service
    Upload {
        /// Local files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Service id (see `services`)
        #[arg(long, default_value = "s3")]
        service: String,
        /// Credential string (falls back to MEDIALIB_CREDENTIALS)
        #[arg(long)]
        credentials: Option<String>,
        /// Key prefix to upload under
        #[arg(long)]
        prefix: Option<String>,
        /// Custom public domain for asset URLs
        #[arg(long)]
        domain: Option<String>,
    },
}

fn resolve_credentials(
    flag: Option<String>,
    store: &dyn PreferenceStore,
    service_id: &str,
) -> Result<String> {
    if let Some(creds) = flag {
        store.set(&credential_key(service_id), &creds);
        return Ok(creds);
    }
    if let Some(creds) = store.get(&credential_key(service_id)) {
        return Ok(creds);
    }
    if let Ok(creds) = std::env::var(CREDENTIALS_ENV) {
        return Ok(creds);
    }
    bail!("no credentials: pass --credentials or set {}", CREDENTIALS_ENV)
}

/// Reject obviously malformed custom domains before any request is signed
fn validate_domain(domain: &Option<String>) -> Result<()> {
    if let Some(domain) = domain {
        let candidate = if domain.contains("://") {
            domain.clone()
        } else {
            format!("https://{}", domain)
        };
        url::Url::parse(&candidate).with_context(|| format!("invalid domain: {}", domain))?;
    }
    Ok(())
}

fn build_context(credentials: String, prefix: Option<String>, domain: Option<String>) -> ServiceContext {
    ServiceContext {
        api_key: Some(credentials),
        user_name: None,
        password: None,
        settings: ServiceSettings {
            public_path: true,
            custom_domain: domain,
            path_prefix: prefix,
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let registry = ServiceRegistry::with_defaults();
    let store = MemoryPreferenceStore::new();

    match cli.command {
        Commands::Services => {
            for d in registry.descriptors() {
                println!(
                    "{:<12} {:<24} type={:?} auth={:?} hotlinking={}",
                    d.service_id, d.service_label, d.service_type, d.auth_type, d.hotlinking
                );
            }
        }
        Commands::Search {
            query,
            service,
            credentials,
            prefix,
            domain,
        } => {
            let svc = registry.get(&service)?;
            let creds = resolve_credentials(credentials, &store, &service)?;
            validate_domain(&domain)?;
            let ctx = build_context(creds, prefix, domain);

            let assets = svc.search(&query, &ctx).await?;
            if assets.is_empty() {
                println!("No results.");
            }
            for asset in assets {
                println!(
                    "{:<10} {:>10}  {}  {}",
                    asset.kind,
                    asset.size,
                    asset.last_modified.format("%Y-%m-%d %H:%M"),
                    asset.file_name
                );
            }
        }
        Commands::Upload {
            files,
            service,
            credentials,
            prefix,
            domain,
        } => {
            let svc = registry.get(&service)?;
            let creds = resolve_credentials(credentials, &store, &service)?;
            validate_domain(&domain)?;
            let ctx = build_context(creds, prefix, domain);

            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .with_context(|| format!("bad file name: {}", path.display()))?
                    .to_string();
                let content_type = mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string();
                uploads.push(UploadFile {
                    name,
                    content_type,
                    bytes,
                });
            }

            let bar = ProgressBar::new(uploads.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );

            // Sequential, like the service itself: upload one at a time so
            // a failure report points at the exact file.
            let mut stored = Vec::new();
            for file in uploads {
                bar.set_message(file.name.clone());
                let mut assets = svc.upload(std::slice::from_ref(&file), &ctx).await?;
                stored.append(&mut assets);
                bar.inc(1);
            }
            bar.finish_and_clear();

            for asset in stored {
                println!("{}  {}", asset.id, asset.download_url);
            }
        }
    }

    Ok(())
}

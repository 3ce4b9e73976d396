//! # XSOARCTL CLI
//!
//! Command-line interface for XSOAR/XSIAM client configuration and the
//! content-pack artifact repository.
//!
//! ## Usage
//!
//! ```bash
//! # Validate the client configuration (token is never printed)
//! xsoarctl config --server-version 8 --server-url https://xsiam.example.com
//!
//! # Upload a pack archive to the configured artifact store
//! ARTIFACTS_LOCATION=Azure xsoarctl artifacts upload ./MyPack.zip content/packs/MyPack/1.0.0/MyPack.zip
//!
//! # Highest stored version of a pack
//! xsoarctl artifacts latest MyPack
//! ```
//!
//! A `.env` file in the working directory is loaded before settings are
//! resolved.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use std::path::PathBuf;
use xsoar_client::config::{ClientConfig, ClientOptions, ProcessEnvironment, VerifySsl};
use xsoar_client::observability::metrics;
use xsoar_client::provider::{create_provider, ArtifactProvider, ProviderConfig};

/// XSOAR/XSIAM client CLI
#[derive(Parser)]
#[command(name = "xsoarctl")]
#[command(about = "XSOAR/XSIAM client configuration and content-pack artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the client configuration and print a redacted summary
    Config {
        /// Server major version: 6 (XSOAR) or 8 (XSIAM)
        #[arg(long)]
        server_version: u32,

        /// API token (defaults to DEMISTO_API_KEY)
        #[arg(long)]
        api_token: Option<String>,

        /// Server URL (defaults to DEMISTO_BASE_URL)
        #[arg(long)]
        server_url: Option<String>,

        /// XSIAM auth id (defaults to XSIAM_AUTH_ID, version 8 only)
        #[arg(long)]
        xsiam_auth_id: Option<String>,

        /// Author name marking a pack as custom (repeatable)
        #[arg(long = "custom-pack-author")]
        custom_pack_authors: Vec<String>,

        /// `true`, `false` or the path of a PEM CA bundle
        #[arg(long, default_value = "false")]
        verify_ssl: VerifySsl,
    },
    /// Work with the content-pack artifact store
    Artifacts {
        /// Artifact store: S3 or Azure (defaults to ARTIFACTS_LOCATION, then S3)
        #[arg(long, global = true)]
        location: Option<String>,

        /// Print provider metrics in Prometheus text format when done
        #[arg(long, global = true)]
        print_metrics: bool,

        #[command(subcommand)]
        command: ArtifactCommands,
    },
}

#[derive(Subcommand)]
enum ArtifactCommands {
    /// Upload a local archive under a remote key
    Upload { file: PathBuf, key: String },
    /// Download a remote key to a local path
    Download { key: String, destination: PathBuf },
    /// List artifacts under a prefix
    List {
        #[arg(default_value = paths::PACKS_ROOT)]
        prefix: String,
    },
    /// Show the highest stored version of a pack
    Latest { pack_id: String },
    /// Check whether a pack version is stored
    Exists { pack_id: String, version: String },
    /// Check that the bucket or container is reachable
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider before any TLS connection is created
    let _ = rustls::crypto::ring::default_provider().install_default();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("Failed to load .env file");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xsoarctl=info,xsoar_client=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config {
            server_version,
            api_token,
            server_url,
            xsiam_auth_id,
            custom_pack_authors,
            verify_ssl,
        } => {
            let options = ClientOptions {
                api_token,
                server_url,
                xsiam_auth_id,
                custom_pack_authors,
                verify_ssl,
            };
            config_command(server_version, options)
        }
        Commands::Artifacts {
            location,
            print_metrics,
            command,
        } => {
            metrics::register_metrics().context("Failed to register metrics")?;
            artifacts_command(location.as_deref(), command).await?;
            if print_metrics {
                print!("{}", metrics::gather_metrics().context("Failed to gather metrics")?);
            }
            Ok(())
        }
    }
}

fn config_command(server_version: u32, options: ClientOptions) -> Result<()> {
    let config = ClientConfig::build(server_version, options)
        .context("Invalid client configuration")?;
    config
        .http_client()
        .context("Failed to build HTTP client from configuration")?;

    println!("Client configuration:");
    println!("  Server Version: {}", config.server_version());
    println!("  Server URL: {}", config.server_url());
    println!("  API Token: <redacted>");
    println!(
        "  XSIAM Auth ID: {}",
        if config.xsiam_auth_id().is_some() {
            "<redacted>"
        } else {
            "-"
        }
    );
    if config.custom_pack_authors().is_empty() {
        println!("  Custom Pack Authors: -");
    } else {
        println!(
            "  Custom Pack Authors: {}",
            config.custom_pack_authors().join(", ")
        );
    }
    let verify = match config.verify_ssl() {
        VerifySsl::Disabled => "disabled".to_string(),
        VerifySsl::Enabled => "enabled".to_string(),
        VerifySsl::CustomCaBundle(path) => format!("CA bundle {}", path.display()),
    };
    println!("  TLS Verification: {verify}");

    Ok(())
}

async fn artifacts_command(location: Option<&str>, command: ArtifactCommands) -> Result<()> {
    let provider_config = ProviderConfig::from_env_with_location(location, &ProcessEnvironment)
        .context("Invalid artifact store configuration")?;
    let provider: Box<dyn ArtifactProvider> =
        create_provider(provider_config, &ProcessEnvironment)
            .await
            .context("Failed to connect to the artifact store")?;

    match command {
        ArtifactCommands::Upload { file, key } => {
            let location = provider
                .upload(&file, &key)
                .await
                .with_context(|| format!("Failed to upload {}", file.display()))?;
            println!("Uploaded {} to {}", file.display(), location.uri);
            if let Some(checksum) = location.checksum {
                println!("  sha256: {checksum}");
            }
        }
        ArtifactCommands::Download { key, destination } => {
            let path = provider
                .download(&key, &destination)
                .await
                .with_context(|| format!("Failed to download '{key}'"))?;
            println!("Downloaded {key} to {}", path.display());
        }
        ArtifactCommands::List { prefix } => {
            let artifacts: Vec<_> = provider
                .list(&prefix)
                .try_collect()
                .await
                .with_context(|| format!("Failed to list artifacts under '{prefix}'"))?;

            if artifacts.is_empty() {
                println!("No artifacts found under '{prefix}'.");
                return Ok(());
            }

            println!("{:<70} {:>12} {:<25}", "KEY", "SIZE", "LAST MODIFIED");
            println!("{}", "-".repeat(109));
            for artifact in artifacts {
                let size = artifact
                    .size
                    .map_or_else(|| "-".to_string(), |size| size.to_string());
                let modified = artifact
                    .last_modified
                    .map_or_else(|| "-".to_string(), |time| time.to_rfc3339());
                println!("{:<70} {:>12} {:<25}", artifact.key, size, modified);
            }
        }
        ArtifactCommands::Latest { pack_id } => {
            match provider
                .latest_pack_version(&pack_id)
                .await
                .with_context(|| format!("Failed to find versions of '{pack_id}'"))?
            {
                Some(version) => println!("{pack_id} {version}"),
                None => println!("No stored versions of {pack_id}"),
            }
        }
        ArtifactCommands::Exists { pack_id, version } => {
            let available = provider
                .is_pack_available(&pack_id, &version)
                .await
                .with_context(|| format!("Failed to look up '{pack_id}' {version}"))?;
            println!("{pack_id} {version}: {}", if available { "present" } else { "absent" });
        }
        ArtifactCommands::Test => {
            provider
                .test_connection()
                .await
                .context("Artifact store is not reachable")?;
            println!(
                "Connected to {} {}",
                provider.kind(),
                provider.container()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_requires_server_version() {
        let err = Cli::try_parse_from(["xsoarctl", "config", "--server-url", "https://x.example.com"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_config_server_version_flag() {
        let cli = Cli::try_parse_from(["xsoarctl", "config", "--server-version", "8"]).unwrap();
        match cli.command {
            Commands::Config { server_version, .. } => assert_eq!(server_version, 8),
            Commands::Artifacts { .. } => panic!("expected config command"),
        }
    }

    #[test]
    fn test_artifact_commands_need_no_server_version() {
        let cli = Cli::try_parse_from(["xsoarctl", "artifacts", "latest", "MyPack"]).unwrap();
        assert!(matches!(cli.command, Commands::Artifacts { .. }));
    }
}

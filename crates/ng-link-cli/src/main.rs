//! ng-link-cli - Command-line interface for building Neuroglancer links
//!
//! This crate provides the `ng-link` binary, including:
//! - Link generation for ExaSPIM and HCR OME-Zarr datasets in S3
//! - Encoding and decoding of viewer-state descriptors
//! - Optional, non-fatal descriptor upload

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ng_link_core::{Error, LinkConfig};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cloud_handler;
mod generate;
mod progress;

use generate::GenerateArgs;

/// ng-link - Build shareable Neuroglancer links for microscopy datasets
///
/// ng-link reads OME-Zarr metadata from S3, writes a viewer-state descriptor
/// and prints the encoded Neuroglancer URL.
#[derive(Parser)]
#[command(name = "ng-link")]
#[command(author, version, about = "Build shareable Neuroglancer links for OME-Zarr datasets", long_about = None)]
struct Cli {
    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except results
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show a spinner during long operations
    #[arg(long, global = true)]
    progress: bool,

    /// Configuration file to use instead of the user config
    #[arg(long, global = true, env = "NG_LINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a descriptor for a dataset and print its viewer URL
    Generate(GenerateArgs),

    /// Encode an existing descriptor file into a viewer URL
    Encode {
        /// Descriptor JSON file
        descriptor: PathBuf,

        /// Viewer base URL
        #[arg(long)]
        viewer_base: Option<String>,

        /// Drop the descriptor's ng_link entry before encoding
        #[arg(long)]
        state_only: bool,
    },

    /// Decode the viewer state carried by a URL
    Decode {
        /// Viewer URL containing `#!<state>`
        url: String,
    },

    /// Split an s3:// URI into bucket and parent directory
    Parse {
        /// Dataset URI
        uri: String,
    },

    /// Upload a file to S3
    Upload {
        /// Local file
        file: PathBuf,

        /// Target bucket
        #[arg(long)]
        bucket: String,

        /// Target key
        #[arg(long)]
        key: String,

        /// Send unsigned requests
        #[arg(long)]
        anonymous: bool,

        /// AWS region
        #[arg(long)]
        region: Option<String>,

        /// Custom S3 endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Show or create configuration
    Config {
        /// Show current configuration
        #[arg(long, conflicts_with_all = ["init", "path"])]
        show: bool,

        /// Write the default configuration file if none exists
        #[arg(long, conflicts_with_all = ["show", "path"])]
        init: bool,

        /// Show configuration file path
        #[arg(long, conflicts_with_all = ["show", "init"])]
        path: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    // Quiet still reports the fatal error
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version requests are not errors
            let exit_code = if e.use_stderr() { 3 } else { 0 };
            let _ = e.print();
            process::exit(exit_code);
        }
    };

    setup_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(_) => process::exit(0),
        Err(e) => {
            error!("Error: {:#}", e);

            let exit_code = map_error_to_exit_code(&e);
            process::exit(exit_code);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            let mut config = load_config(cli.config.as_deref())?;
            args.apply(&mut config);
            let url = generate::run_generate(&config, cli.progress)?;
            println!("{}", url);
        }

        Commands::Encode {
            descriptor,
            viewer_base,
            state_only,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let viewer_base = viewer_base.unwrap_or(config.viewer.base_url);
            info!("Encoding {:?}", descriptor);
            let url = ng_link_core::encode_descriptor_file(&descriptor, &viewer_base, state_only)
                .with_context(|| format!("Failed to read descriptor {:?}", descriptor))?;
            println!("{}", url);
        }

        Commands::Decode { url } => {
            let state = ng_link_core::encode::decode_fragment(&url)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }

        Commands::Parse { uri } => {
            let location = ng_link_core::parse_s3_path(&uri)?;
            let parsed = serde_json::json!({
                "bucket": location.bucket(),
                "parent_directory": location.parent_directory(),
                "key": location.key(),
            });
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }

        Commands::Upload {
            file,
            bucket,
            key,
            anonymous,
            region,
            endpoint,
        } => {
            let options = ng_link_cloud::S3Options {
                region,
                endpoint,
                anonymous,
            };
            info!("Uploading {:?} to s3://{}/{}", file, bucket, key);
            let written = ng_link_cloud::upload_to_s3(&file, &bucket, &key, &options)?;
            info!("Uploaded {} bytes", written);
        }

        Commands::Config { show, init, path } => {
            let config_path = match &cli.config {
                Some(path) => path.clone(),
                None => LinkConfig::config_path()?,
            };

            if show {
                let config = load_config(cli.config.as_deref())?;
                let toml_str = toml::to_string_pretty(&config)?;
                println!("{}", toml_str);
            } else if init {
                if config_path.exists() {
                    info!("Configuration already exists at {:?}", config_path);
                } else {
                    if let Some(parent) = config_path.parent() {
                        std::fs::create_dir_all(parent).with_context(|| {
                            format!("Failed to create config directory {:?}", parent)
                        })?;
                    }
                    std::fs::write(&config_path, LinkConfig::default_config_content())
                        .with_context(|| format!("Failed to write {:?}", config_path))?;
                    info!("Created default configuration at {:?}", config_path);
                }
                println!("{}", config_path.display());
            } else if path {
                println!("{}", config_path.display());
            } else {
                eprintln!("Please specify --show, --init, or --path");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<LinkConfig> {
    let config = match path {
        Some(path) => LinkConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => LinkConfig::load()?,
    };
    Ok(config)
}

/// Map errors to exit codes:
/// - 0: Success
/// - 1: General error (generator, configuration, storage)
/// - 2: IO error, including a descriptor that never appeared
/// - 3: Invalid input (bad URI, malformed JSON)
fn map_error_to_exit_code(err: &anyhow::Error) -> i32 {
    if let Some(core_err) = err.downcast_ref::<Error>() {
        match core_err {
            Error::Io(_) => 2,
            Error::DescriptorMissing { .. } => 2,
            Error::InvalidUri(_) => 3,
            Error::Json(_) => 3,
            Error::Config(_) => 1,
            Error::Metadata(_) => 1,
            Error::Generator(_) => 1,
            Error::Storage(_) => 1,
        }
    } else if let Some(upload_err) = err.downcast_ref::<ng_link_cloud::UploadError>() {
        match upload_err {
            ng_link_cloud::UploadError::LocalFile { .. } => 2,
            _ => 1,
        }
    } else if err.is::<std::io::Error>() {
        2
    } else if err.is::<serde_json::Error>() {
        3
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exit_codes() {
        let missing = anyhow::Error::from(Error::DescriptorMissing {
            path: PathBuf::from("results/process_output.json"),
            waited: Duration::from_secs(1),
        });
        assert_eq!(map_error_to_exit_code(&missing), 2);

        let uri = anyhow::Error::from(Error::InvalidUri("gs://x".to_string()));
        assert_eq!(map_error_to_exit_code(&uri), 3);

        let generator = anyhow::Error::from(Error::Generator("no zarr".to_string()))
            .context("Link generation failed");
        assert_eq!(map_error_to_exit_code(&generator), 1);

        let io = anyhow::Error::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(map_error_to_exit_code(&io), 2);

        let unreadable = anyhow::Error::from(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        )))
        .context("Failed to read descriptor \"process_output.json\"");
        assert_eq!(map_error_to_exit_code(&unreadable), 2);
        let chain = format!("{:#}", unreadable);
        assert_eq!(chain.matches("missing").count(), 1);
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "ng-link",
            "generate",
            "--zarr-path",
            "s3://aind-open-data/exa/SPIM.ome.zarr",
            "--vmax",
            "500",
            "--dataset-type",
            "hcr",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Generate(_)));
    }

    #[test]
    fn test_cli_rejects_unknown_dataset_type() {
        let result = Cli::try_parse_from([
            "ng-link",
            "generate",
            "--zarr-path",
            "s3://b/a/d.zarr",
            "--dataset-type",
            "lightsheet",
        ]);
        assert!(result.is_err());
    }
}

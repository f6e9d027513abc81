mod commands;
mod config;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::ScanArgs;
use crate::config::{
    load_auth_token, load_config, load_config_from, resolve_api_base, resolve_catalog_path,
};

#[derive(Parser)]
#[command(name = "gscan")]
#[command(about = "Galley tools for QR inventory scanning", long_about = None)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the product catalog CSV
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Base URL of the inventory API
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the products in the catalog
    Catalog {
        /// Reload the file and report whether it changed
        #[arg(long)]
        reload: bool,
    },

    /// Resolve a scanned payload against the catalog
    Resolve {
        payload: String,
    },

    /// Decode QR codes in a still image
    Decode {
        image: PathBuf,

        /// Write the annotated frame to this file
        #[arg(long)]
        annotate: Option<PathBuf>,
    },

    /// Run a scan session over a directory of frames
    Scan {
        /// Directory of PNG/JPEG frames, read in name order
        #[arg(long)]
        frames: PathBuf,

        /// Export the history as CSV when the session ends
        #[arg(long)]
        export: Option<PathBuf>,

        /// JSON history file to continue from and save to
        #[arg(long)]
        history: Option<PathBuf>,

        /// Save annotated frames with detections into this directory
        #[arg(long)]
        annotate_dir: Option<PathBuf>,

        /// Override the cycle limit
        #[arg(long)]
        max_cycles: Option<usize>,

        /// Override the frame rate
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Show, export or clear a saved history
    History {
        file: PathBuf,

        /// Export as CSV
        #[arg(long)]
        export: Option<PathBuf>,

        /// Remove all records from the file
        #[arg(long)]
        clear: bool,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config(),
    };
    let catalog_path = resolve_catalog_path(cli.catalog, &config);

    match cli.command {
        Command::Catalog { reload } => commands::catalog(&catalog_path, reload)?,
        Command::Resolve { payload } => commands::resolve_payload(&catalog_path, &payload),
        Command::Decode { image, annotate } => commands::decode(&catalog_path, &image, annotate)?,
        Command::Scan {
            frames,
            export,
            history,
            annotate_dir,
            max_cycles,
            fps,
        } => {
            let mut scan_config = config.scanner.scan_config();
            if let Some(max_cycles) = max_cycles {
                scan_config.max_cycles = max_cycles;
            }
            if let Some(fps) = fps {
                scan_config = scan_config.with_frames_per_second(fps);
            }

            commands::scan(ScanArgs {
                catalog_path,
                frames,
                api_base: resolve_api_base(cli.api_base, &config),
                publish_timeout: config.scanner.publish_timeout(),
                config: scan_config,
                session: config.session.context(load_auth_token()),
                history,
                export,
                annotate_dir,
            })
            .await?;
        }
        Command::History {
            file,
            export,
            clear,
        } => commands::history(&file, export, clear)?,
    }

    Ok(())
}

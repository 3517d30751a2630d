// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lutrin — book-page reading stand
//
// Entry point. Initialises logging and backend services, then runs one
// operator command.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use lutrin_core::error::{LutrinError, Result};
use lutrin_core::human_errors::humanize_error;
use lutrin_core::{CameraStatus, CaptureOutcome};

use services::app_services::AppServices;

#[derive(Parser)]
#[command(name = "lutrin")]
#[command(about = "Photograph book spreads, straighten the pages and read them in order")]
#[command(version)]
struct Cli {
    /// Use an in-memory camera instead of the hardware driver.
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the camera and report the negotiated resolutions.
    Status,

    /// Stream preview frames.
    Preview {
        /// Number of frames to pull before stopping.
        #[arg(long, default_value = "30")]
        frames: usize,

        /// Directory to write the frames into as JPEG.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Take a full-resolution still.
    Capture {
        /// File or directory to write to (default: the captures directory).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Straighten, rescale and binarise a page photograph.
    Normalize {
        /// Input image (JPEG or PNG).
        input: PathBuf,

        /// Where to write the normalised page as PNG.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Put recognised text fragments (JSON) into reading order.
    Reconstruct {
        /// JSON array of `{ "text", "polygon": [{ "x", "y" }, ...] }`.
        fragments: PathBuf,

        /// Print the full transcript as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },

    /// Capture, normalise, recognise and order one spread.
    Read {
        /// Directory holding the OCR models (default: the ocrs cache).
        #[arg(long)]
        models: Option<PathBuf>,
    },

    /// Write the active configuration to config.json.
    InitConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!("Lutrin starting");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            let human = humanize_error(&err);
            eprintln!("{}\n{}", human.message, human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let svc = AppServices::init(cli.simulate)?;

    match cli.command {
        Commands::Status => match svc.status() {
            CameraStatus::Ready { maximum, streaming } => {
                println!(
                    "ready: capture {}{}, preview {}{}",
                    maximum.resolution,
                    if maximum.confirmed { "" } else { " (fallback)" },
                    streaming.resolution,
                    if streaming.confirmed { "" } else { " (unconfirmed)" },
                );
            }
            CameraStatus::Disabled { reason } => println!("disabled: {reason}"),
            CameraStatus::Uninitialized => println!("not initialised"),
        },

        Commands::Preview { frames, output } => {
            let summary = svc.preview(frames, output.as_deref())?;
            if let Some(notice) = summary.unavailable {
                println!("{notice}");
            } else {
                println!("{} frames, {} bytes", summary.frames, summary.bytes);
            }
        }

        Commands::Capture { output } => match svc.capture(output.as_deref())? {
            CaptureOutcome::Saved(path) => println!("{}", path.display()),
            CaptureOutcome::Failed(reason) => return Err(LutrinError::ReadFailure(reason)),
        },

        Commands::Normalize { input, output } => {
            let page = svc.normalize(&input, output.as_deref())?;
            println!(
                "{}x{} page, boundary {}, scale {:.2}",
                page.width(),
                page.height(),
                if page.corners.is_some() { "found" } else { "not found" },
                page.scale,
            );
        }

        Commands::Reconstruct { fragments, json } => {
            let transcript = svc.reconstruct(&fragments)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&transcript)?);
            } else {
                println!("{transcript}");
            }
        }

        Commands::Read { models } => {
            let transcript = read(&svc, models)?;
            println!("{transcript}");
        }

        Commands::InitConfig => {
            let path = svc.persist_config()?;
            println!("{}", path.display());
        }
    }

    svc.shutdown();
    Ok(())
}

#[cfg(feature = "ocr")]
fn read(svc: &AppServices, models: Option<PathBuf>) -> Result<lutrin_core::OrderedTranscript> {
    use lutrin_document::scan::ocr::OcrModels;

    let models = models.map(OcrModels::from_dir).unwrap_or_default();
    let recognizer = lutrin_document::OcrRecognizer::new(&models)?;
    svc.read(&recognizer)
}

#[cfg(not(feature = "ocr"))]
fn read(_svc: &AppServices, _models: Option<PathBuf>) -> Result<lutrin_core::OrderedTranscript> {
    Err(LutrinError::PlatformUnavailable)
}

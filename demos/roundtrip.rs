//! Encodes a file into a QR video and decodes it back, end to end.
//!
//! ```text
//! cargo run --example roundtrip -- encode payload.bin video.gif
//! cargo run --example roundtrip -- decode video.gif recovered.bin
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use qrvid::prelude::*;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(about = "Encode a file into a QR video, or decode one back")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a payload file into a QR video.
    Encode {
        payload: PathBuf,
        video: PathBuf,

        #[arg(long, value_enum, default_value_t = Level::M)]
        level: Level,

        #[arg(long)]
        chunk_size: Option<u32>,

        #[arg(long)]
        workers: Option<u32>,

        #[arg(long)]
        sequential: bool,

        #[arg(long)]
        base64: bool,
    },

    /// Decode a QR video back into a payload file.
    Decode {
        video: PathBuf,
        payload: PathBuf,

        #[arg(long)]
        base64: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    L,
    M,
    Q,
    H,
}

impl From<Level> for ErrorCorrection {
    fn from(level: Level) -> Self {
        match level {
            Level::L => ErrorCorrection::L,
            Level::M => ErrorCorrection::M,
            Level::Q => ErrorCorrection::Q,
            Level::H => ErrorCorrection::H,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Encode { payload, video, level, chunk_size, workers, sequential, base64 } => {
            let bytes = fs::read(&payload)?;
            let config = EncodingConfiguration {
                error_correction: level.into(),
                chunk_size,
                enable_multiprocessing: !sequential,
                max_workers: workers,
                ..Default::default()
            };

            if base64 {
                Pipeline::new(Base64Serializer).encode(&bytes, &config, &video)?;
            } else {
                Pipeline::default().encode(&bytes, &config, &video)?;
            }

            log::info!("wrote {} to {}", video.display(), payload.display());
            Ok(())
        }

        Command::Decode { video, payload, base64 } => {
            let recovered = if base64 {
                Pipeline::new(Base64Serializer).decode(Some(&video), None, Default::default())?
            } else {
                Pipeline::default().decode(Some(&video), None, Default::default())?
            };

            fs::write(&payload, &recovered)?;
            log::info!("recovered {} bytes to {}", recovered.len(), payload.display());
            Ok(())
        }
    }
}

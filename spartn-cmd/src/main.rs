mod decode;
mod info;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a file of SPARTN frames.
    Info {
        /// Input file. Data between frames is skipped.
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,
    },
    /// Decode SPARTN frames, writing one JSON object per frame to stdout.
    Decode {
        /// Input file. Data between frames is skipped.
        input: PathBuf,

        /// Decrypt encrypted payloads.
        ///
        /// Requires a key, either using --key or the MQTTKEY environment variable.
        #[arg(short, long, action)]
        decrypt: bool,

        /// 128-bit AES key as 32 hexadecimal characters.
        #[arg(short, long, value_name = "hex")]
        key: Option<String>,

        /// Do not validate frame CRCs.
        #[arg(long, action)]
        no_validate: bool,

        /// Absolute 32-bit time tag, seconds since 2010-01-01T00:00:00 GPST, used to
        /// expand 16-bit time tags when decrypting.
        ///
        /// Frames with 32-bit time tags update this time as they are decoded.
        #[arg(short, long, value_name = "seconds")]
        anchor: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("SPARTN_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Info { input, format } => info::info(input, format),
        Commands::Decode {
            input,
            decrypt,
            key,
            no_validate,
            anchor,
        } => decode::decode(
            input,
            &decode::Options {
                decrypt: *decrypt,
                key: key.clone(),
                validate: !no_validate,
                anchor: *anchor,
            },
        ),
    }
}

#[macro_use]
extern crate tracing;

use std::env;
use std::fs;
use std::io::{self, BufWriter, Write as _};
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use touchflow::input::DispatchPipeline;
use touchflow::replay::{parse_trace, PanSpec, Replay};
use touchflow_config::Config;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "touchflow=debug";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Sub,
}

#[derive(Subcommand)]
enum Sub {
    /// Replay a recorded pointer trace and print delivered events as JSON lines.
    Replay {
        /// Path to a KDL config file with resampling settings.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Resample every vsync in accelerate mode.
        #[arg(long)]
        accelerate: bool,
        /// Feed events to a pan recognizer, given as FINGERS:DIRECTION:DISTANCE.
        #[arg(long)]
        pan: Option<PanSpec>,
        /// Trace file to replay.
        trace: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Sub::Replay {
            config,
            accelerate,
            pan,
            trace,
        } => {
            let config = match config {
                Some(path) => Config::load(&path).map_err(|err| anyhow!("{err:?}"))?,
                None => Config::default(),
            };

            let text = fs::read_to_string(&trace)
                .with_context(|| format!("error reading {trace:?}"))?;
            let records = parse_trace(&text).with_context(|| format!("error parsing {trace:?}"))?;
            debug!("replaying {} records from {trace:?}", records.len());

            let mut replay = Replay::new(DispatchPipeline::from_config(&config), accelerate);
            if let Some(pan) = pan {
                replay = replay.with_pan(pan, config.display.density.0);
            }

            let mut out = BufWriter::new(io::stdout().lock());
            replay.run(&records, &mut out)?;
            out.flush().context("error flushing output")?;
        }
    }

    Ok(())
}

//! Hiring warehouse loader binary.
//!
//! Reads the raw hiring workbook, maps it into the dimensional model and loads the
//! warehouse configured for the current environment. Prints a one-line summary of the run.

use crate::config::load_loader_config;
use crate::core::run_loader;
use crate::error::{LoaderError, LoaderResult};

use clap::Parser;
use ::config::shared::LoaderConfig;
use etl::pipeline::RunSummary;
use std::path::PathBuf;
use std::process::ExitCode;
use telemetry::init_tracing;
use tracing::{error, info};

mod config;
mod core;
mod error;

#[derive(Debug, Parser)]
#[command(name = "loader", about = "Loads the hiring workbook into the dimensional warehouse")]
struct Args {
    /// Directory holding `base` and environment configuration files.
    ///
    /// Defaults to `./configuration`.
    #[arg(long)]
    config_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err.summary_line());
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> LoaderResult<RunSummary> {
    let loader_config = load_loader_config(args.config_dir.as_deref())?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(LoaderError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(loader_config))
}

async fn async_main(loader_config: LoaderConfig) -> LoaderResult<RunSummary> {
    match run_loader(loader_config).await {
        Ok(summary) => {
            info!(
                changed = summary.changed,
                fact_rows = summary.fact_rows,
                "loader finished"
            );
            Ok(summary)
        }
        Err(err) => {
            error!(category = err.category(), "loader failed: {err}");
            Err(err)
        }
    }
}

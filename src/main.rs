//! defrag - Parallel Chunk Reassembler
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use defrag::config::{CliArgs, DefragConfig, USAGE};
use defrag::progress::{print_header, print_summary};
use defrag::{DefragError, Defragmenter};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            print!("{}", e.render());
            println!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            // Usage-class problems go to stdout alongside the usage line
            if e.downcast_ref::<DefragError>().is_some_and(DefragError::is_usage) {
                println!("Error: {:#}", e);
                println!("{}", USAGE);
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = DefragConfig::from_args(args).map_err(DefragError::from)?;

    if config.show_progress {
        print_header(&config.input_dir, &config.output_path);
    }

    let show_progress = config.show_progress;
    let output_path = config.output_path.clone();

    let result = Defragmenter::new(config)
        .run()
        .context("Reassembly failed")?;

    if show_progress {
        print_summary(&result, &output_path);
    }

    if result.collected.subtrees_skipped > 0 || result.launch_failures > 0 {
        info!(
            subtrees_skipped = result.collected.subtrees_skipped,
            launch_failures = result.launch_failures,
            "Reassembly completed with skipped subtrees"
        );
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("defrag=debug,warn")
    } else {
        EnvFilter::new("defrag=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

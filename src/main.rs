//! loopchain command line interface
//!
//! Usage:
//!   loopchain [OPTIONS] <pipeline.json>
//!   loopchain --help
//!
//! Examples:
//!   loopchain jacobi.json                  # Generate code for the pipeline
//!   loopchain --emit=iscc jacobi.json      # Print the iscc script instead
//!   loopchain --emit=shifts jacobi.json    # Only solve the automatic shifts
//!   loopchain -o out.c -vv jacobi.json     # Write code, log every fragment

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use loopchain::config::PipelineConfig;
use loopchain::ilp::BranchAndBound;
use loopchain::transform::compute_shift_tuples_for_fusion;
use std::fs;
use std::path::PathBuf;

/// Polyhedral loop-chain scheduler
#[derive(Parser, Debug)]
#[command(name = "loopchain")]
#[command(version)]
#[command(about = "Schedule a chain of loop nests and generate code", long_about = None)]
struct Cli {
    /// Pipeline description (JSON)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to emit
    #[arg(long, default_value = "code")]
    emit: EmitKind,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// Generated C code
    Code,
    /// The iscc script
    Iscc,
    /// The loop AST iscc produced
    Ast,
    /// Minimal fusion shifts of the chain
    Shifts,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("loopchain v{}", loopchain::VERSION);
    debug!("Input file: {:?}", cli.input);

    let config = PipelineConfig::from_file(&cli.input)
        .with_context(|| format!("Failed to load pipeline: {:?}", cli.input))?;

    let output = match cli.emit {
        EmitKind::Shifts => {
            let chain = config.build_chain().context("Invalid loop chain")?;
            let shifts = compute_shift_tuples_for_fusion(&chain, true, &BranchAndBound::default())
                .context("Automatic shifting failed")?;
            shifts
                .iter()
                .map(|(k, t)| format!("loop {}: {}", k, t))
                .collect::<Vec<_>>()
                .join("\n")
        }
        EmitKind::Iscc => config.build_schedule().context("Scheduling failed")?.codegen_to_iscc(),
        EmitKind::Ast => {
            let schedule = config.build_schedule().context("Scheduling failed")?;
            format!("{:#?}", schedule.codegen_ast().context("Code generation failed")?)
        }
        EmitKind::Code => config
            .build_schedule()
            .context("Scheduling failed")?
            .codegen_with(&config.codegen)
            .context("Code generation failed")?,
    };

    write_output(&cli.output, &output)
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).with_context(|| format!("Failed to write output file: {:?}", p))?;
            info!("Wrote {:?}", p);
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

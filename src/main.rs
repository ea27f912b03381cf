mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{CliArgs, SubCommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rx::{Compressor, Extractor, RunContext, RunSummary, Worker, finder};
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    setup_logging(args.verbose, args.progress);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Could not run:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    let root = args.subcommand.path().cloned().unwrap_or_else(|| cwd.clone());
    check_path(&root)?;

    let output = args.output.unwrap_or(cwd);
    fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;
    info!("Output directory: {}", output.display().to_string().green());

    let workers = args
        .workers
        .or_else(|| NonZeroUsize::new(num_cpus::get()))
        .unwrap_or(NonZeroUsize::MIN);
    let ctx = RunContext::new(root, output, args.recursive, workers);
    let progress = progress_bar(args.progress);

    let (summary, verb) = match args.subcommand {
        SubCommand::Compress { .. } => (execute(&Compressor::new(), &ctx, &progress)?, "Compressed:     "),
        SubCommand::Extract { .. } => (execute(&Extractor, &ctx, &progress)?, "Extracted:      "),
    };
    print_summary(&summary, verb);

    Ok(())
}

fn execute<W: Worker>(worker: &W, ctx: &RunContext, progress: &ProgressBar) -> anyhow::Result<RunSummary> {
    rx::run(worker, finder(ctx.recursive()), ctx, progress)
}

fn check_path(path: &Path) -> anyhow::Result<()> {
    match fs::metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            bail!("Path {} does not exist", path.display().to_string().red())
        }
        Err(e) => bail!("Invalid path {}: {}", path.display().to_string().red(), e),
        Ok(meta) if !meta.is_dir() => {
            bail!("Path {} is not a directory", path.display().to_string().red())
        }
        Ok(_) => Ok(()),
    }
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] {pos} files {per_sec:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_summary(summary: &RunSummary, verb: &str) {
    let totals = summary.totals();

    println!("\n{}", "📦 Done!".bold().green());
    println!("{} {}", "Files found:     ".blue(), summary.found);
    println!("{} {}", verb.blue(), totals.done);
    println!("{} {}", "Skipped:         ".yellow(), totals.skipped);
    println!("{} {}", "Failed:          ".red(), totals.failed);
    println!("{} {}", "Errors reported: ".red(), summary.errors);
    println!("{} {:.2} s", "Elapsed time:    ".magenta(), summary.elapsed.as_secs_f64());
}

fn setup_logging(verbose: bool, progress: bool) {
    let default = if verbose {
        "rx=debug"
    } else if progress {
        "rx=warn"
    } else {
        "rx=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

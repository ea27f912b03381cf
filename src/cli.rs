use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Compress individual files into zip archives, or inflate them back.
#[derive(Parser)]
#[command(name = "rx", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub subcommand: SubCommand,

    /// Walk recursively through directories
    #[arg(short, long, global = true)]
    pub recursive: bool,

    /// Output directory, created if missing [default: current directory]
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Number of workers [default: number of CPUs]
    #[arg(short, long, global = true)]
    pub workers: Option<NonZeroUsize>,

    /// Log every step, not just one line per file
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show a progress counter instead of per-file lines
    #[arg(long, global = true)]
    pub progress: bool,
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// Compress each file into its own zip archive
    #[command(alias = "zip")]
    Compress {
        /// Directory to look for files in [default: current directory]
        path: Option<PathBuf>,
    },
    /// Inflate the contents of zip archives
    #[command(alias = "unzip")]
    Extract {
        /// Directory to look for archives in [default: current directory]
        path: Option<PathBuf>,
    },
}

impl SubCommand {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            SubCommand::Compress { path } | SubCommand::Extract { path } => path.as_ref(),
        }
    }
}

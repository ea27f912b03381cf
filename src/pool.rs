//! Fixed-size worker pool fed by a file finder.
//!
//! One producer thread walks the tree, `workers` pool threads compete for the
//! paths it sends, and a sink thread logs whatever goes wrong. [`run`] returns
//! once every worker has drained the file channel and the error channel has
//! been closed behind them.

use crate::context::RunContext;
use crate::error::Origin;
use crate::files::FindFilesFn;
use crate::sink::{ErrorSink, Reporter};
use anyhow::Context;
use crossbeam_channel::Receiver;
use indicatif::ProgressBar;
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};

/// What happened to one input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Not an input this worker handles; nothing was reported.
    Skipped,
    /// At least one error was reported for this file.
    Failed,
}

/// One archive operation, applied to each file a pool thread receives.
pub trait Worker: Sync {
    /// Handle `file` and report any failure through `reporter`.
    fn process(&self, file: &Path, ctx: &RunContext, reporter: &Reporter) -> Outcome;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub done: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Done => self.done += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.done + self.skipped + self.failed
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Paths the finder handed out.
    pub found: usize,
    /// Per-worker counts, indexed by worker number minus one.
    pub workers: Vec<Tally>,
    /// Events drained by the error sink, including finder errors.
    pub errors: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn totals(&self) -> Tally {
        self.workers.iter().fold(Tally::default(), |mut acc, t| {
            acc.done += t.done;
            acc.skipped += t.skipped;
            acc.failed += t.failed;
            acc
        })
    }
}

/// Run `worker` over every file `find` yields under `ctx.root()`.
///
/// Individual failures never abort the run; they are logged by the error sink
/// and counted in the summary. Only setup failures (threads that cannot be
/// started) are returned as errors.
pub fn run<W: Worker>(
    worker: &W,
    find: FindFilesFn,
    ctx: &RunContext,
    progress: &ProgressBar,
) -> anyhow::Result<RunSummary> {
    let start = Instant::now();
    let (sink, reporter) = ErrorSink::spawn()?;

    info!(path = %ctx.root().display(), "Looking for files");
    let files = find(ctx.root(), reporter.clone())?;

    let workers = ctx.workers();
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("rx-worker-{:03}", i + 1))
        .build()
        .context("Failed to build worker pool")?;
    info!("Using {} workers", workers);

    let rx = files.receiver();
    let tallies = pool.broadcast(|bctx| {
        let id = bctx.index() + 1;
        let reporter = reporter.with_origin(Origin::Worker(id));
        drain(id, worker, rx, ctx, &reporter, progress)
    });

    // Workers only return once the finder has closed the file channel, so
    // nothing but the sink can still be holding a reporter after this.
    let found = files.finish();
    drop(reporter);
    let errors = sink.finish();
    progress.finish_and_clear();

    Ok(RunSummary {
        found,
        workers: tallies,
        errors,
        elapsed: start.elapsed(),
    })
}

fn drain<W: Worker>(
    id: usize,
    worker: &W,
    files: &Receiver<PathBuf>,
    ctx: &RunContext,
    reporter: &Reporter,
    progress: &ProgressBar,
) -> Tally {
    let _span = info_span!("worker", id).entered();
    let mut tally = Tally::default();
    for file in files {
        tally.record(worker.process(&file, ctx, reporter));
        progress.inc(1);
    }
    debug!(done = tally.done, skipped = tally.skipped, failed = tally.failed, "No more files");
    tally
}

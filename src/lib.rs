//! rx: compress files one archive per file, or unpack archives, using a pool
//! of workers fed by a streaming directory walk.

pub mod compressor;
pub mod context;
pub mod error;
pub mod extractor;
pub mod files;
pub mod pool;
pub mod sink;

pub use compressor::Compressor;
pub use context::RunContext;
pub use error::{ErrorEvent, Origin, PipelineError};
pub use extractor::Extractor;
pub use files::{FileSequence, FindFilesFn, find_files_in_root_directory, find_recursive, finder};
pub use pool::{Outcome, RunSummary, Tally, Worker, run};
pub use sink::{ErrorSink, Reporter};

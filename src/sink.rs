//! Background error drain.
//!
//! The sink owns the receiving end of the error channel and logs every event
//! as it arrives. Producers hold a [`Reporter`]; the channel closes once the
//! last reporter is dropped, after which [`ErrorSink::finish`] returns.

use crate::error::{ErrorEvent, Origin, PipelineError};
use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::error;

/// Handle used by the enumerator and the workers to report failures.
#[derive(Clone)]
pub struct Reporter {
    tx: Sender<ErrorEvent>,
    origin: Origin,
}

impl Reporter {
    /// Same channel, tagged with a different origin.
    pub fn with_origin(&self, origin: Origin) -> Self {
        Self {
            tx: self.tx.clone(),
            origin,
        }
    }

    pub fn report(&self, error: PipelineError) {
        let event = ErrorEvent {
            origin: self.origin,
            error,
        };
        // Only fails if the sink thread died; keep the message rather than lose it.
        if let Err(e) = self.tx.send(event) {
            error!("{} (error sink unavailable)", e.into_inner());
        }
    }
}

pub struct ErrorSink {
    handle: JoinHandle<usize>,
}

impl ErrorSink {
    /// Start a sink that logs each event through `tracing`.
    pub fn spawn() -> anyhow::Result<(Self, Reporter)> {
        Self::spawn_with(|event| error!("{event}"))
    }

    /// Start a sink that hands each event to `handle`.
    pub fn spawn_with<F>(mut handle: F) -> anyhow::Result<(Self, Reporter)>
    where
        F: FnMut(&ErrorEvent) + Send + 'static,
    {
        let (tx, rx): (Sender<ErrorEvent>, Receiver<ErrorEvent>) = crossbeam_channel::bounded(0);

        let handle = thread::Builder::new()
            .name("rx-errors".into())
            .spawn(move || {
                let mut count = 0;
                for event in rx {
                    handle(&event);
                    count += 1;
                }
                count
            })
            .context("Failed to start error sink thread")?;

        let reporter = Reporter {
            tx,
            origin: Origin::Enumerator,
        };
        Ok((Self { handle }, reporter))
    }

    /// Wait for the channel to close and return how many events were drained.
    ///
    /// Every [`Reporter`] must have been dropped, otherwise this blocks forever.
    pub fn finish(self) -> usize {
        match self.handle.join() {
            Ok(count) => count,
            Err(_) => {
                error!("Error sink thread panicked");
                0
            }
        }
    }
}

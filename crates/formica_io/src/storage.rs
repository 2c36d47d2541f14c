use crate::error::{IoError, Result};
use crate::results::{ResultsLayout, StepFile};
use crate::serialization::write_json_compact;
use serde::Serialize;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// Commands for the background writer thread.
pub enum WriterCommand<R> {
    /// Writes one step file.
    Save(StepFile<R>),
    /// Drains the queue and stops the thread.
    Stop,
}

/// Counts reported by the writer when it shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
}

/// Writes step files off the simulation thread.
///
/// Saves are fire-and-forget: a failed write is logged and counted, never
/// returned to the caller, so a slow or full disk cannot stall the tick loop.
pub struct SnapshotWriter<R: Serialize + Send + 'static> {
    sender: Sender<WriterCommand<R>>,
    handle: Option<JoinHandle<WriterStats>>,
}

impl<R: Serialize + Send + 'static> SnapshotWriter<R> {
    /// Spawns the writer thread for `layout`. The data directory must exist.
    pub fn new(layout: ResultsLayout) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<WriterCommand<R>>();
        let handle = thread::Builder::new()
            .name(format!("writer-{}", layout.run_name()))
            .spawn(move || {
                let mut stats = WriterStats::default();
                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        WriterCommand::Save(file) => {
                            let path = layout.step_path(file.step);
                            match write_json_compact(&file, &path) {
                                Ok(()) => stats.written += 1,
                                Err(e) => {
                                    stats.failed += 1;
                                    tracing::warn!(
                                        run = layout.run_name(),
                                        step = file.step,
                                        error = %e,
                                        "Failed to save step file"
                                    );
                                }
                            }
                        }
                        WriterCommand::Stop => break,
                    }
                }
                stats
            })
            .map_err(|e| IoError::FileSystem(e).with_context("spawning snapshot writer"))?;

        Ok(Self {
            sender: tx,
            handle: Some(handle),
        })
    }

    /// Queues a step file. Never blocks on disk and never fails.
    pub fn save_step(&self, file: StepFile<R>) {
        let step = file.step;
        if self.sender.send(WriterCommand::Save(file)).is_err() {
            tracing::warn!(step = step, "Snapshot writer is gone; step dropped");
        }
    }

    /// Waits for every queued file to be written and stops the thread.
    pub fn finish(mut self) -> Result<WriterStats> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<WriterStats> {
        let Some(handle) = self.handle.take() else {
            return Ok(WriterStats::default());
        };
        self.sender.send(WriterCommand::Stop).ok();
        handle
            .join()
            .map_err(|_| IoError::writer("snapshot writer thread panicked"))
    }
}

impl<R: Serialize + Send + 'static> Drop for SnapshotWriter<R> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "Snapshot writer did not shut down cleanly");
        }
    }
}

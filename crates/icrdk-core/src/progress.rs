//! Progress side-channel for long-running deployment steps.
//!
//! Sinks are handed to the uploader, poller and deployer at call time.
//! `emit` must return promptly and never fail.

use std::fmt;

use tokio::sync::mpsc;

use crate::task::{TaskOperation, TaskState};
use crate::upload::ByteRange;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    UploadStarted { file: String, size: u64, chunks: usize },
    ChunkSending(ByteRange),
    ChunkResponse { range: ByteRange, status: u16 },
    UploadFinished { remote_path: String },
    TaskSubmitted { operation: TaskOperation, id: String },
    TaskPolled { id: String, state: TaskState, attempt: u32 },
    TaskFinished { id: String, state: TaskState, error_message: Option<String> },
    ResultFetched { id: String, records: usize },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::UploadStarted { file, size, chunks } => {
                write!(f, "Uploading {file} ({size} bytes in {chunks} chunk(s))")
            }
            ProgressEvent::ChunkSending(range) => {
                write!(f, "Sending chunk {}-{} of {}...", range.start, range.end, range.total)
            }
            ProgressEvent::ChunkResponse { range, status } => {
                write!(f, "UPLOAD REQUEST STATUS ({}-{}): {status}", range.start, range.end)
            }
            ProgressEvent::UploadFinished { remote_path } => write!(f, "Uploaded to {remote_path}"),
            ProgressEvent::TaskSubmitted { operation, id } => write!(f, "{operation} task {id} submitted"),
            ProgressEvent::TaskPolled { id, state, attempt } => {
                write!(f, "Task {id} is {state} (poll #{attempt})")
            }
            ProgressEvent::TaskFinished {
                id,
                state,
                error_message,
            } => match error_message {
                Some(message) => write!(f, "Task {id} {state}: {message}"),
                None => write!(f, "Task {id} {state}"),
            },
            ProgressEvent::ResultFetched { id, records } => {
                write!(f, "Task {id} returned {records} record(s)")
            }
        }
    }
}

pub trait ProgressSink {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent),
{
    fn emit(&self, event: ProgressEvent) {
        self(&event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Logs each event at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn emit(&self, event: ProgressEvent) {
        tracing::info!("{event}");
    }
}

/// Forwards events to an unbounded channel. A closed receiver drops events silently.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

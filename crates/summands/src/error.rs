//! Error types for the combination search and its output sink.
//!
//! This module defines the central [`Error`] enum, which captures every
//! reportable failure of a run. The search itself is pure and in-memory, so
//! the only ways a run can fail are invalid input, storage failures, caller
//! cancellation, and a broken handoff between generator and writer.
//!
//! ## Error Cases
//! - `InvalidParameters`: The search parameters or capacities were rejected at
//!   the boundary, before any work started.
//! - `Storage`: Creating the output directory, flushing a page, or persisting a
//!   file failed. Output persisted before the failure stays on disk.
//! - `Cancelled`: The caller's cancellation token fired mid-run.
//! - `SinkClosed`: A write or save was attempted after the sink was closed.
//! - `ChannelError`: The pipelined handoff between generator and writer broke.

use std::io;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for a combination search run.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Parameters or capacities failed validation.
    #[error("Invalid parameters: {reason}")]
    InvalidParameters { reason: String },

    /// A storage operation failed. Unrecoverable for the current run.
    #[error("Storage error while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: io::Error,
    },

    /// The caller cancelled the run.
    #[error("Search cancelled by caller")]
    Cancelled,

    /// The sink was already closed.
    #[error("Sink is closed")]
    SinkClosed,

    /// Internal channel failure between the generator and the writer.
    #[error("Channel error: {context}")]
    ChannelError { context: String },
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(context: impl Into<String>, source: io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Returns `true` if the run stopped because the caller cancelled it.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

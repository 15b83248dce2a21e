//! Error types for the schedula client.
//!
//! The grid builder and the legacy exporters are total and never return
//! these. Everything that touches the remote solver, the filesystem or the
//! stricter duplicate check does.

use thiserror::Error;

use crate::schedule::DuplicateSlot;
use crate::session::FileSlot;

#[derive(Debug, Error)]
pub enum SchedulaError {
    /// The solver answered with a non-2xx status. No body detail is kept.
    #[error("solver returned HTTP {status}")]
    SolverStatus { status: u16 },

    /// The request never completed (connection refused, timeout, ...).
    #[error("request to solver failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response whose body is not the expected JSON shape.
    #[error("could not decode solver response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no file selected for {0}")]
    MissingFile(FileSlot),

    #[error("a submission is already in progress")]
    SubmissionInProgress,

    /// Raised only by the strict grid builder.
    #[error("{} (room, time) slot(s) assigned more than once", .0.len())]
    DuplicateAssignment(Vec<DuplicateSlot>),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SchedulaError>;

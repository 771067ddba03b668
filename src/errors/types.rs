//! Error types for the channel streaming core.
//!
//! One flat enum covers the whole taxonomy; each variant carries enough
//! context to log usefully and maps to exactly one HTTP status (or, for
//! the in-stream cases, no HTTP status at all).

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("channel not found: {id}")]
    NotFound { id: String },

    #[error("encoder executable not found: {command}")]
    EncoderMissing { command: String },

    #[error("lineup for channel {channel} is empty")]
    LineupEmpty { channel: u32 },

    #[error("lineup for channel {channel} sums to {actual_ms}ms, expected {declared_ms}ms")]
    LineupDurationMismatch {
        channel: u32,
        declared_ms: i64,
        actual_ms: i64,
    },

    /// Never surfaced as an HTTP error — the caller turns this into an
    /// in-stream offline item labeled with the cycle path.
    #[error("redirect cycle detected: {path}")]
    RedirectCycle { path: String },

    /// Never surfaced directly — the caller reduces the gap to the minimum
    /// wait and re-resolves.
    #[error("no filler candidate available for channel {channel}")]
    FillerExhausted { channel: u32 },

    #[error("encoder process for channel {channel} exited abnormally: {detail}")]
    EncoderCrash { channel: u32, detail: String },

    /// Turned into a 60 s offline item by the caller rather than propagated.
    #[error("too many attempts for session {session_id} on channel {channel}")]
    TooManyAttempts { session_id: Uuid, channel: u32 },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Whether this error has an HTTP status at all, or must instead be
    /// absorbed into the stream as in-band content.
    pub fn is_in_stream_only(&self) -> bool {
        matches!(
            self,
            AppError::RedirectCycle { .. }
                | AppError::FillerExhausted { .. }
                | AppError::TooManyAttempts { .. }
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::EncoderMissing { .. } => 500,
            AppError::LineupEmpty { .. } => 500,
            AppError::LineupDurationMismatch { .. } => 500,
            AppError::EncoderCrash { .. } => 500,
            AppError::Configuration { .. } => 500,
            AppError::Io(_) => 500,
            AppError::Other(_) => 500,
            AppError::RedirectCycle { .. } => 200,
            AppError::FillerExhausted { .. } => 200,
            AppError::TooManyAttempts { .. } => 200,
        }
    }
}

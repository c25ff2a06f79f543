//! Error taxonomy for the telemetry pipeline.
//!
//! Every failure is propagated to the boundary; nothing is retried or
//! silently defaulted inside the core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Raw payload does not match the declared schema (field count or cast).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Latitude/longitude could not be decoded, so declination and position
    /// are unresolvable. The whole record is rejected, never a partial fix.
    #[error("location unresolvable: {0}")]
    MissingLocation(String),

    /// Store adapter create/read/write failure.
    #[error("store operation failed: {0}")]
    Store(String),

    /// The pagination page-count safety limit tripped.
    #[error("pagination exhausted after {0} pages")]
    PaginationExhausted(usize),

    /// Fix sequence handed to the segmenter was not ascending in time.
    #[error("fix ordering violation: {prev} followed by {next}")]
    OrderingViolation { prev: String, next: String },

    /// Ingestion request carried an event type we do not handle.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// Ingestion request carried no payload.
    #[error("no data to process")]
    EmptyPayload,

    /// No fix inside the freshness window. A normal, reportable state.
    #[error("no recent fix for asset {0}")]
    NotFound(String),

    #[error("bad timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

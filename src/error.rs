//! Error types surfaced by the adapter.
//!
//! Mirrors the distinction the host database contract makes: a small,
//! well-known `NotFound` case that the host maps to its own `NOT_FOUND`
//! error code, and everything else (bad data from a server, transport
//! failures) collapsed into generic runtime errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad resource: {0}")]
    BadResource(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl DbError {
    pub fn not_found(message: impl Into<String>) -> Self {
        DbError::NotFound(message.into())
    }

    pub fn bad_resource(message: impl Into<String>) -> Self {
        DbError::BadResource(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

/// Errors from the SOAP/SSDP transport (§4.I). Kept distinct from
/// `DbError` so the adapter logic can pattern-match on "not supported"
/// without caring how the fault was transported.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http error calling {action}: {source}")]
    Http {
        action: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{action} returned UPnP error {code}: {description}")]
    UpnpFault {
        action: String,
        code: u32,
        description: String,
    },

    #[error("malformed SOAP response for {action}: {reason}")]
    MalformedResponse { action: String, reason: String },

    #[error("{action} is not supported by this server")]
    NotSupported { action: String },

    #[error("ssdp discovery failed: {0}")]
    Discovery(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;
pub type TransportResult<T> = Result<T, TransportError>;

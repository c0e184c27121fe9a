use thiserror::Error;

/// Errors that can occur while operating the OLSRv2 engine.
///
/// Per-message/per-packet rejections (a truncated TLV, a stale ANSN, a
/// duplicate) are *not* represented here — those are expected outcomes of
/// parsing untrusted network input and are reported as typed
/// [`crate::codec::ConsumerResult`] / dispatch-result values instead.
/// Variants in this enum represent conditions that should not occur if
/// adapters and configuration honor their contracts.
#[derive(Error, Debug)]
pub enum OlsrError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown interface index {0}")]
    UnknownInterface(u32),

    #[error("unknown routing domain {0}")]
    UnknownDomain(u8),

    #[error("adapter returned an inconsistent handle")]
    InconsistentHandle,

    #[error("FIB adapter reported a permanent failure for route {0:?}")]
    FibPermanentFailure(crate::address::RouteKey),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OlsrError>;

//! Host-side error kinds.
//!
//! `Transport` is a connection-level I/O failure; `Protocol` a framing
//! or envelope violation; `Rpc` an engine-reported `ok = false`.  None
//! are retried internally.  Fingerprint mismatches are not errors at
//! all: they are reported through the log sink and execution continues.

use sl_protocol::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("transport: {0}")]
    Transport(#[from] std::io::Error),
    #[error("protocol: {0}")]
    Protocol(String),
    #[error("rpc: {0}")]
    Rpc(String),
}

impl From<FrameError> for HostError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(io) => HostError::Transport(io),
            other => HostError::Protocol(other.to_string()),
        }
    }
}

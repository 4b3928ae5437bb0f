//! Error types for flow classification.

use thiserror::Error;

/// Errors raised while building a registry or decoding packets.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// A registry was built with no protocol modules registered.
    #[error("registry contains no protocol modules")]
    EmptyRegistry,

    /// The raw packet bytes could not be decoded.
    #[error("packet decode failed: {0}")]
    PacketParse(String),
}

pub type Result<T> = std::result::Result<T, ClassifyError>;

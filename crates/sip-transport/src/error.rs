use thiserror::Error;

/// Result type for sip-transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the transport layer
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error on a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No connection is registered under this id
    #[error("Connection not found: {0}")]
    ConnectionNotFound(u64),

    /// The transport has been closed
    #[error("Transport is closed")]
    TransportClosed,

    /// The connection's outbound queue is gone
    #[error("Channel closed")]
    ChannelClosed,

    /// Invalid configuration, e.g. an unresolvable bind address
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the SIP value models, kind preserved
    #[error(transparent)]
    Core(#[from] sipwire_sip_core::Error),
}

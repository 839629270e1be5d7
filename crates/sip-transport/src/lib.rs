//! SIP transport layer for the sipwire stack
//!
//! This crate provides the pieces a SIP element runs on: a TCP transport
//! with a connection registry, single-shot timers, logging setup, and
//! [`SipElement`], which ties a transport to application logic.

pub mod element;
pub mod error;
pub mod logging;
pub mod timer;
pub mod transport;

pub use element::{MessageHandler, SipElement};
pub use error::{Error, Result};
pub use timer::Timer;
pub use transport::{ConnectionId, TcpTransport, TransportEvent};

/// Bind a TCP transport to the specified address
pub async fn bind_tcp(
    addr: std::net::SocketAddr,
) -> Result<(TcpTransport, tokio::sync::mpsc::Receiver<TransportEvent>)> {
    TcpTransport::bind(addr, None).await
}

/// Re-export of common types for easier use
pub mod prelude {
    pub use crate::{
        bind_tcp,
        logging::{app_span, setup_logging, LoggingConfig},
        ConnectionId, Error, MessageHandler, Result, SipElement, TcpTransport, Timer,
        TransportEvent,
    };
}

//! Connection-oriented transport for SIP payloads
//!
//! A transport accepts connections, delivers everything read from them as
//! [`TransportEvent`]s on a channel handed out at bind time, and sends bytes
//! back on a given connection. Each event carries the [`ConnectionId`] it
//! came from, so payloads of different connections never mix.

pub mod tcp;

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;

pub use tcp::TcpTransport;

/// Identifies one connection for the lifetime of a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Events emitted by a transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A connection was accepted or established
    ConnectionOpened {
        /// New connection
        connection: ConnectionId,
        /// Remote address
        source: SocketAddr,
    },

    /// Bytes were read from a connection
    DataReceived {
        /// Connection the bytes were read from
        connection: ConnectionId,
        /// Remote address
        source: SocketAddr,
        /// The bytes of one read
        payload: Bytes,
    },

    /// A connection was closed by either side
    ConnectionClosed {
        /// Closed connection
        connection: ConnectionId,
        /// Remote address
        source: SocketAddr,
    },

    /// A transport error that did not stop the transport
    Error {
        /// Affected connection, if any
        connection: Option<ConnectionId>,
        /// Error description
        error: String,
    },

    /// The transport stopped accepting connections
    Closed,
}

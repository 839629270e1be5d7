//! SIP element wiring
//!
//! [`SipElement`] hosts a [`TcpTransport`] on the address configured in a
//! [`SipConfig`] and hands every inbound payload to a [`MessageHandler`].
//! Whatever the handler returns is sent back on the connection the payload
//! arrived on.
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use sipwire_sip_core::SipConfig;
//! use sipwire_sip_transport::{ConnectionId, MessageHandler, SipElement};
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl MessageHandler for Echo {
//!     async fn on_message(
//!         &self,
//!         _connection: ConnectionId,
//!         _source: SocketAddr,
//!         message: String,
//!     ) -> anyhow::Result<Option<String>> {
//!         Ok(Some(message))
//!     }
//! }
//!
//! # async fn example() -> sipwire_sip_transport::Result<()> {
//! let element = SipElement::start(SipConfig::default(), Arc::new(Echo)).await?;
//! element.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use sipwire_sip_core::SipConfig;

use crate::error::{Error, Result};
use crate::transport::{ConnectionId, TcpTransport, TransportEvent};

/// Application logic driven by a [`SipElement`]
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handles one inbound payload, decoded as text. A returned reply is sent
    /// back on the same connection.
    async fn on_message(
        &self,
        connection: ConnectionId,
        source: SocketAddr,
        message: String,
    ) -> anyhow::Result<Option<String>>;

    /// Called when a peer connects
    async fn on_connection_opened(&self, _connection: ConnectionId, _source: SocketAddr) {}

    /// Called when a connection goes away
    async fn on_connection_closed(&self, _connection: ConnectionId, _source: SocketAddr) {}
}

/// A running SIP element
pub struct SipElement {
    config: SipConfig,
    transport: TcpTransport,
    dispatcher: JoinHandle<()>,
}

impl SipElement {
    /// Binds the transport on `my_address:my_port` and starts dispatching
    /// inbound payloads to `handler`.
    pub async fn start(config: SipConfig, handler: Arc<dyn MessageHandler>) -> Result<Self> {
        let addr = resolve_bind_addr(&config).await?;
        let (transport, events) = TcpTransport::bind(addr, None).await?;
        info!("SIP element listening on {}", transport.local_addr());

        let dispatcher = tokio::spawn(dispatch(transport.clone(), events, handler));

        Ok(SipElement {
            config,
            transport,
            dispatcher,
        })
    }

    /// The transport, e.g. to open outgoing connections
    pub fn transport(&self) -> &TcpTransport {
        &self.transport
    }

    /// Address actually bound, which differs from the configured one for port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Configuration the element was started with
    pub fn config(&self) -> &SipConfig {
        &self.config
    }

    /// True while the dispatcher is running
    pub fn is_running(&self) -> bool {
        !self.dispatcher.is_finished()
    }

    /// Closes the transport; the dispatcher ends once pending events are handled
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping SIP element on {}", self.transport.local_addr());
        self.transport.close().await
    }
}

async fn resolve_bind_addr(config: &SipConfig) -> Result<SocketAddr> {
    tokio::net::lookup_host((config.my_address.as_str(), config.my_port))
        .await?
        .next()
        .ok_or_else(|| {
            Error::Config(format!(
                "Cannot resolve {}:{}",
                config.my_address, config.my_port
            ))
        })
}

// Events are handled one at a time, so replies on a connection keep the
// order of the payloads they answer.
async fn dispatch(
    transport: TcpTransport,
    mut events: mpsc::Receiver<TransportEvent>,
    handler: Arc<dyn MessageHandler>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::ConnectionOpened { connection, source } => {
                handler.on_connection_opened(connection, source).await;
            }
            TransportEvent::DataReceived {
                connection,
                source,
                payload,
            } => {
                let message = String::from_utf8_lossy(&payload).into_owned();
                match handler.on_message(connection, source, message).await {
                    Ok(Some(reply)) => {
                        if let Err(e) = transport.send(connection, reply).await {
                            warn!("Failed to send reply on {}: {}", connection, e);
                        }
                    }
                    Ok(None) => debug!("No reply for message on {}", connection),
                    Err(e) => error!("Handler failed for message on {}: {:#}", connection, e),
                }
            }
            TransportEvent::ConnectionClosed { connection, source } => {
                handler.on_connection_closed(connection, source).await;
            }
            TransportEvent::Error { connection, error } => {
                warn!(?connection, "Transport error: {}", error);
            }
            TransportEvent::Closed => break,
        }
    }
    debug!("SIP element dispatcher terminated");
}

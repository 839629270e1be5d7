use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, trace, warn};

use super::{ConnectionId, TransportEvent};
use crate::error::{Error, Result};

// Default channel capacity
const DEFAULT_CHANNEL_CAPACITY: usize = 100;
// Outbound queue per connection
const CONNECTION_QUEUE_CAPACITY: usize = 32;
const READ_BUFFER_SIZE: usize = 8192;

/// TCP transport for SIP payloads
#[derive(Clone)]
pub struct TcpTransport {
    inner: Arc<TcpTransportInner>,
}

struct TcpTransportInner {
    local_addr: SocketAddr,
    connections: DashMap<ConnectionId, Connection>,
    next_id: AtomicU64,
    closed: AtomicBool,
    shutdown: Notify,
    events_tx: mpsc::Sender<TransportEvent>,
}

struct Connection {
    peer: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
}

impl TcpTransport {
    /// Creates a new TCP transport listening on the specified address.
    ///
    /// Returns the transport and the receiving end of its event channel.
    pub async fn bind(
        addr: SocketAddr,
        channel_capacity: Option<usize>,
    ) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let capacity = channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY);
        let (events_tx, events_rx) = mpsc::channel(capacity);

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("SIP TCP transport bound to {}", local_addr);

        let transport = TcpTransport {
            inner: Arc::new(TcpTransportInner {
                local_addr,
                connections: DashMap::new(),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
                shutdown: Notify::new(),
                events_tx,
            }),
        };

        transport.spawn_accept_loop(listener);

        Ok((transport, events_rx))
    }

    /// Opens an outgoing connection and registers it like an accepted one
    pub async fn connect(&self, addr: SocketAddr) -> Result<ConnectionId> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }
        let stream = TcpStream::connect(addr).await?;
        debug!("Connected to {}", addr);
        Ok(self.register(stream, addr).await)
    }

    // Spawns a task accepting connections until the transport is closed
    fn spawn_accept_loop(&self, listener: TcpListener) {
        let transport = self.clone();

        tokio::spawn(async move {
            let inner = &transport.inner;
            loop {
                let shutdown = inner.shutdown.notified();
                if inner.closed.load(Ordering::Relaxed) {
                    break;
                }

                tokio::select! {
                    _ = shutdown => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!("Accepted TCP connection from {}", peer);
                            transport.register(stream, peer).await;
                        }
                        Err(e) => {
                            error!("Error accepting TCP connection: {}", e);
                            transport
                                .emit(TransportEvent::Error {
                                    connection: None,
                                    error: format!("Error accepting connection: {}", e),
                                })
                                .await;
                        }
                    },
                }
            }

            transport.emit(TransportEvent::Closed).await;
            info!("TCP accept loop terminated");
        });
    }

    async fn register(&self, stream: TcpStream, peer: SocketAddr) -> ConnectionId {
        let id = ConnectionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let (reader, writer) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);

        self.inner.connections.insert(
            id,
            Connection {
                peer,
                outbound: outbound_tx,
            },
        );
        self.emit(TransportEvent::ConnectionOpened {
            connection: id,
            source: peer,
        })
        .await;

        self.spawn_writer(id, writer, outbound_rx);
        self.spawn_reader(id, peer, reader);
        id
    }

    // Writes queued payloads until the connection is dropped from the registry
    fn spawn_writer(&self, id: ConnectionId, mut writer: OwnedWriteHalf, mut outbound: mpsc::Receiver<Bytes>) {
        tokio::spawn(async move {
            while let Some(payload) = outbound.recv().await {
                trace!("Writing {} bytes on {}", payload.len(), id);
                if let Err(e) = writer.write_all(&payload).await {
                    warn!("Error writing to {}: {}", id, e);
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });
    }

    // Reads from the connection and reports each read as one event
    fn spawn_reader(&self, id: ConnectionId, peer: SocketAddr, mut reader: OwnedReadHalf) {
        let transport = self.clone();

        tokio::spawn(async move {
            let inner = &transport.inner;
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                let shutdown = inner.shutdown.notified();
                if inner.closed.load(Ordering::Relaxed) {
                    break;
                }

                let read = tokio::select! {
                    _ = shutdown => break,
                    read = reader.read(&mut buf) => read,
                };

                match read {
                    Ok(0) => {
                        debug!("Connection {} closed by {}", id, peer);
                        break;
                    }
                    Ok(n) => {
                        debug!("Received {} bytes on {} from {}", n, id, peer);
                        transport
                            .emit(TransportEvent::DataReceived {
                                connection: id,
                                source: peer,
                                payload: Bytes::copy_from_slice(&buf[..n]),
                            })
                            .await;
                    }
                    Err(e) => {
                        warn!("Error reading from {}: {}", id, e);
                        transport
                            .emit(TransportEvent::Error {
                                connection: Some(id),
                                error: format!("Error reading from {}: {}", peer, e),
                            })
                            .await;
                        break;
                    }
                }
            }

            // Dropping the registry entry ends the writer task
            inner.connections.remove(&id);
            transport
                .emit(TransportEvent::ConnectionClosed {
                    connection: id,
                    source: peer,
                })
                .await;
        });
    }

    async fn emit(&self, event: TransportEvent) {
        if self.inner.events_tx.send(event).await.is_err() {
            trace!("Transport event dropped, receiver is gone");
        }
    }

    /// Queues `data` for sending on a connection
    pub async fn send(&self, connection: ConnectionId, data: impl Into<Bytes>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }

        // Clone the sender so no registry guard is held across the await
        let outbound = self
            .inner
            .connections
            .get(&connection)
            .map(|c| c.outbound.clone())
            .ok_or(Error::ConnectionNotFound(connection.0))?;

        let data = data.into();
        debug!("Sending {} bytes on {}", data.len(), connection);
        outbound.send(data).await.map_err(|_| Error::ChannelClosed)
    }

    /// Queues `data` on every open connection and returns how many accepted it
    pub async fn broadcast(&self, data: impl Into<Bytes>) -> Result<usize> {
        if self.is_closed() {
            return Err(Error::TransportClosed);
        }

        let data = data.into();
        let targets: Vec<(ConnectionId, mpsc::Sender<Bytes>)> = self
            .inner
            .connections
            .iter()
            .map(|entry| (*entry.key(), entry.value().outbound.clone()))
            .collect();

        let mut sent = 0;
        for (id, outbound) in targets {
            match outbound.send(data.clone()).await {
                Ok(()) => sent += 1,
                Err(_) => warn!("Broadcast skipped {}, connection is closing", id),
            }
        }
        Ok(sent)
    }

    /// Number of open connections
    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    /// Remote address of a connection
    pub fn peer_addr(&self, connection: ConnectionId) -> Option<SocketAddr> {
        self.inner.connections.get(&connection).map(|c| c.peer)
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Stops accepting, closes every connection and ends the event stream
    pub async fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::Relaxed) {
            return Ok(());
        }
        info!("Closing TCP transport on {}", self.inner.local_addr);
        self.inner.shutdown.notify_waiters();
        self.inner.connections.clear();
        Ok(())
    }

    /// True once [`TcpTransport::close`] was called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TcpTransport({})", self.inner.local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn next_event(rx: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let (transport, _rx) = TcpTransport::bind("127.0.0.1:0".parse().unwrap(), None).await.unwrap();
        assert_ne!(transport.local_addr().port(), 0);
        assert_eq!(transport.connection_count(), 0);
        assert!(!transport.is_closed());
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection() {
        let (transport, _rx) = TcpTransport::bind("127.0.0.1:0".parse().unwrap(), None).await.unwrap();
        let err = transport.send(ConnectionId(42), "x").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionNotFound(42)));
    }

    #[tokio::test]
    async fn test_connect_between_transports() {
        let (server, mut server_rx) = TcpTransport::bind("127.0.0.1:0".parse().unwrap(), None).await.unwrap();
        let (client, mut client_rx) = TcpTransport::bind("127.0.0.1:0".parse().unwrap(), None).await.unwrap();

        let outgoing = client.connect(server.local_addr()).await.unwrap();
        assert!(matches!(
            next_event(&mut client_rx).await,
            TransportEvent::ConnectionOpened { connection, .. } if connection == outgoing
        ));
        let incoming = match next_event(&mut server_rx).await {
            TransportEvent::ConnectionOpened { connection, .. } => connection,
            other => panic!("unexpected event {:?}", other),
        };

        client.send(outgoing, "OPTIONS sip:bob@biloxi.com SIP/2.0\r\n\r\n").await.unwrap();
        match next_event(&mut server_rx).await {
            TransportEvent::DataReceived { connection, payload, .. } => {
                assert_eq!(connection, incoming);
                assert_eq!(&payload[..], b"OPTIONS sip:bob@biloxi.com SIP/2.0\r\n\r\n");
            }
            other => panic!("unexpected event {:?}", other),
        }

        server.close().await.unwrap();
        assert!(server.is_closed());
        assert!(matches!(server.send(incoming, "x").await, Err(Error::TransportClosed)));
    }
}

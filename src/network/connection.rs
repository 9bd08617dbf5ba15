//! STOMP-over-WebSocket Connection
//!
//! A background task that owns the socket: it performs the STOMP
//! handshake, subscribes to the game topics, forwards decoded inbound
//! traffic as [`TransportEvent`]s and writes outbound frames. When the
//! socket drops it waits and reconnects until shut down.
//!
//! The game loop talks to it through [`StompTransport`], which never
//! blocks: a full or closed outbound queue simply drops the action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, instrument, warn};

use crate::config::ConnectionConfig;
use crate::network::protocol::{Achievement, ActionMessage, WorldSnapshot};
use crate::network::stomp::{StompCommand, StompError, StompFrame};
use crate::network::transport::{Transport, TransportError, TransportEvent};

/// Inbound event channel capacity.
const EVENT_CAPACITY: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection errors. All of them end the current socket and trigger a
/// reconnect; none are fatal to the client.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Unparsable frame during the handshake.
    #[error("STOMP error: {0}")]
    Stomp(#[from] StompError),

    /// Broker sent an ERROR frame.
    #[error("Broker error: {0}")]
    Broker(String),

    /// Socket closed before CONNECTED arrived.
    #[error("Connection closed during handshake")]
    HandshakeClosed,

    /// Socket did not open or CONNECTED did not arrive in time.
    #[error("Handshake timed out after {0} ms")]
    HandshakeTimeout(u64),
}

// =============================================================================
// TRANSPORT HANDLE
// =============================================================================

/// [`Transport`] backed by the connection task.
#[derive(Debug, Clone)]
pub struct StompTransport {
    connected: Arc<AtomicBool>,
    outgoing: mpsc::Sender<StompFrame>,
}

impl StompTransport {
    /// Build from the shared flag and the outbound queue.
    pub fn new(connected: Arc<AtomicBool>, outgoing: mpsc::Sender<StompFrame>) -> Self {
        Self { connected, outgoing }
    }
}

impl Transport for StompTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn publish(&mut self, destination: &str, message: &ActionMessage) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let frame = StompFrame::send_json(destination, message.to_json()?);
        self.outgoing.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

// =============================================================================
// INBOUND ROUTING
// =============================================================================

/// Turn a MESSAGE frame into an event, by destination.
///
/// Undecodable payloads and unknown destinations yield `None`.
pub fn route_message(frame: &StompFrame, config: &ConnectionConfig) -> Option<TransportEvent> {
    let destination = frame.destination()?;

    if destination == config.gamestate_topic {
        match WorldSnapshot::from_json(&frame.body) {
            Ok(snapshot) => Some(TransportEvent::Snapshot(snapshot)),
            Err(e) => {
                debug!("Dropping undecodable snapshot: {}", e);
                None
            }
        }
    } else if destination == config.achievements_topic || destination == config.personal_achievements_queue {
        let personal = destination == config.personal_achievements_queue;
        match Achievement::from_json(&frame.body) {
            Ok(achievement) => Some(TransportEvent::Achievement { achievement, personal }),
            Err(e) => {
                debug!("Dropping undecodable achievement: {}", e);
                None
            }
        }
    } else {
        debug!(destination, "Message for unknown destination");
        None
    }
}

// =============================================================================
// CONNECTION TASK
// =============================================================================

/// How a socket session ended without an error.
enum SessionEnd {
    /// Client is shutting down; stop reconnecting.
    Shutdown,
    /// Peer went away; reconnect.
    Dropped(String),
}

/// Handle to a running connection task.
pub struct ConnectionHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    /// Send DISCONNECT, close the socket and wait for the task.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Connection task failed: {}", e);
        }
    }
}

/// The socket-owning task.
pub struct Connection {
    config: ConnectionConfig,
    connected: Arc<AtomicBool>,
    events: mpsc::Sender<TransportEvent>,
    outgoing: mpsc::Receiver<StompFrame>,
}

impl Connection {
    /// Spawn the task. Returns the transport, the inbound event stream and
    /// the shutdown handle.
    pub fn spawn(config: ConnectionConfig) -> (StompTransport, mpsc::Receiver<TransportEvent>, ConnectionHandle) {
        let connected = Arc::new(AtomicBool::new(false));
        let (outgoing_tx, outgoing_rx) = mpsc::channel(config.outgoing_capacity.max(1));
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let connection = Connection {
            config,
            connected: connected.clone(),
            events: events_tx,
            outgoing: outgoing_rx,
        };
        let task = tokio::spawn(connection.run(shutdown_rx));

        (
            StompTransport::new(connected, outgoing_tx),
            events_rx,
            ConnectionHandle { shutdown_tx, task },
        )
    }

    /// Connect, serve, and reconnect until shut down.
    #[instrument(skip_all, fields(url = %self.config.url))]
    async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            info!("Connecting...");
            let reason = match self.serve(&mut shutdown_rx).await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Dropped(reason)) => reason,
                Err(e) => {
                    warn!("Connection failed: {}", e);
                    e.to_string()
                }
            };

            self.connected.store(false, Ordering::Release);
            if self.events.send(TransportEvent::Disconnected { reason }).await.is_err() {
                break;
            }

            let delay = self.config.reconnect_delay();
            info!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => break,
            }
        }

        self.connected.store(false, Ordering::Release);
        info!("Connection task stopped");
    }

    /// Open the socket and run CONNECT until CONNECTED.
    async fn handshake(&self) -> Result<(SplitSink<WsStream, Message>, SplitStream<WsStream>), ConnectionError> {
        let (ws_stream, _) = connect_async(self.config.url.as_str()).await?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(Message::Text(StompFrame::connect(&self.config.host).encode()))
            .await?;

        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => match StompFrame::decode(&text)? {
                    Some(frame) if frame.command == StompCommand::Connected => {
                        debug!(version = frame.get("version"), "STOMP session established");
                        return Ok((write, read));
                    }
                    Some(frame) if frame.command == StompCommand::Error => {
                        return Err(ConnectionError::Broker(broker_message(&frame)));
                    }
                    _ => {}
                },
                Some(Ok(Message::Close(_))) | None => return Err(ConnectionError::HandshakeClosed),
                Some(Err(e)) => return Err(e.into()),
                _ => {}
            }
        }
    }

    /// One socket lifetime.
    async fn serve(&mut self, shutdown_rx: &mut broadcast::Receiver<()>) -> Result<SessionEnd, ConnectionError> {
        let timeout = self.config.handshake_timeout();
        let (mut write, mut read) = tokio::select! {
            result = tokio::time::timeout(timeout, self.handshake()) => {
                result.map_err(|_| ConnectionError::HandshakeTimeout(timeout.as_millis() as u64))??
            }
            _ = shutdown_rx.recv() => {
                debug!("Shutdown during handshake");
                return Ok(SessionEnd::Shutdown);
            }
        };

        let topics = [
            &self.config.gamestate_topic,
            &self.config.achievements_topic,
            &self.config.personal_achievements_queue,
        ];
        for (i, destination) in topics.into_iter().enumerate() {
            let frame = StompFrame::subscribe(format!("sub-{}", i), destination.as_str());
            write.send(Message::Text(frame.encode())).await?;
        }

        // Anything queued before this socket existed is stale
        while self.outgoing.try_recv().is_ok() {}

        self.connected.store(true, Ordering::Release);
        info!("Connected");
        if self.events.send(TransportEvent::Connected).await.is_err() {
            return Ok(SessionEnd::Shutdown);
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            let frame = match StompFrame::decode(&text) {
                                Ok(Some(frame)) => frame,
                                Ok(None) => continue,
                                Err(e) => {
                                    debug!("Invalid frame: {}", e);
                                    continue;
                                }
                            };
                            match frame.command {
                                StompCommand::Message => {
                                    if let Some(event) = route_message(&frame, &self.config) {
                                        if self.events.send(event).await.is_err() {
                                            return Ok(SessionEnd::Shutdown);
                                        }
                                    }
                                }
                                StompCommand::Error => {
                                    return Err(ConnectionError::Broker(broker_message(&frame)));
                                }
                                _ => {}
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return Ok(SessionEnd::Dropped("Connection closed".to_string()));
                        }
                        Some(Err(e)) => return Err(e.into()),
                        _ => {}
                    }
                }
                frame = self.outgoing.recv() => {
                    match frame {
                        Some(frame) => write.send(Message::Text(frame.encode())).await?,
                        None => return Ok(SessionEnd::Shutdown),
                    }
                }
                _ = shutdown_rx.recv() => {
                    self.connected.store(false, Ordering::Release);
                    // Flush what was published before shutdown (PLAYER_LEAVE)
                    while let Ok(frame) = self.outgoing.try_recv() {
                        let _ = write.send(Message::Text(frame.encode())).await;
                    }
                    let _ = write.send(Message::Text(StompFrame::disconnect().encode())).await;
                    let _ = write.close().await;
                    return Ok(SessionEnd::Shutdown);
                }
            }
        }
    }
}

/// Human-readable text of an ERROR frame.
fn broker_message(frame: &StompFrame) -> String {
    frame
        .get("message")
        .map(str::to_string)
        .unwrap_or_else(|| frame.body.clone())
}

// =============================================================================
// TESTS
// =============================================================================

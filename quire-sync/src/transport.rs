//! Connections from a session to the bus.
//!
//! Two buses share the same semantics: [`LocalBus`] lives inside the process
//! and is used by tests and single-process setups, [`DaemonLink`] talks to a
//! `quire-bus` daemon over WebSocket. Either way, registering on a path
//! yields a [`Transport`] for publishing and an mpsc receiver of every
//! message published on that path, own messages included.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

use crate::bus::frame::{BusFrame, FrameError, FrameKind};
use crate::bus::group::{BroadcastGroup, SessionRooms};
use crate::config::SyncConfig;
use crate::envelope::OriginId;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Cannot reach bus at {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("Bus refused registration on {path}: {reason}")]
    Rejected { path: String, reason: String },
    #[error("Bus connection closed")]
    Closed,
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Outbound half of a bus registration.
pub trait Transport: Send + Sync {
    /// Publish one message to every endpoint registered on [`Transport::path`].
    fn publish(&self, message: Vec<u8>) -> Result<(), TransportError>;

    fn path(&self) -> &str;
}

pub type Inbound = mpsc::Receiver<Vec<u8>>;

/// Where a session finds its bus.
#[derive(Clone)]
pub enum BusEndpoint {
    Local(LocalBus),
    Daemon(String),
}

impl BusEndpoint {
    pub fn daemon(url: impl Into<String>) -> Self {
        BusEndpoint::Daemon(url.into())
    }

    /// Register `origin` on `path`. `config.channel_capacity` bounds the
    /// inbound queue; daemon handshakes give up after
    /// `config.handshake_timeout_ms`.
    pub async fn connect(
        &self,
        origin: OriginId,
        path: &str,
        config: &SyncConfig,
    ) -> Result<(Box<dyn Transport>, Inbound), TransportError> {
        let capacity = config.channel_capacity;
        let (transport, inbound): (Box<dyn Transport>, Inbound) = match self {
            BusEndpoint::Local(bus) => {
                let (link, inbound) = bus.register(origin, path, capacity).await?;
                (Box::new(link) as Box<dyn Transport>, inbound)
            }
            BusEndpoint::Daemon(url) => {
                let deadline = Duration::from_millis(config.handshake_timeout_ms);
                let (link, inbound) =
                    DaemonLink::connect(url, origin, path, capacity, deadline).await?;
                (Box::new(link) as Box<dyn Transport>, inbound)
            }
        };
        Ok((transport, inbound))
    }
}

impl std::fmt::Debug for BusEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusEndpoint::Local(_) => f.write_str("Local"),
            BusEndpoint::Daemon(url) => write!(f, "Daemon({url})"),
        }
    }
}

/// In-process bus. Clones share the same paths.
#[derive(Clone)]
pub struct LocalBus {
    rooms: Arc<SessionRooms>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl LocalBus {
    /// Empty bus whose paths buffer up to `capacity` messages per member.
    pub fn new(capacity: usize) -> Self {
        Self { rooms: Arc::new(SessionRooms::new(capacity)) }
    }

    /// Paths with at least one registered member.
    pub fn rooms(&self) -> &Arc<SessionRooms> {
        &self.rooms
    }

    /// Register `origin` on `path`, failing with `Rejected` if it is already
    /// there. The registration ends when the returned receiver is dropped.
    pub async fn register(
        &self,
        origin: OriginId,
        path: &str,
        capacity: usize,
    ) -> Result<(LocalLink, Inbound), TransportError> {
        let group = self.rooms.get_or_create(path).await;
        let rx = group.add_member(origin).await.ok_or_else(|| TransportError::Rejected {
            path: path.to_string(),
            reason: "origin already registered on this path".to_string(),
        })?;
        let (tx, inbound) = mpsc::channel(capacity.max(1));

        let rooms = self.rooms.clone();
        let forward_group = group.clone();
        let forward_path = path.to_string();
        tokio::spawn(async move {
            forward(rx, tx).await;
            forward_group.remove_member(&origin).await;
            rooms.remove_if_empty(&forward_path).await;
            log::debug!("Origin {origin} left {forward_path}");
        });

        Ok((LocalLink { group, path: path.to_string() }, inbound))
    }
}

/// Copy group messages into the endpoint's queue until either side closes.
async fn forward(mut rx: broadcast::Receiver<Arc<Vec<u8>>>, tx: mpsc::Sender<Vec<u8>>) {
    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Ok(data) => {
                    if tx.send(data.to_vec()).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("Local endpoint lagged by {n} messages");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tx.closed() => break,
        }
    }
}

pub struct LocalLink {
    group: Arc<BroadcastGroup>,
    path: String,
}

impl Transport for LocalLink {
    fn publish(&self, message: Vec<u8>) -> Result<(), TransportError> {
        self.group.publish(Arc::new(message));
        Ok(())
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// Registration on a `quire-bus` daemon.
pub struct DaemonLink {
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
    origin: OriginId,
    path: String,
}

impl DaemonLink {
    /// Connect, register on `path` and wait for the daemon's answer. The
    /// whole handshake must finish within `deadline`.
    pub async fn connect(
        url: &str,
        origin: OriginId,
        path: &str,
        capacity: usize,
        deadline: Duration,
    ) -> Result<(Self, Inbound), TransportError> {
        let handshake = async {
            let (ws_stream, _) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
                TransportError::Connect { url: url.to_string(), reason: e.to_string() }
            })?;
            let (mut ws_writer, mut ws_reader) = ws_stream.split();

            let register = BusFrame::register(origin, path).encode()?;
            ws_writer
                .send(Message::Binary(register.into()))
                .await
                .map_err(|_| TransportError::Closed)?;

            loop {
                match ws_reader.next().await {
                    Some(Ok(Message::Binary(data))) => {
                        let frame = BusFrame::decode(&data)?;
                        match frame.kind {
                            FrameKind::Registered => break,
                            FrameKind::Rejected => {
                                return Err(TransportError::Rejected {
                                    path: path.to_string(),
                                    reason: frame.reason(),
                                })
                            }
                            other => log::debug!("Ignoring {other:?} before registration"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                        return Err(TransportError::Closed)
                    }
                    Some(Ok(_)) => {}
                }
            }
            Ok::<_, TransportError>((ws_writer, ws_reader))
        };
        let (mut ws_writer, mut ws_reader) = tokio::time::timeout(deadline, handshake)
            .await
            .map_err(|_| TransportError::Connect {
                url: url.to_string(),
                reason: format!("no registration reply within {} ms", deadline.as_millis()),
            })??;
        log::info!("Registered on {path} at {url}");

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        tokio::spawn(async move {
            while let Some(data) = out_rx.recv().await {
                if ws_writer.send(Message::Binary(data.into())).await.is_err() {
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        let (in_tx, inbound) = mpsc::channel(capacity.max(1));
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = ws_reader.next() => match msg {
                        Some(Ok(Message::Binary(data))) => match BusFrame::decode(&data) {
                            Ok(frame) if frame.kind == FrameKind::Signal => {
                                if in_tx.send(frame.body).await.is_err() {
                                    break;
                                }
                            }
                            Ok(frame) => log::trace!("Ignoring {:?} frame", frame.kind),
                            Err(e) => log::warn!("Failed to decode frame from bus: {e}"),
                        },
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    _ = in_tx.closed() => break,
                }
            }
            log::info!("Bus connection closed");
        });

        Ok((Self { outgoing: out_tx, origin, path: path.to_string() }, inbound))
    }
}

impl Transport for DaemonLink {
    fn publish(&self, message: Vec<u8>) -> Result<(), TransportError> {
        let frame = BusFrame::signal(self.origin, self.path.clone(), message).encode()?;
        self.outgoing.send(frame).map_err(|_| TransportError::Closed)
    }

    fn path(&self) -> &str {
        &self.path
    }
}

//! WebSocket bus daemon routing session messages between editor processes.
//!
//! ```text
//! quire A ──┐                              ┌──► quire A
//!           ├── Register /sessions/common ─┤
//! quire B ──┘        BroadcastGroup        └──► quire B
//! ```
//!
//! Every `Signal` frame received on a registered connection is relayed to
//! all connections registered on the same path, the sender included.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::tungstenite::Message;

use crate::bus::frame::{BusFrame, FrameKind};
use crate::bus::group::{BroadcastGroup, SessionRooms};
use crate::config::BusConfig;
use crate::envelope::OriginId;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    pub total_connections: u64,
    pub active_connections: u64,
    pub total_frames: u64,
    pub total_bytes: u64,
    pub relayed_signals: u64,
    pub rejected_registrations: u64,
    pub active_paths: usize,
}

/// Registration held by one connection.
struct Endpoint {
    path: String,
    origin: OriginId,
    group: Arc<BroadcastGroup>,
}

pub struct BusDaemon {
    config: BusConfig,
    rooms: Arc<SessionRooms>,
    stats: Arc<RwLock<BusStats>>,
}

impl BusDaemon {
    pub fn new(config: BusConfig) -> Self {
        let rooms = Arc::new(SessionRooms::new(config.broadcast_capacity));
        Self {
            config,
            rooms,
            stats: Arc::new(RwLock::new(BusStats::default())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(BusConfig::default())
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn run(&self) -> Result<(), BoxError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        log::info!("Bus daemon listening on {}", self.config.bind_addr);
        self.serve(listener).await
    }

    /// Accept connections from an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), BoxError> {
        loop {
            let (stream, addr) = listener.accept().await?;
            log::debug!("New TCP connection from {addr}");

            let rooms = self.rooms.clone();
            let stats = self.stats.clone();
            tokio::spawn(async move {
                if let Err(e) = Self::handle_connection(stream, addr, rooms, stats).await {
                    log::error!("Connection error from {addr}: {e}");
                }
            });
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        rooms: Arc<SessionRooms>,
        stats: Arc<RwLock<BusStats>>,
    ) -> Result<(), BoxError> {
        let ws_stream = tokio_tungstenite::accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        log::info!("WebSocket connection established from {addr}");

        {
            let mut s = stats.write().await;
            s.total_connections += 1;
            s.active_connections += 1;
        }

        let mut endpoint: Option<Endpoint> = None;
        let mut broadcast_rx: Option<broadcast::Receiver<Arc<Vec<u8>>>> = None;

        let result = async {
            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Binary(data))) => {
                                let bytes: Vec<u8> = data.into();
                                {
                                    let mut s = stats.write().await;
                                    s.total_frames += 1;
                                    s.total_bytes += bytes.len() as u64;
                                }
                                let frame = match BusFrame::decode(&bytes) {
                                    Ok(frame) => frame,
                                    Err(e) => {
                                        log::warn!("Failed to decode frame from {addr}: {e}");
                                        continue;
                                    }
                                };

                                match frame.kind {
                                    FrameKind::Register => {
                                        let reply = if endpoint.is_some() {
                                            BusFrame::rejected(frame.origin, frame.path, "connection already registered")
                                        } else if frame.path.is_empty() {
                                            BusFrame::rejected(frame.origin, frame.path, "empty path")
                                        } else {
                                            let group = rooms.get_or_create(&frame.path).await;
                                            match group.add_member(frame.origin).await {
                                                Some(rx) => {
                                                    broadcast_rx = Some(rx);
                                                    log::info!("Origin {} registered on {}", frame.origin, frame.path);
                                                    endpoint = Some(Endpoint {
                                                        path: frame.path.clone(),
                                                        origin: frame.origin,
                                                        group,
                                                    });
                                                    BusFrame::registered(frame.origin, frame.path)
                                                }
                                                None => BusFrame::rejected(
                                                    frame.origin,
                                                    frame.path,
                                                    "origin already registered on this path",
                                                ),
                                            }
                                        };
                                        let mut s = stats.write().await;
                                        if reply.kind == FrameKind::Rejected {
                                            log::warn!("Rejected registration from {addr}: {}", reply.reason());
                                            s.rejected_registrations += 1;
                                        }
                                        s.active_paths = rooms.room_count().await;
                                        drop(s);
                                        ws_sender.send(Message::Binary(reply.encode()?.into())).await?;
                                    }

                                    FrameKind::Signal => match &endpoint {
                                        Some(ep) if ep.path == frame.path && ep.origin == frame.origin => {
                                            let reached = ep.group.publish(Arc::new(bytes));
                                            log::debug!("Relayed {} byte signal on {} to {reached} endpoints", frame.body.len(), ep.path);
                                            stats.write().await.relayed_signals += 1;
                                        }
                                        _ => {
                                            log::warn!("Dropping signal for {} from unregistered endpoint {addr}", frame.path);
                                        }
                                    },

                                    FrameKind::Ping => {
                                        let pong = BusFrame::pong(frame.origin);
                                        ws_sender.send(Message::Binary(pong.encode()?.into())).await?;
                                    }

                                    other => {
                                        log::debug!("Unhandled frame kind {other:?} from {addr}");
                                    }
                                }
                            }

                            Some(Ok(Message::Close(_))) | None => {
                                log::info!("Connection closed from {addr}");
                                break;
                            }

                            Some(Ok(Message::Ping(data))) => {
                                ws_sender.send(Message::Pong(data)).await?;
                            }

                            Some(Err(e)) => {
                                log::error!("WebSocket error from {addr}: {e}");
                                break;
                            }

                            _ => {}
                        }
                    }

                    msg = async {
                        match broadcast_rx.as_mut() {
                            Some(rx) => rx.recv().await,
                            None => std::future::pending().await,
                        }
                    } => {
                        match msg {
                            Ok(data) => {
                                ws_sender.send(Message::Binary(data.to_vec().into())).await?;
                            }
                            Err(broadcast::error::RecvError::Lagged(n)) => {
                                log::warn!("Endpoint {addr} lagged by {n} messages");
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
            Ok::<(), BoxError>(())
        }
        .await;

        if let Some(ep) = endpoint {
            ep.group.remove_member(&ep.origin).await;
            rooms.remove_if_empty(&ep.path).await;
            log::info!("Origin {} left {}", ep.origin, ep.path);
        }
        {
            let mut s = stats.write().await;
            s.active_connections = s.active_connections.saturating_sub(1);
            s.active_paths = rooms.room_count().await;
        }

        result
    }

    pub async fn stats(&self) -> BusStats {
        self.stats.read().await.clone()
    }

    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    pub fn rooms(&self) -> &Arc<SessionRooms> {
        &self.rooms
    }
}

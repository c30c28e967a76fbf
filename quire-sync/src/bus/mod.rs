//! The session message bus: frame format, per-path fan-out and the daemon
//! serving it over WebSocket.

pub mod daemon;
pub mod frame;
pub mod group;

pub use daemon::{BusDaemon, BusStats};
pub use frame::{BusFrame, FrameError, FrameKind};
pub use group::{BroadcastGroup, GroupStats, SessionRooms};

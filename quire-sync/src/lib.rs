//! # quire-sync: action replication for the Quire editor
//!
//! Every edit is captured as a typed, serializable command and broadcast to
//! the other editor processes of the same session, which rebuild and execute
//! it against their own document.
//!
//! ## Architecture
//!
//! ```text
//!  local edit                                           remote peer
//!      │                                                     ▲
//!      ▼                                                     │
//! ┌──────────┐  to_raw   ┌──────────┐   bus    ┌─────────┐  │ execute
//! │ Action + │ ────────► │ Envelope │ ───────► │ Session │ ─┤
//! │ Memento  │           │ v,origin │          │ (drops  │  │
//! └──────────┘           │ tag,body │          │  echoes)│  │
//!                        └──────────┘          └────┬────┘  │
//!                                                   ▼       │
//!                                            ┌─────────────┐│
//!                                            │ActionBuilder├┘
//!                                            │ + Registry  │
//!                                            └─────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`codec`]: positional big-endian field codec
//! - [`action_type`] / [`registry`]: the closed command set and its payload schemas
//! - [`memento`]: payload values
//! - [`action`]: commands bound to an [`quire_core::EditorContext`]
//! - [`builder`]: `(payload, tag)` → executable action
//! - [`envelope`]: versioned, origin-stamped message
//! - [`bus`]: bus frames, fan-out groups and the WebSocket daemon
//! - [`transport`]: in-process and daemon connections
//! - [`session`]: session modes, echo suppression
//! - [`coordinator`]: local/remote glue owning the editor
//! - [`config`]: JSON configuration

pub mod action;
pub mod action_type;
pub mod builder;
pub mod bus;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod envelope;
pub mod memento;
pub mod registry;
pub mod session;
pub mod transport;

pub use action::{Action, ActionError, ActionRequest};
pub use action_type::{ActionFamily, ActionType};
pub use builder::{ActionBuilder, BuildError};
pub use bus::{BusDaemon, BusFrame, BusStats, FrameKind};
pub use codec::{CodecError, Decoder, Encoder, WireFormat};
pub use config::{BusConfig, Config, ConfigError, SyncConfig};
pub use coordinator::{AppliedAction, SyncCoordinator, SyncError};
pub use envelope::{Envelope, EnvelopeError, OriginId, PROTOCOL_VERSION};
pub use memento::{Memento, TextChange, TextChangeKind};
pub use registry::{ActionSchema, Registry};
pub use session::{
    Session, SessionError, SessionEvent, SessionMode, SessionSelection, SessionSlot,
    SessionStats, DEFAULT_SESSION,
};
pub use transport::{BusEndpoint, DaemonLink, LocalBus, Transport, TransportError};

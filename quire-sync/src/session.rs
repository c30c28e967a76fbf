//! Replication scope of one editor process.
//!
//! A session is opened once at startup in one of three modes and lives until
//! exit. Outgoing mementos are wrapped in an [`Envelope`] stamped with the
//! process origin; incoming envelopes from that same origin are dropped so a
//! process never re-applies its own actions.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::action_type::ActionType;
use crate::config::SyncConfig;
use crate::envelope::{Envelope, OriginId};
use crate::memento::Memento;
use crate::transport::{BusEndpoint, Inbound, Transport, TransportError};

pub const DEFAULT_SESSION: &str = "common";
pub const SESSION_PATH_PREFIX: &str = "/sessions/";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session bus unavailable after {attempts} attempt(s): {source}")]
    BusUnavailable {
        attempts: u32,
        #[source]
        source: TransportError,
    },
    #[error("Registration on {path} failed: {reason}")]
    RegistrationFailed { path: String, reason: String },
    #[error("Invalid session name '{0}': use ASCII letters, digits and '_'")]
    InvalidName(String),
    #[error("Session modes are mutually exclusive: pick one of --session, --detached, --disabled")]
    ConflictingModes,
    #[error("A session was already created in this process")]
    AlreadyCreated,
    #[error("Failed to publish: {0}")]
    Publish(#[source] TransportError),
    #[error("{action_type} payload of {len} bytes exceeds the session limit of {max}")]
    PayloadTooLarge {
        action_type: ActionType,
        len: usize,
        max: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// No bus at all; sends are no-ops.
    Disabled,
    /// Private session under a random name.
    Detached,
    Named(String),
}

impl Default for SessionMode {
    fn default() -> Self {
        SessionMode::Named(DEFAULT_SESSION.to_string())
    }
}

/// Raw mode flags as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSelection {
    pub name: Option<String>,
    pub detached: bool,
    pub disabled: bool,
}

impl SessionSelection {
    /// The single mode these flags ask for. No flag at all means the default
    /// named session.
    pub fn resolve(&self) -> Result<SessionMode, SessionError> {
        let chosen = usize::from(self.name.is_some())
            + usize::from(self.detached)
            + usize::from(self.disabled);
        if chosen > 1 {
            return Err(SessionError::ConflictingModes);
        }
        if self.disabled {
            return Ok(SessionMode::Disabled);
        }
        if self.detached {
            return Ok(SessionMode::Detached);
        }
        match &self.name {
            Some(name) => {
                validate_name(name)?;
                Ok(SessionMode::Named(name.clone()))
            }
            None => Ok(SessionMode::default()),
        }
    }
}

pub fn validate_name(name: &str) -> Result<(), SessionError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidName(name.to_string()))
    }
}

/// Bus path of the receive endpoint for session `name`.
pub fn session_path(name: &str) -> String {
    format!("{SESSION_PATH_PREFIX}{name}")
}

fn detached_name() -> String {
    format!("detached_{}", Uuid::new_v4().simple())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ActionReceived {
        origin: OriginId,
        tag: u16,
        payload: Vec<u8>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub sent: u64,
    pub received: u64,
    pub echoes_dropped: u64,
    pub malformed_dropped: u64,
}

#[derive(Default)]
struct AtomicSessionStats {
    sent: AtomicU64,
    received: AtomicU64,
    echoes_dropped: AtomicU64,
    malformed_dropped: AtomicU64,
}

/// Decides what happens to one inbound message.
#[derive(Clone)]
pub struct Screen {
    origin: OriginId,
    max_payload: usize,
    stats: Arc<AtomicSessionStats>,
}

impl Screen {
    /// Screen for a session stamping `origin`, accepting payloads of up to
    /// `max_payload` bytes.
    pub fn new(origin: OriginId, max_payload: usize) -> Self {
        Self { origin, max_payload, stats: Arc::new(AtomicSessionStats::default()) }
    }

    /// Event for `message`, or `None` when it is our own echo or unreadable.
    pub fn screen(&self, message: &[u8]) -> Option<SessionEvent> {
        let envelope = match Envelope::decode(message, self.max_payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("Dropping unreadable envelope: {e}");
                self.stats.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        if envelope.origin == self.origin {
            log::trace!("Dropping own echo (tag {})", envelope.tag);
            self.stats.echoes_dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        log::debug!("Received tag {} from {}", envelope.tag, envelope.origin);
        Some(SessionEvent::ActionReceived {
            origin: envelope.origin,
            tag: envelope.tag,
            payload: envelope.payload,
        })
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            sent: self.stats.sent.load(Ordering::Relaxed),
            received: self.stats.received.load(Ordering::Relaxed),
            echoes_dropped: self.stats.echoes_dropped.load(Ordering::Relaxed),
            malformed_dropped: self.stats.malformed_dropped.load(Ordering::Relaxed),
        }
    }
}

pub struct Session {
    mode: SessionMode,
    name: Option<String>,
    screen: Screen,
    transport: Option<Box<dyn Transport>>,
    event_rx: Option<mpsc::Receiver<SessionEvent>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("name", &self.name)
            .field("origin", &self.screen.origin)
            .finish()
    }
}

impl Session {
    /// Open a session under a fresh random origin.
    pub async fn open(
        mode: SessionMode,
        endpoint: &BusEndpoint,
        config: &SyncConfig,
    ) -> Result<Self, SessionError> {
        Self::open_with_origin(mode, endpoint, config, OriginId::new_v4()).await
    }

    /// Open a session that stamps `origin` on its envelopes. Enabled modes
    /// connect to the bus at `endpoint`, retrying per `config`, and register
    /// on `/sessions/<name>`.
    pub async fn open_with_origin(
        mode: SessionMode,
        endpoint: &BusEndpoint,
        config: &SyncConfig,
        origin: OriginId,
    ) -> Result<Self, SessionError> {
        let screen = Screen::new(origin, config.max_payload_len);
        let name = match &mode {
            SessionMode::Disabled => {
                log::info!("Replication disabled");
                return Ok(Self { mode, name: None, screen, transport: None, event_rx: None });
            }
            SessionMode::Detached => detached_name(),
            SessionMode::Named(name) => {
                validate_name(name)?;
                name.clone()
            }
        };

        let path = session_path(&name);
        let (transport, inbound) = connect_with_retry(endpoint, origin, &path, config).await?;

        let (event_tx, event_rx) = mpsc::channel(config.channel_capacity.max(1));
        tokio::spawn(screen_inbound(inbound, event_tx, screen.clone()));

        log::info!("Joined session '{}' as {}", name, origin);
        Ok(Self {
            mode,
            name: Some(name),
            screen,
            transport: Some(transport),
            event_rx: Some(event_rx),
        })
    }

    /// Mode the session was opened in.
    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    /// Session name; `None` when disabled.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Origin stamped on every envelope this session sends.
    pub fn origin(&self) -> OriginId {
        self.screen.origin
    }

    /// Whether the session is connected to a bus.
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Received actions from other origins. Can only be taken once; always
    /// `None` for a disabled session.
    pub fn take_event_rx(&mut self) -> Option<mpsc::Receiver<SessionEvent>> {
        self.event_rx.take()
    }

    /// Fail with `PayloadTooLarge` when peers would drop `memento` unread.
    /// Always passes for a disabled session.
    pub fn check_payload(&self, memento: &Memento) -> Result<(), SessionError> {
        if self.transport.is_none() {
            return Ok(());
        }
        self.check_len(memento.action_type(), memento.to_raw().len())
    }

    fn check_len(&self, action_type: ActionType, len: usize) -> Result<(), SessionError> {
        if len > self.screen.max_payload {
            return Err(SessionError::PayloadTooLarge { action_type, len, max: self.screen.max_payload });
        }
        Ok(())
    }

    /// Broadcast `memento` to the session. A no-op when disabled. Payloads
    /// above `max_payload_len` are refused rather than sent.
    pub fn send_action(&self, memento: &Memento) -> Result<(), SessionError> {
        let Some(transport) = &self.transport else {
            return Ok(());
        };
        let envelope = Envelope::for_memento(self.screen.origin, memento);
        self.check_len(memento.action_type(), envelope.payload.len())?;
        transport.publish(envelope.encode()).map_err(SessionError::Publish)?;
        self.screen.stats.sent.fetch_add(1, Ordering::Relaxed);
        log::debug!("Sent {} ({} payload bytes)", memento.action_type(), envelope.payload.len());
        Ok(())
    }

    /// Counters shared with the inbound screening task.
    pub fn stats(&self) -> SessionStats {
        self.screen.stats()
    }
}

async fn connect_with_retry(
    endpoint: &BusEndpoint,
    origin: OriginId,
    path: &str,
    config: &SyncConfig,
) -> Result<(Box<dyn Transport>, Inbound), SessionError> {
    let attempts = config.connect_attempts.max(1);
    let mut backoff = Duration::from_millis(config.retry_backoff_ms);
    let mut attempt = 1;
    loop {
        match endpoint.connect(origin, path, config).await {
            Ok(connected) => return Ok(connected),
            Err(TransportError::Rejected { path, reason }) => {
                return Err(SessionError::RegistrationFailed { path, reason })
            }
            Err(source) if attempt >= attempts => {
                return Err(SessionError::BusUnavailable { attempts, source })
            }
            Err(e) => {
                log::warn!("Bus connection attempt {attempt}/{attempts} failed: {e}");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
        }
    }
}

async fn screen_inbound(mut inbound: Inbound, events: mpsc::Sender<SessionEvent>, screen: Screen) {
    while let Some(message) = inbound.recv().await {
        if let Some(event) = screen.screen(&message) {
            if events.send(event).await.is_err() {
                break;
            }
        }
    }
    log::debug!("Session inbound stream ended");
}

/// Guards the one session a process may create.
///
/// Meant to live in a `static`, so it can be reached from wherever startup
/// happens.
pub struct SessionSlot {
    claimed: AtomicBool,
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSlot {
    /// An unclaimed slot.
    pub const fn new() -> Self {
        Self { claimed: AtomicBool::new(false) }
    }

    /// Open the session. Fails with `AlreadyCreated` once a session has been
    /// created through this slot; a failed open leaves the slot free.
    pub async fn create(
        &self,
        mode: SessionMode,
        endpoint: &BusEndpoint,
        config: &SyncConfig,
    ) -> Result<Session, SessionError> {
        if self.claimed.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadyCreated);
        }
        let result = Session::open(mode, endpoint, config).await;
        if result.is_err() {
            self.claimed.store(false, Ordering::Release);
        }
        result
    }

    /// Whether a session has been created through this slot.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memento::{CharToggle, DocumentTitle, PasteText};
    use crate::transport::LocalBus;

    fn selection(name: Option<&str>, detached: bool, disabled: bool) -> SessionSelection {
        SessionSelection { name: name.map(str::to_string), detached, disabled }
    }

    #[test]
    fn test_resolve_modes() {
        assert_eq!(
            selection(None, false, false).resolve().unwrap(),
            SessionMode::Named("common".to_string())
        );
        assert_eq!(selection(None, true, false).resolve().unwrap(), SessionMode::Detached);
        assert_eq!(selection(None, false, true).resolve().unwrap(), SessionMode::Disabled);
        assert_eq!(
            selection(Some("team_1"), false, false).resolve().unwrap(),
            SessionMode::Named("team_1".to_string())
        );
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        assert!(matches!(
            selection(Some("a"), true, false).resolve(),
            Err(SessionError::ConflictingModes)
        ));
        assert!(matches!(
            selection(None, true, true).resolve(),
            Err(SessionError::ConflictingModes)
        ));
    }

    #[test]
    fn test_invalid_names() {
        for bad in ["", "a b", "x/y", "dash-name", "é"] {
            assert!(matches!(validate_name(bad), Err(SessionError::InvalidName(_))), "{bad:?}");
        }
        assert!(validate_name("Common_2").is_ok());
        assert_eq!(session_path("common"), "/sessions/common");
        assert!(validate_name(&detached_name()).is_ok());
    }

    #[test]
    fn test_screen_drops_own_origin() {
        let me = OriginId::from_u128(42);
        let other = OriginId::from_u128(7);
        let screen = Screen::new(me, 1024);
        let memento = Memento::Bold(CharToggle { begin: 0, end: 1, enabled: true });

        assert!(screen.screen(&Envelope::for_memento(me, &memento).encode()).is_none());
        let event = screen.screen(&Envelope::for_memento(other, &memento).encode()).unwrap();
        assert_eq!(
            event,
            SessionEvent::ActionReceived { origin: other, tag: 0, payload: memento.to_raw() }
        );
        assert!(screen.screen(&[1, 2, 3]).is_none());

        let stats = screen.stats();
        assert_eq!(stats.echoes_dropped, 1);
        assert_eq!(stats.received, 1);
        assert_eq!(stats.malformed_dropped, 1);
    }

    #[tokio::test]
    async fn test_disabled_session_is_inert() {
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let mut session =
            Session::open(SessionMode::Disabled, &endpoint, &SyncConfig::default()).await.unwrap();
        assert!(!session.is_enabled());
        assert!(session.name().is_none());
        assert!(session.take_event_rx().is_none());
        session.send_action(&Memento::Undo).unwrap();
        assert_eq!(session.stats().sent, 0);
    }

    #[tokio::test]
    async fn test_detached_sessions_do_not_meet() {
        let bus = LocalBus::default();
        let endpoint = BusEndpoint::Local(bus.clone());
        let config = SyncConfig::default();
        let a = Session::open(SessionMode::Detached, &endpoint, &config).await.unwrap();
        let b = Session::open(SessionMode::Detached, &endpoint, &config).await.unwrap();
        assert_ne!(a.name(), b.name());
        assert_eq!(bus.rooms().room_count().await, 2);
    }

    #[tokio::test]
    async fn test_slot_refuses_second_session() {
        let slot = SessionSlot::new();
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let config = SyncConfig::default();
        let _session = slot.create(SessionMode::default(), &endpoint, &config).await.unwrap();
        assert!(slot.is_claimed());
        assert!(matches!(
            slot.create(SessionMode::Disabled, &endpoint, &config).await,
            Err(SessionError::AlreadyCreated)
        ));
    }

    #[tokio::test]
    async fn test_slot_released_after_failed_open() {
        let slot = SessionSlot::new();
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let config = SyncConfig::default();
        let bad = SessionMode::Named("no spaces".to_string());
        assert!(matches!(
            slot.create(bad, &endpoint, &config).await,
            Err(SessionError::InvalidName(_))
        ));
        assert!(!slot.is_claimed());
        assert!(slot.create(SessionMode::Disabled, &endpoint, &config).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_payload_is_refused() {
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let config = SyncConfig { max_payload_len: 16, ..SyncConfig::default() };
        let mode = SessionMode::Named("limits".to_string());
        let sender = Session::open(mode.clone(), &endpoint, &config).await.unwrap();
        let mut peer = Session::open(mode, &endpoint, &config).await.unwrap();
        let mut events = peer.take_event_rx().unwrap();

        let paste = Memento::Paste(PasteText {
            begin: 0,
            end: 0,
            text: "0123456789abcdefghijklmnop".to_string(),
        });
        assert!(matches!(
            sender.check_payload(&paste),
            Err(SessionError::PayloadTooLarge { len: 38, max: 16, .. })
        ));
        assert!(matches!(
            sender.send_action(&paste),
            Err(SessionError::PayloadTooLarge { .. })
        ));
        assert_eq!(sender.stats().sent, 0);

        let bold = Memento::Bold(CharToggle { begin: 0, end: 1, enabled: true });
        sender.check_payload(&bold).unwrap();
        sender.send_action(&bold).unwrap();
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, SessionEvent::ActionReceived { tag: 0, .. }));
        assert_eq!(peer.stats().malformed_dropped, 0);
    }

    #[tokio::test]
    async fn test_disabled_session_has_no_payload_limit() {
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let config = SyncConfig { max_payload_len: 1, ..SyncConfig::default() };
        let session = Session::open(SessionMode::Disabled, &endpoint, &config).await.unwrap();
        session.check_payload(&Memento::New(DocumentTitle { title: "long".to_string() })).unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_origin_fails_registration() {
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let config = SyncConfig::default();
        let origin = OriginId::from_u128(9);
        let mode = SessionMode::default();
        let _first = Session::open_with_origin(mode.clone(), &endpoint, &config, origin)
            .await
            .unwrap();
        assert!(matches!(
            Session::open_with_origin(mode, &endpoint, &config, origin).await,
            Err(SessionError::RegistrationFailed { .. })
        ));
    }
}

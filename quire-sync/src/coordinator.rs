//! Glue between the local editor and the session.
//!
//! The coordinator owns the editing context. Local requests are captured,
//! executed and broadcast; received actions are rebuilt by the
//! [`ActionBuilder`] and executed against the same context, so the document
//! is only ever touched from the task that owns the coordinator.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::action::{text_change_span, Action, ActionError, ActionRequest};
use crate::action_type::ActionType;
use crate::builder::{ActionBuilder, BuildError};
use crate::envelope::OriginId;
use crate::memento::{Memento, TextChange};
use crate::session::{Session, SessionError, SessionEvent};
use quire_core::{EditError, EditorContext};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Notification that a remote action was applied locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedAction {
    pub action_type: ActionType,
    pub origin: OriginId,
}

pub struct SyncCoordinator<E: EditorContext> {
    editor: E,
    session: Session,
    builder: ActionBuilder,
    events: Option<mpsc::Receiver<SessionEvent>>,
}

impl<E: EditorContext> SyncCoordinator<E> {
    /// Coordinator with the standard action registry.
    pub fn new(editor: E, session: Session) -> Self {
        Self::with_builder(editor, session, ActionBuilder::default())
    }

    /// Coordinator rebuilding received actions with `builder`. Takes the
    /// session's event receiver.
    pub fn with_builder(editor: E, mut session: Session, builder: ActionBuilder) -> Self {
        let events = session.take_event_rx();
        Self { editor, session, builder, events }
    }

    /// The editing context actions run against.
    pub fn editor(&self) -> &E {
        &self.editor
    }

    /// Direct access for collaborator bookkeeping such as moving the cursor.
    /// Edits made here are not replicated.
    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    /// The session actions are broadcast on.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Give back the editor and the session.
    pub fn into_parts(self) -> (E, Session) {
        (self.editor, self.session)
    }

    /// Capture `request` from the current editor state, apply it locally and
    /// broadcast it. Nothing is applied or sent if the payload is over the
    /// session limit or local execution fails.
    pub fn originate(&mut self, request: ActionRequest) -> Result<Memento, SyncError> {
        let mut action = Action::capture(request, &mut self.editor);
        let kind = action.action_type();
        if let Some(memento) = action.memento() {
            self.session.check_payload(memento)?;
        }
        action.execute()?;
        let memento = action.into_memento().ok_or(ActionError::MissingMemento(kind))?;
        self.session.send_action(&memento)?;
        Ok(memento)
    }

    /// Broadcast a keystroke the collaborator applies itself through
    /// `apply`. An undo checkpoint is recorded first, as every peer does when
    /// it replays the change, so replicated undo steps stay aligned. If
    /// `apply` fails the checkpoint is rolled back and nothing is sent.
    pub fn observe_keystroke<F>(&mut self, change: TextChange, apply: F) -> Result<(), SyncError>
    where
        F: FnOnce(&mut E) -> Result<(), EditError>,
    {
        log::trace!("Keystroke {:?} at {}", change.kind, change.pos);
        text_change_span(&change, self.editor.document().len())?;
        let memento = Memento::TextChange(change);
        self.session.check_payload(&memento)?;
        self.editor.checkpoint();
        if let Err(e) = apply(&mut self.editor) {
            if let Err(undo) = self.editor.undo() {
                log::warn!("Could not roll back keystroke checkpoint: {undo}");
            }
            return Err(ActionError::from(e).into());
        }
        self.session.send_action(&memento)?;
        Ok(())
    }

    /// Apply a keystroke to the local editor, then broadcast it.
    pub fn keystroke(&mut self, change: TextChange) -> Result<(), SyncError> {
        let memento = Memento::TextChange(change);
        self.session.check_payload(&memento)?;
        Action::with_memento(memento.clone(), &mut self.editor).execute()?;
        self.session.send_action(&memento)?;
        Ok(())
    }

    /// Rebuild and execute one received action.
    pub fn handle(&mut self, event: SessionEvent) -> Result<AppliedAction, SyncError> {
        let SessionEvent::ActionReceived { origin, tag, payload } = event;
        let mut action = self.builder.deserialize(&payload, tag, &mut self.editor)?;
        let action_type = action.action_type();
        action.execute()?;
        log::debug!("Applied {action_type} from {origin}");
        Ok(AppliedAction { action_type, origin })
    }

    /// Handle an event, logging and dropping it on failure.
    pub fn apply(&mut self, event: SessionEvent) -> Option<AppliedAction> {
        match self.handle(event) {
            Ok(applied) => Some(applied),
            Err(e) => {
                log::warn!("Dropping remote action: {e}");
                None
            }
        }
    }

    /// Apply every event already waiting, without blocking.
    pub fn pump(&mut self) -> Vec<AppliedAction> {
        let mut applied = Vec::new();
        while let Some(event) = self.events.as_mut().and_then(|rx| rx.try_recv().ok()) {
            applied.extend(self.apply(event));
        }
        applied
    }

    /// Wait for the next received event. Never resolves for a disabled
    /// session; resolves to `None` once the session stream has closed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Apply received actions until the session stream closes, reporting
    /// each success to `on_applied`. Returns at once for a disabled session.
    pub async fn run(&mut self, mut on_applied: impl FnMut(&AppliedAction, &E)) {
        let Some(mut events) = self.events.take() else {
            return;
        };
        while let Some(event) = events.recv().await {
            if let Some(applied) = self.apply(event) {
                on_applied(&applied, &self.editor);
            }
        }
        log::info!("Session stream closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::envelope::Envelope;
    use crate::memento::{CharToggle, TextChangeKind};
    use crate::session::SessionMode;
    use crate::transport::{BusEndpoint, LocalBus};
    use quire_core::{Editor, Selection};

    async fn disabled() -> Session {
        let endpoint = BusEndpoint::Local(LocalBus::default());
        Session::open(SessionMode::Disabled, &endpoint, &SyncConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_originate_applies_locally() {
        let mut coordinator = SyncCoordinator::new(Editor::default(), disabled().await);
        coordinator.editor_mut().insert_text(0, "abcdef").unwrap();
        coordinator.editor_mut().set_selection(Selection::range(1, 4));

        let memento = coordinator.originate(ActionRequest::Underline(true)).unwrap();
        assert_eq!(memento, Memento::Underline(CharToggle { begin: 1, end: 4, enabled: true }));
        let doc = coordinator.editor().document();
        assert_eq!(doc.char_format_at(2).unwrap().underline, Some(true));
    }

    #[tokio::test]
    async fn test_failed_originate_sends_nothing() {
        let mut coordinator = SyncCoordinator::new(Editor::default(), disabled().await);
        assert!(matches!(
            coordinator.originate(ActionRequest::Undo),
            Err(SyncError::Action(ActionError::Edit(_)))
        ));
        assert_eq!(coordinator.session().stats().sent, 0);
    }

    #[tokio::test]
    async fn test_handle_reports_applied() {
        let mut coordinator = SyncCoordinator::new(Editor::default(), disabled().await);
        let origin = OriginId::from_u128(3);
        let change = Memento::TextChange(TextChange {
            kind: TextChangeKind::Added,
            pos: 0,
            text: "hi".to_string(),
        });
        let envelope = Envelope::for_memento(origin, &change);
        let applied = coordinator
            .handle(SessionEvent::ActionReceived {
                origin,
                tag: envelope.tag,
                payload: envelope.payload,
            })
            .unwrap();
        assert_eq!(applied, AppliedAction { action_type: ActionType::TextChange, origin });
        assert_eq!(coordinator.editor().document().plain_text(), "hi");
    }

    #[tokio::test]
    async fn test_bad_remote_action_is_dropped() {
        let mut coordinator = SyncCoordinator::new(Editor::default(), disabled().await);
        let event = SessionEvent::ActionReceived {
            origin: OriginId::from_u128(1),
            tag: 500,
            payload: Vec::new(),
        };
        assert!(coordinator.apply(event).is_none());
        assert!(coordinator.pump().is_empty());
    }

    #[tokio::test]
    async fn test_pump_drains_waiting_events() {
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let config = SyncConfig::default();
        let mode = SessionMode::Named("pump".to_string());
        let sender = Session::open(mode.clone(), &endpoint, &config).await.unwrap();
        let receiver = Session::open(mode, &endpoint, &config).await.unwrap();
        let mut sender = SyncCoordinator::new(Editor::default(), sender);
        let mut receiver = SyncCoordinator::new(Editor::default(), receiver);

        for (pos, text) in [(0, "ab"), (2, "cd")] {
            sender
                .keystroke(TextChange {
                    kind: TextChangeKind::Added,
                    pos,
                    text: text.to_string(),
                })
                .unwrap();
        }

        let mut applied = Vec::new();
        for _ in 0..100 {
            applied.extend(receiver.pump());
            if applied.len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(applied.len(), 2);
        assert!(applied.iter().all(|a| a.origin == sender.session().origin()));
        assert_eq!(receiver.editor().document().plain_text(), "abcd");
    }

    async fn peers(config: &SyncConfig) -> (SyncCoordinator<Editor>, SyncCoordinator<Editor>) {
        let endpoint = BusEndpoint::Local(LocalBus::default());
        let mode = SessionMode::Named("peers".to_string());
        let a = Session::open(mode.clone(), &endpoint, config).await.unwrap();
        let b = Session::open(mode, &endpoint, config).await.unwrap();
        (
            SyncCoordinator::new(Editor::default(), a),
            SyncCoordinator::new(Editor::default(), b),
        )
    }

    async fn deliver(to: &mut SyncCoordinator<Editor>) -> ActionType {
        let event = tokio::time::timeout(std::time::Duration::from_secs(2), to.next_event())
            .await
            .unwrap()
            .unwrap();
        to.handle(event).unwrap().action_type
    }

    #[tokio::test]
    async fn test_observed_keystroke_keeps_undo_aligned() {
        let (mut a, mut b) = peers(&SyncConfig::default()).await;
        for peer in [&mut a, &mut b] {
            peer.editor_mut().insert_text(0, "xy").unwrap();
        }

        a.editor_mut().set_selection(Selection::range(0, 2));
        a.originate(ActionRequest::Bold(true)).unwrap();
        assert_eq!(deliver(&mut b).await, ActionType::FormatBold);

        let typed = TextChange { kind: TextChangeKind::Added, pos: 2, text: "z".to_string() };
        a.observe_keystroke(typed, |editor| editor.insert_text(2, "z")).unwrap();
        assert_eq!(deliver(&mut b).await, ActionType::TextChange);
        assert_eq!(a.editor().document(), b.editor().document());

        a.originate(ActionRequest::Undo).unwrap();
        assert_eq!(deliver(&mut b).await, ActionType::EditUndo);
        assert_eq!(a.editor().document(), b.editor().document());
        let doc = a.editor().document();
        assert_eq!(doc.plain_text(), "xy");
        assert_eq!(doc.char_format_at(0).unwrap().bold, Some(true));
    }

    #[tokio::test]
    async fn test_failed_observed_keystroke_leaves_no_history() {
        let mut coordinator = SyncCoordinator::new(Editor::default(), disabled().await);
        coordinator.editor_mut().insert_text(0, "ab").unwrap();

        let past_end = TextChange { kind: TextChangeKind::Removed, pos: 1, text: "bc".to_string() };
        let err = coordinator.observe_keystroke(past_end, |_| Ok(())).unwrap_err();
        assert!(matches!(err, SyncError::Action(ActionError::Edit(EditError::OutOfRange { .. }))));

        let typed = TextChange { kind: TextChangeKind::Added, pos: 0, text: "q".to_string() };
        let err = coordinator
            .observe_keystroke(typed, |_| Err(EditError::NothingToUndo))
            .unwrap_err();
        assert!(matches!(err, SyncError::Action(ActionError::Edit(_))));

        assert!(matches!(coordinator.editor_mut().undo(), Err(EditError::NothingToUndo)));
        assert_eq!(coordinator.editor().document().plain_text(), "ab");
    }

    #[tokio::test]
    async fn test_oversized_originate_changes_nothing() {
        let config = SyncConfig { max_payload_len: 16, ..SyncConfig::default() };
        let (mut a, b) = peers(&config).await;
        a.editor_mut().set_clipboard("0123456789abcdefghijklmnop".to_string());

        let err = a.originate(ActionRequest::Paste).unwrap_err();
        assert!(matches!(
            err,
            SyncError::Session(SessionError::PayloadTooLarge { action_type: ActionType::EditPaste, .. })
        ));
        assert_eq!(a.editor().document().plain_text(), "");
        assert_eq!(a.session().stats().sent, 0);
        assert_eq!(b.session().stats().malformed_dropped, 0);
    }

    #[tokio::test]
    async fn test_run_returns_for_disabled_session() {
        let mut coordinator = SyncCoordinator::new(Editor::default(), disabled().await);
        let mut seen = 0;
        coordinator.run(|_, _| seen += 1).await;
        assert_eq!(seen, 0);
    }
}

//! Rebuilds executable actions from `(payload, tag)` pairs.

use crate::action::{Action, ActionError};
use crate::action_type::ActionType;
use crate::codec::CodecError;
use crate::registry::Registry;
use quire_core::EditorContext;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Unsupported action type tag {0}")]
    UnsupportedActionType(u16),
    #[error("{action_type} payload of {len} bytes is shorter than the {min} byte minimum")]
    PayloadTooShort {
        action_type: ActionType,
        len: usize,
        min: usize,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Turns received payloads into actions bound to the local context.
#[derive(Debug, Clone, Default)]
pub struct ActionBuilder {
    registry: Registry,
}

impl ActionBuilder {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn supports(&self, tag: u16) -> bool {
        self.registry.lookup_tag(tag).is_some()
    }

    /// Decode `bytes` as the payload of `tag` and bind the resulting action
    /// to `context`. The action is returned ready to execute.
    pub fn deserialize<'ctx>(
        &self,
        bytes: &[u8],
        tag: u16,
        context: &'ctx mut dyn EditorContext,
    ) -> Result<Action<'ctx>, BuildError> {
        let schema = self
            .registry
            .lookup_tag(tag)
            .ok_or(BuildError::UnsupportedActionType(tag))?;
        if bytes.len() < schema.min_len() {
            return Err(BuildError::PayloadTooShort {
                action_type: schema.action_type,
                len: bytes.len(),
                min: schema.min_len(),
            });
        }
        let mut memento = schema.instantiate();
        memento.init_from_raw(bytes)?;
        let mut action = Action::new(schema.action_type, context);
        action.set_memento(memento)?;
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memento::{CharToggle, Memento, PasteText};
    use quire_core::Editor;

    #[test]
    fn test_built_action_matches_tag() {
        let builder = ActionBuilder::default();
        let mut editor = Editor::default();
        for kind in ActionType::ALL {
            let raw = Memento::empty(kind).to_raw();
            let action = builder.deserialize(&raw, kind.tag(), &mut editor).unwrap();
            assert_eq!(action.action_type(), kind);
            assert_eq!(action.memento().map(Memento::action_type), Some(kind));
        }
    }

    #[test]
    fn test_unknown_tag_leaves_registry_intact() {
        let builder = ActionBuilder::default();
        let mut editor = Editor::default();
        let err = builder.deserialize(&[], 999, &mut editor).unwrap_err();
        assert!(matches!(err, BuildError::UnsupportedActionType(999)));
        assert!(!builder.supports(999));
        assert_eq!(builder.registry().len(), ActionType::ALL.len());
        assert!(builder.supports(ActionType::FormatBold.tag()));
    }

    #[test]
    fn test_unregistered_type_is_unsupported() {
        let builder = ActionBuilder::new(Registry::standard().without(ActionType::EditPaste));
        let mut editor = Editor::default();
        let tag = ActionType::EditPaste.tag();
        assert!(!builder.supports(tag));
        assert!(matches!(
            builder.deserialize(&[], tag, &mut editor),
            Err(BuildError::UnsupportedActionType(15))
        ));
    }

    #[test]
    fn test_short_payload_rejected_before_decoding() {
        let builder = ActionBuilder::default();
        let mut editor = Editor::default();
        let raw = Memento::Bold(CharToggle { begin: 1, end: 2, enabled: true }).to_raw();
        let err = builder
            .deserialize(&raw[..raw.len() - 1], ActionType::FormatBold.tag(), &mut editor)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::PayloadTooShort { action_type: ActionType::FormatBold, len: 8, min: 9 }
        ));
        assert!(matches!(
            builder.deserialize(&[], ActionType::EditUndo.tag(), &mut editor),
            Ok(_)
        ));
    }

    #[test]
    fn test_truncated_string_is_malformed() {
        let builder = ActionBuilder::default();
        let mut editor = Editor::default();
        let paste = Memento::Paste(PasteText { begin: 0, end: 0, text: "abc".to_string() });
        let raw = paste.to_raw();
        let err = builder
            .deserialize(&raw[..raw.len() - 1], ActionType::EditPaste.tag(), &mut editor)
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Codec(CodecError::MalformedPayload { field: "text", .. })
        ));
    }

    #[test]
    fn test_built_action_executes_locally() {
        let builder = ActionBuilder::default();
        let mut editor = Editor::default();
        editor.insert_text(0, "abcdef").unwrap();
        let raw = Memento::Bold(CharToggle { begin: 2, end: 4, enabled: true }).to_raw();
        builder
            .deserialize(&raw, ActionType::FormatBold.tag(), &mut editor)
            .unwrap()
            .execute()
            .unwrap();
        assert_eq!(editor.document().char_format_at(3).unwrap().bold, Some(true));
        assert_eq!(editor.document().char_format_at(4).unwrap().bold, None);
    }
}

//! Executable commands bound to an editing context.
//!
//! An [`Action`] pairs an [`ActionType`] with the context it runs against
//! and, once attached, the [`Memento`] holding its arguments. Local actions
//! are captured from live editor state with [`Action::capture`]; remote ones
//! are created empty and filled through [`Action::set_memento`] by the
//! builder.

mod document;
mod edit;
mod format;

pub(crate) use edit::text_change_span;

use crate::action_type::{ActionFamily, ActionType};
use crate::memento::{
    BlockChecked, BlockPosition, BlockStyleChange, CharColor, CharFamily, CharSize, CharToggle,
    DocumentTitle, FilePath, Memento, PasteText, SelectionRange,
};
use quire_core::{Alignment, BlockStyle, EditError, EditorContext, Rgba};
use std::ops::Range;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("{0} has no memento attached")]
    MissingMemento(ActionType),
    #[error("Received memento of type {found} for a {expected} action")]
    InvalidMementoType {
        expected: ActionType,
        found: ActionType,
    },
    #[error("Invalid {field} value {value}")]
    InvalidPosition { field: &'static str, value: i32 },
    #[error("{0} requires a file path")]
    MissingPath(ActionType),
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// A local edit intent. Positions and clipboard contents are taken from the
/// context when the action is captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Bold(bool),
    Italic(bool),
    Underline(bool),
    Align(Alignment),
    Indent,
    Unindent,
    Color(Rgba),
    UnderlineColor(Rgba),
    Checked(bool),
    FontSize(i32),
    FontFamily(String),
    BlockStyle(BlockStyle),
    Copy,
    Cut,
    Paste,
    Undo,
    Redo,
    Open(PathBuf),
    /// `None` saves to the path the document already has.
    Save(Option<PathBuf>),
    SaveAs(PathBuf),
    New(String),
}

impl ActionRequest {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionRequest::Bold(_) => ActionType::FormatBold,
            ActionRequest::Italic(_) => ActionType::FormatItalic,
            ActionRequest::Underline(_) => ActionType::FormatUnderline,
            ActionRequest::Align(Alignment::Left) => ActionType::FormatAlignLeft,
            ActionRequest::Align(Alignment::Right) => ActionType::FormatAlignRight,
            ActionRequest::Align(Alignment::Center) => ActionType::FormatAlignCenter,
            ActionRequest::Align(Alignment::Justify) => ActionType::FormatAlignJustify,
            ActionRequest::Indent => ActionType::FormatIndent,
            ActionRequest::Unindent => ActionType::FormatUnindent,
            ActionRequest::Color(_) => ActionType::FormatColor,
            ActionRequest::UnderlineColor(_) => ActionType::FormatUnderlineColor,
            ActionRequest::Checked(_) => ActionType::FormatChecked,
            ActionRequest::FontSize(_) => ActionType::FontSize,
            ActionRequest::FontFamily(_) => ActionType::FontFamily,
            ActionRequest::BlockStyle(_) => ActionType::FormatBlockStyle,
            ActionRequest::Copy => ActionType::EditCopy,
            ActionRequest::Cut => ActionType::EditCut,
            ActionRequest::Paste => ActionType::EditPaste,
            ActionRequest::Undo => ActionType::EditUndo,
            ActionRequest::Redo => ActionType::EditRedo,
            ActionRequest::Open(_) => ActionType::FileOpen,
            ActionRequest::Save(_) => ActionType::FileSave,
            ActionRequest::SaveAs(_) => ActionType::FileSaveAs,
            ActionRequest::New(_) => ActionType::DocNew,
        }
    }
}

pub struct Action<'ctx> {
    kind: ActionType,
    context: &'ctx mut dyn EditorContext,
    memento: Option<Memento>,
}

impl std::fmt::Debug for Action<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("kind", &self.kind)
            .field("memento", &self.memento)
            .finish()
    }
}

impl<'ctx> Action<'ctx> {
    /// Action of type `kind` waiting for its memento.
    pub fn new(kind: ActionType, context: &'ctx mut dyn EditorContext) -> Self {
        Self { kind, context, memento: None }
    }

    pub fn with_memento(memento: Memento, context: &'ctx mut dyn EditorContext) -> Self {
        Self { kind: memento.action_type(), context, memento: Some(memento) }
    }

    /// Build the action for `request` from the context's current selection
    /// and clipboard.
    pub fn capture(request: ActionRequest, context: &'ctx mut dyn EditorContext) -> Self {
        let selection = context.selection().clamp(context.document().len());
        let begin = wire_position(selection.begin());
        let end = wire_position(selection.end());
        let block = BlockPosition { pos: wire_position(selection.position) };
        let toggle = |enabled| CharToggle { begin, end, enabled };
        let color = |color| CharColor { begin, end, color };
        let file = |path: PathBuf| FilePath { path: path.to_string_lossy().into_owned() };

        let memento = match request {
            ActionRequest::Bold(enabled) => Memento::Bold(toggle(enabled)),
            ActionRequest::Italic(enabled) => Memento::Italic(toggle(enabled)),
            ActionRequest::Underline(enabled) => Memento::Underline(toggle(enabled)),
            ActionRequest::Align(Alignment::Left) => Memento::AlignLeft(block),
            ActionRequest::Align(Alignment::Right) => Memento::AlignRight(block),
            ActionRequest::Align(Alignment::Center) => Memento::AlignCenter(block),
            ActionRequest::Align(Alignment::Justify) => Memento::AlignJustify(block),
            ActionRequest::Indent => Memento::Indent(block),
            ActionRequest::Unindent => Memento::Unindent(block),
            ActionRequest::Color(c) => Memento::Color(color(c)),
            ActionRequest::UnderlineColor(c) => Memento::UnderlineColor(color(c)),
            ActionRequest::Checked(checked) => {
                Memento::Checked(BlockChecked { pos: block.pos, checked })
            }
            ActionRequest::FontSize(size) => Memento::FontSize(CharSize { begin, end, size }),
            ActionRequest::FontFamily(family) => {
                Memento::FontFamily(CharFamily { begin, end, family })
            }
            ActionRequest::BlockStyle(style) => {
                Memento::BlockStyle(BlockStyleChange { pos: block.pos, style })
            }
            ActionRequest::Copy => Memento::Copy(SelectionRange { begin, end }),
            ActionRequest::Cut => Memento::Cut(SelectionRange { begin, end }),
            ActionRequest::Paste => Memento::Paste(PasteText {
                begin,
                end,
                text: context.clipboard().to_string(),
            }),
            ActionRequest::Undo => Memento::Undo,
            ActionRequest::Redo => Memento::Redo,
            ActionRequest::Open(path) => Memento::Open(file(path)),
            ActionRequest::Save(path) => Memento::Save(path.map(file).unwrap_or_default()),
            ActionRequest::SaveAs(path) => Memento::SaveAs(file(path)),
            ActionRequest::New(title) => Memento::New(DocumentTitle { title }),
        };
        Self::with_memento(memento, context)
    }

    pub fn action_type(&self) -> ActionType {
        self.kind
    }

    pub fn memento(&self) -> Option<&Memento> {
        self.memento.as_ref()
    }

    pub fn into_memento(self) -> Option<Memento> {
        self.memento
    }

    /// Attach a memento. Fails if it belongs to another action type.
    pub fn set_memento(&mut self, memento: Memento) -> Result<(), ActionError> {
        if memento.action_type() != self.kind {
            return Err(ActionError::InvalidMementoType {
                expected: self.kind,
                found: memento.action_type(),
            });
        }
        self.memento = Some(memento);
        Ok(())
    }

    /// Apply the action to the context. May be called repeatedly.
    pub fn execute(&mut self) -> Result<(), ActionError> {
        let memento = self
            .memento
            .as_ref()
            .ok_or(ActionError::MissingMemento(self.kind))?;
        let ctx = &mut *self.context;
        match self.kind.family() {
            ActionFamily::Char => format::execute_char(memento, ctx),
            ActionFamily::Block => format::execute_block(memento, ctx),
            ActionFamily::Edit => edit::execute(memento, ctx),
            ActionFamily::Document => document::execute(memento, ctx),
            ActionFamily::Text => edit::execute_text_change(memento, ctx),
        }
    }
}

fn position(field: &'static str, value: i32) -> Result<usize, ActionError> {
    usize::try_from(value).map_err(|_| ActionError::InvalidPosition { field, value })
}

fn wire_position(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Validated `[begin, end)` inside the current document.
fn range(ctx: &dyn EditorContext, begin: i32, end: i32) -> Result<Range<usize>, ActionError> {
    let begin = position("begin", begin)?;
    let end = position("end", end)?;
    let len = ctx.document().len();
    if begin > end || end > len {
        return Err(EditError::OutOfRange { begin, end, len }.into());
    }
    Ok(begin..end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_core::{Editor, Selection};

    #[test]
    fn test_execute_requires_memento() {
        let mut editor = Editor::default();
        let mut action = Action::new(ActionType::FormatBold, &mut editor);
        assert!(matches!(
            action.execute(),
            Err(ActionError::MissingMemento(ActionType::FormatBold))
        ));
    }

    #[test]
    fn test_set_memento_rejects_other_type() {
        let mut editor = Editor::default();
        let mut action = Action::new(ActionType::FormatBold, &mut editor);
        let err = action
            .set_memento(Memento::Indent(BlockPosition { pos: 0 }))
            .unwrap_err();
        assert!(matches!(
            err,
            ActionError::InvalidMementoType {
                expected: ActionType::FormatBold,
                found: ActionType::FormatIndent,
            }
        ));
        assert!(action.memento().is_none());
    }

    #[test]
    fn test_execute_is_repeatable() {
        let mut editor = Editor::default();
        editor.insert_text(0, "abc").unwrap();
        let memento = Memento::Bold(CharToggle { begin: 0, end: 3, enabled: true });
        let mut action = Action::with_memento(memento, &mut editor);
        action.execute().unwrap();
        action.execute().unwrap();
        assert_eq!(editor.document().char_format_at(1).unwrap().bold, Some(true));
    }

    #[test]
    fn test_capture_clamps_stale_selection() {
        let mut editor = Editor::default();
        editor.insert_text(0, "abcdef").unwrap();
        editor.set_selection(Selection::range(2, 6));
        editor.remove_text(3..6).unwrap();

        let action = Action::capture(ActionRequest::Italic(true), &mut editor);
        assert_eq!(
            action.memento(),
            Some(&Memento::Italic(CharToggle { begin: 2, end: 3, enabled: true }))
        );
    }

    #[test]
    fn test_negative_position_rejected() {
        let mut editor = Editor::default();
        let memento = Memento::Indent(BlockPosition { pos: -1 });
        let mut action = Action::with_memento(memento, &mut editor);
        assert!(matches!(
            action.execute(),
            Err(ActionError::InvalidPosition { field: "pos", value: -1 })
        ));
    }

    #[test]
    fn test_request_types() {
        assert_eq!(
            ActionRequest::Align(Alignment::Justify).action_type(),
            ActionType::FormatAlignJustify
        );
        assert_eq!(ActionRequest::Save(None).action_type(), ActionType::FileSave);
        assert_eq!(
            ActionRequest::BlockStyle(BlockStyle::Heading1).action_type(),
            ActionType::FormatBlockStyle
        );
    }
}

//! The editing context that replicated actions execute against.
//!
//! Implementors supply document access, selection, clipboard, history and
//! file handling; block and character operations come for free on top of
//! the current [`RichDocument`].

use crate::document::RichDocument;
use crate::format::{Alignment, BlockStyle, CharFormat};
use crate::html::HtmlError;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Range {begin}..{end} is outside of the document (length {len})")]
    OutOfRange { begin: usize, end: usize, len: usize },
    #[error("Block {block} does not exist (document has {count} blocks)")]
    NoSuchBlock { block: usize, count: usize },
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error("Nothing to redo")]
    NothingToRedo,
    #[error("Document '{title}' has never been saved and no path was given")]
    NoSavePath { title: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("HTML error: {0}")]
    Html(#[from] HtmlError),
}

/// Cursor position plus anchor. The selected range is always `begin()..end()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub position: usize,
    pub anchor: usize,
}

impl Selection {
    pub fn caret(pos: usize) -> Self {
        Self { position: pos, anchor: pos }
    }

    pub fn range(begin: usize, end: usize) -> Self {
        Self { position: end, anchor: begin }
    }

    pub fn begin(&self) -> usize {
        self.position.min(self.anchor)
    }

    pub fn end(&self) -> usize {
        self.position.max(self.anchor)
    }

    pub fn has_selection(&self) -> bool {
        self.position != self.anchor
    }

    pub fn clamp(self, len: usize) -> Self {
        Self { position: self.position.min(len), anchor: self.anchor.min(len) }
    }
}

pub trait EditorContext {
    fn document(&self) -> &RichDocument;
    fn document_mut(&mut self) -> &mut RichDocument;

    fn selection(&self) -> Selection;
    fn set_selection(&mut self, selection: Selection);

    fn clipboard(&self) -> &str;
    fn set_clipboard(&mut self, text: String);

    /// Record the current document state so the next edit can be undone.
    fn checkpoint(&mut self);
    fn undo(&mut self) -> Result<(), EditError>;
    fn redo(&mut self) -> Result<(), EditError>;

    fn current_title(&self) -> &str;
    /// Open an empty document under `title` and make it current.
    fn new_document(&mut self, title: &str);
    /// Load a UTF-8 HTML file and register it under its file name.
    fn open_document(&mut self, path: &Path) -> Result<String, EditError>;
    /// Save the current document as UTF-8 HTML. `None` reuses the path the
    /// document was last opened from or saved to.
    fn save_document(&mut self, path: Option<&Path>) -> Result<PathBuf, EditError>;

    fn word_at(&self, pos: usize) -> Range<usize> {
        self.document().word_at(pos)
    }

    fn text(&self, range: Range<usize>) -> Result<String, EditError> {
        self.document().text(range)
    }

    fn merge_char_format(
        &mut self,
        range: Range<usize>,
        format: &CharFormat,
    ) -> Result<(), EditError> {
        self.document_mut().merge_char_format(range, format)
    }

    fn set_alignment(&mut self, pos: usize, alignment: Alignment) -> Result<(), EditError> {
        let block = self.document().block_at(pos)?;
        self.document_mut().set_alignment(block, alignment)
    }

    fn indent(&mut self, pos: usize) -> Result<(), EditError> {
        let block = self.document().block_at(pos)?;
        self.document_mut().indent(block)
    }

    fn unindent(&mut self, pos: usize) -> Result<(), EditError> {
        let block = self.document().block_at(pos)?;
        self.document_mut().unindent(block)
    }

    fn set_checked(&mut self, pos: usize, checked: bool) -> Result<(), EditError> {
        let block = self.document().block_at(pos)?;
        self.document_mut().set_checked(block, checked)
    }

    fn apply_block_style(&mut self, pos: usize, style: BlockStyle) -> Result<(), EditError> {
        let block = self.document().block_at(pos)?;
        self.document_mut().apply_block_style(block, style)
    }

    fn insert_text(&mut self, pos: usize, text: &str) -> Result<(), EditError> {
        self.document_mut().insert(pos, text)
    }

    fn remove_text(&mut self, range: Range<usize>) -> Result<String, EditError> {
        self.document_mut().remove(range)
    }
}

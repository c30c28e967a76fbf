//! Quire editor model.
//!
//! Everything a replicated action needs to act on: rich documents with
//! character and block formatting, a tab-keyed document table, HTML files,
//! and the [`EditorContext`] trait that ties them to a selection, clipboard
//! and undo history. [`Editor`] is the headless implementation.

pub mod context;
pub mod document;
pub mod editor;
pub mod format;
pub mod history;
pub mod html;
pub mod table;

pub use context::{EditError, EditorContext, Selection};
pub use document::{Glyph, RichDocument};
pub use editor::Editor;
pub use format::{Alignment, BlockFormat, BlockStyle, CharFormat, List, ListId, ListStyle, Rgba};
pub use html::{from_html, to_html, HtmlError};
pub use table::{DocumentEntry, DocumentTable, UNTITLED};

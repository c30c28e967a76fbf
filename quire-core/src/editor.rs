use crate::context::{EditError, EditorContext, Selection};
use crate::document::RichDocument;
use crate::html::{from_html, to_html};
use crate::table::{DocumentTable, UNTITLED};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Headless editor: a table of documents, a selection in the current one,
/// a clipboard and per-document undo history.
#[derive(Debug, Clone)]
pub struct Editor {
    table: DocumentTable,
    selection: Selection,
    clipboard: String,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl Editor {
    pub fn new(history_limit: usize) -> Self {
        Self {
            table: DocumentTable::new(history_limit),
            selection: Selection::default(),
            clipboard: String::new(),
        }
    }

    pub fn table(&self) -> &DocumentTable {
        &self.table
    }

    /// Switch to another open document. The selection collapses to the start.
    pub fn select_document(&mut self, title: &str) -> bool {
        let found = self.table.select(title);
        if found {
            self.selection = Selection::default();
        }
        found
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.table.current().path.as_deref()
    }

    fn clamp_selection(&mut self) {
        let len = self.table.current().document.len();
        self.selection = self.selection.clamp(len);
    }
}

fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| UNTITLED.to_string())
}

impl EditorContext for Editor {
    fn document(&self) -> &RichDocument {
        &self.table.current().document
    }

    fn document_mut(&mut self) -> &mut RichDocument {
        &mut self.table.current_mut().document
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.clamp_selection();
    }

    fn clipboard(&self) -> &str {
        &self.clipboard
    }

    fn set_clipboard(&mut self, text: String) {
        self.clipboard = text;
    }

    fn checkpoint(&mut self) {
        let entry = self.table.current_mut();
        let snapshot = entry.document.clone();
        entry.history.record(snapshot);
    }

    fn undo(&mut self) -> Result<(), EditError> {
        let entry = self.table.current_mut();
        let current = std::mem::take(&mut entry.document);
        match entry.history.undo(current) {
            Ok(previous) => entry.document = previous,
            Err(current) => {
                entry.document = current;
                return Err(EditError::NothingToUndo);
            }
        }
        self.clamp_selection();
        Ok(())
    }

    fn redo(&mut self) -> Result<(), EditError> {
        let entry = self.table.current_mut();
        let current = std::mem::take(&mut entry.document);
        match entry.history.redo(current) {
            Ok(next) => entry.document = next,
            Err(current) => {
                entry.document = current;
                return Err(EditError::NothingToRedo);
            }
        }
        self.clamp_selection();
        Ok(())
    }

    fn current_title(&self) -> &str {
        &self.table.current().title
    }

    fn new_document(&mut self, title: &str) {
        if !self.table.add_document(title, RichDocument::new(), false) {
            debug!("Document '{}' already open, switching to it", title);
            self.table.select(title);
        }
        self.selection = Selection::default();
    }

    fn open_document(&mut self, path: &Path) -> Result<String, EditError> {
        let html = fs::read_to_string(path).map_err(|source| EditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = from_html(&html)?;
        let title = file_title(path);
        self.table.add_document(&title, document, true);
        self.table.current_mut().path = Some(path.to_path_buf());
        self.selection = Selection::default();
        info!("Opened '{}' from {}", title, path.display());
        Ok(title)
    }

    fn save_document(&mut self, path: Option<&Path>) -> Result<PathBuf, EditError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self
                .table
                .current()
                .path
                .clone()
                .ok_or_else(|| EditError::NoSavePath { title: self.current_title().to_string() })?,
        };
        let html = to_html(self.document());
        fs::write(&path, html).map_err(|source| EditError::Io { path: path.clone(), source })?;
        let title = file_title(&path);
        self.table.rename_current(&title);
        self.table.current_mut().path = Some(path.clone());
        info!("Saved '{}' to {}", title, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CharFormat;
    use tempfile::tempdir;

    #[test]
    fn test_undo_redo_restores_snapshots() {
        let mut editor = Editor::default();
        editor.checkpoint();
        editor.insert_text(0, "hello").unwrap();
        editor.checkpoint();
        editor
            .merge_char_format(0..5, &CharFormat::bold(true))
            .unwrap();

        editor.undo().unwrap();
        assert_eq!(editor.document().char_format_at(0).unwrap().bold, None);
        editor.undo().unwrap();
        assert!(editor.document().is_empty());
        assert!(matches!(editor.undo(), Err(EditError::NothingToUndo)));

        editor.redo().unwrap();
        assert_eq!(editor.document().plain_text(), "hello");
        editor.redo().unwrap();
        assert_eq!(editor.document().char_format_at(4).unwrap().bold, Some(true));
        assert!(matches!(editor.redo(), Err(EditError::NothingToRedo)));
    }

    #[test]
    fn test_undo_clamps_selection() {
        let mut editor = Editor::default();
        editor.checkpoint();
        editor.insert_text(0, "abcdef").unwrap();
        editor.set_selection(Selection::range(2, 6));
        editor.undo().unwrap();
        assert_eq!(editor.selection(), Selection::caret(0));
    }

    #[test]
    fn test_new_document_switches_to_existing() {
        let mut editor = Editor::default();
        editor.new_document("a");
        editor.insert_text(0, "text").unwrap();
        editor.new_document("b");
        editor.new_document("a");
        assert_eq!(editor.current_title(), "a");
        assert_eq!(editor.document().plain_text(), "text");
        assert_eq!(editor.table().len(), 3);
    }

    #[test]
    fn test_save_then_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draft.html");

        let mut editor = Editor::default();
        editor.insert_text(0, "saved text").unwrap();
        editor.save_document(Some(&path)).unwrap();
        assert_eq!(editor.current_title(), "draft.html");
        assert_eq!(editor.current_path(), Some(path.as_path()));

        editor.insert_text(0, "more ").unwrap();
        editor.save_document(None).unwrap();

        let mut other = Editor::default();
        let title = other.open_document(&path).unwrap();
        assert_eq!(title, "draft.html");
        assert_eq!(other.document().plain_text(), "more saved text");
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut editor = Editor::default();
        assert!(matches!(
            editor.save_document(None),
            Err(EditError::NoSavePath { .. })
        ));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let mut editor = Editor::default();
        let err = editor
            .open_document(&dir.path().join("missing.html"))
            .unwrap_err();
        assert!(matches!(err, EditError::Io { .. }));
        assert_eq!(editor.current_title(), UNTITLED);
    }
}

//! Tab-keyed table of open documents.

use crate::document::RichDocument;
use crate::history::History;
use std::path::PathBuf;

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub title: String,
    pub document: RichDocument,
    /// File the document was last opened from or saved to.
    pub path: Option<PathBuf>,
    pub history: History<RichDocument>,
}

impl DocumentEntry {
    fn new(title: &str, document: RichDocument, history_limit: usize) -> Self {
        Self {
            title: title.to_string(),
            document,
            path: None,
            history: History::new(history_limit),
        }
    }
}

/// Documents in tab order, keyed by unique title. There is always a current
/// document.
#[derive(Debug, Clone)]
pub struct DocumentTable {
    entries: Vec<DocumentEntry>,
    current: usize,
    history_limit: usize,
}

impl DocumentTable {
    /// Table holding a single empty "Untitled" document.
    pub fn new(history_limit: usize) -> Self {
        Self {
            entries: vec![DocumentEntry::new(UNTITLED, RichDocument::new(), history_limit)],
            current: 0,
            history_limit,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.title.as_str())
    }

    pub fn get(&self, title: &str) -> Option<&DocumentEntry> {
        self.entries.iter().find(|e| e.title == title)
    }

    pub fn current(&self) -> &DocumentEntry {
        &self.entries[self.current]
    }

    pub fn current_mut(&mut self) -> &mut DocumentEntry {
        &mut self.entries[self.current]
    }

    /// Register `document` under `title` and make it current.
    ///
    /// An existing entry with the same title is replaced only when
    /// `overwrite` is set; otherwise the table is left unchanged and `false`
    /// is returned.
    pub fn add_document(&mut self, title: &str, document: RichDocument, overwrite: bool) -> bool {
        match self.position(title) {
            Some(index) if overwrite => {
                self.entries[index] = DocumentEntry::new(title, document, self.history_limit);
                self.current = index;
                true
            }
            Some(_) => false,
            None => {
                self.entries
                    .push(DocumentEntry::new(title, document, self.history_limit));
                self.current = self.entries.len() - 1;
                true
            }
        }
    }

    /// Make the document titled `title` current.
    pub fn select(&mut self, title: &str) -> bool {
        match self.position(title) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    /// Rename the current document. Another document already holding
    /// `new_title` is closed.
    pub fn rename_current(&mut self, new_title: &str) {
        if self.current().title == new_title {
            return;
        }
        if let Some(index) = self.position(new_title) {
            self.entries.remove(index);
            if index < self.current {
                self.current -= 1;
            }
        }
        self.entries[self.current].title = new_title.to_string();
    }

    fn position(&self, title: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.title == title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_untitled() {
        let table = DocumentTable::new(10);
        assert_eq!(table.len(), 1);
        assert_eq!(table.current().title, UNTITLED);
        assert!(table.current().document.is_empty());
    }

    #[test]
    fn test_add_respects_overwrite() {
        let mut table = DocumentTable::new(10);
        assert!(table.add_document("a", RichDocument::from_plain_text("one"), false));
        assert!(!table.add_document("a", RichDocument::from_plain_text("two"), false));
        assert_eq!(table.get("a").unwrap().document.plain_text(), "one");

        table.select(UNTITLED);
        assert!(table.add_document("a", RichDocument::from_plain_text("two"), true));
        assert_eq!(table.current().title, "a");
        assert_eq!(table.current().document.plain_text(), "two");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_rename_current_replaces_clashing_entry() {
        let mut table = DocumentTable::new(10);
        table.add_document("notes.html", RichDocument::from_plain_text("old"), false);
        table.add_document("draft", RichDocument::from_plain_text("new"), false);
        table.rename_current("notes.html");

        let titles: Vec<&str> = table.titles().collect();
        assert_eq!(titles, vec![UNTITLED, "notes.html"]);
        assert_eq!(table.current().document.plain_text(), "new");
    }

    #[test]
    fn test_select_unknown_title() {
        let mut table = DocumentTable::new(10);
        assert!(!table.select("missing"));
        assert_eq!(table.current().title, UNTITLED);
    }
}

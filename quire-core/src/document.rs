//! Rich text document model.
//!
//! A document is a flat sequence of glyphs. Every `'\n'` glyph ends a block,
//! so a document with `n` newlines always has `n + 1` blocks:
//!
//! ```text
//!   glyphs:  H e l l o \n w o r l d
//!   blocks:  [    0     ] [   1    ]
//! ```
//!
//! Newline glyphs never carry character formatting. Blocks may belong to a
//! list; lists nobody references are pruned after every structural edit.

use crate::context::EditError;
use crate::format::{Alignment, BlockFormat, BlockStyle, CharFormat, List, ListId, ListStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glyph {
    pub ch: char,
    pub format: CharFormat,
}

impl Glyph {
    pub fn new(ch: char, format: CharFormat) -> Self {
        if ch == '\n' {
            Self { ch, format: CharFormat::default() }
        } else {
            Self { ch, format }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RichDocument {
    glyphs: Vec<Glyph>,
    blocks: Vec<BlockFormat>,
    lists: BTreeMap<ListId, List>,
    next_list: u32,
}

impl Default for RichDocument {
    fn default() -> Self {
        Self::new()
    }
}

// The list id counter is an allocation detail and does not take part in equality.
impl PartialEq for RichDocument {
    fn eq(&self, other: &Self) -> bool {
        self.glyphs == other.glyphs && self.blocks == other.blocks && self.lists == other.lists
    }
}

impl Eq for RichDocument {}

impl RichDocument {
    pub fn new() -> Self {
        Self {
            glyphs: Vec::new(),
            blocks: vec![BlockFormat::default()],
            lists: BTreeMap::new(),
            next_list: 0,
        }
    }

    /// Unformatted document holding `text`.
    pub fn from_plain_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.push_str(text, &CharFormat::default());
        doc
    }

    /// Number of glyphs, newlines included.
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, index: usize) -> Option<&BlockFormat> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[BlockFormat] {
        &self.blocks
    }

    pub fn list(&self, id: ListId) -> Option<&List> {
        self.lists.get(&id)
    }

    pub fn lists(&self) -> &BTreeMap<ListId, List> {
        &self.lists
    }

    pub fn plain_text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch).collect()
    }

    pub fn text(&self, range: Range<usize>) -> Result<String, EditError> {
        self.check_range(&range)?;
        Ok(self.glyphs[range].iter().map(|g| g.ch).collect())
    }

    pub fn char_format_at(&self, pos: usize) -> Option<&CharFormat> {
        self.glyphs.get(pos).map(|g| &g.format)
    }

    /// Index of the block containing `pos`. `pos == len()` is the last block.
    pub fn block_at(&self, pos: usize) -> Result<usize, EditError> {
        self.check_pos(pos)?;
        Ok(self.glyphs[..pos].iter().filter(|g| g.ch == '\n').count())
    }

    /// Glyph range of block `index`, excluding its terminating newline.
    pub fn block_range(&self, index: usize) -> Option<Range<usize>> {
        if index >= self.blocks.len() {
            return None;
        }
        let mut start = 0;
        let mut seen = 0;
        for (i, g) in self.glyphs.iter().enumerate() {
            if g.ch != '\n' {
                continue;
            }
            if seen == index {
                return Some(start..i);
            }
            seen += 1;
            start = i + 1;
        }
        Some(start..self.glyphs.len())
    }

    /// Range of the word touching `pos`; empty when `pos` is not on a word.
    pub fn word_at(&self, pos: usize) -> Range<usize> {
        let pos = pos.min(self.glyphs.len());
        let is_word = |i: usize| {
            self.glyphs
                .get(i)
                .map(|g| g.ch.is_alphanumeric() || g.ch == '_')
                .unwrap_or(false)
        };
        let mut begin = pos;
        while begin > 0 && is_word(begin - 1) {
            begin -= 1;
        }
        let mut end = pos;
        while is_word(end) {
            end += 1;
        }
        begin..end
    }

    /// Insert `text` at `pos`. Characters inherit the format of the preceding
    /// character in the same block.
    pub fn insert(&mut self, pos: usize, text: &str) -> Result<(), EditError> {
        let format = match pos.checked_sub(1).and_then(|p| self.glyphs.get(p)) {
            Some(prev) if prev.ch != '\n' => prev.format.clone(),
            _ => CharFormat::default(),
        };
        self.insert_formatted(pos, text, &format)
    }

    pub fn insert_formatted(
        &mut self,
        pos: usize,
        text: &str,
        format: &CharFormat,
    ) -> Result<(), EditError> {
        let mut block = self.block_at(pos)?;
        let mut at = pos;
        for ch in text.chars() {
            if ch == '\n' {
                let split = self.blocks[block].clone();
                self.blocks.insert(block + 1, split);
                block += 1;
            }
            self.glyphs.insert(at, Glyph::new(ch, format.clone()));
            at += 1;
        }
        Ok(())
    }

    /// Append `text` at the end of the document.
    pub fn push_str(&mut self, text: &str, format: &CharFormat) {
        for ch in text.chars() {
            if ch == '\n' {
                let last = self.blocks.last().cloned().unwrap_or_default();
                self.blocks.push(last);
            }
            self.glyphs.push(Glyph::new(ch, format.clone()));
        }
    }

    /// Remove the glyphs in `range`, joining blocks across removed newlines.
    /// The first block keeps its format.
    pub fn remove(&mut self, range: Range<usize>) -> Result<String, EditError> {
        self.check_range(&range)?;
        let block = self.block_at(range.start)?;
        let removed: Vec<Glyph> = self.glyphs.drain(range).collect();
        let joined = removed.iter().filter(|g| g.ch == '\n').count();
        self.blocks.drain(block + 1..block + 1 + joined);
        self.prune_lists();
        Ok(removed.into_iter().map(|g| g.ch).collect())
    }

    /// Merge `format` into every non-newline glyph of `range`.
    pub fn merge_char_format(
        &mut self,
        range: Range<usize>,
        format: &CharFormat,
    ) -> Result<(), EditError> {
        self.check_range(&range)?;
        for glyph in &mut self.glyphs[range] {
            if glyph.ch != '\n' {
                glyph.format.merge(format);
            }
        }
        Ok(())
    }

    pub fn set_alignment(&mut self, block: usize, alignment: Alignment) -> Result<(), EditError> {
        self.block_mut(block)?.alignment = alignment;
        Ok(())
    }

    pub fn set_checked(&mut self, block: usize, checked: bool) -> Result<(), EditError> {
        self.block_mut(block)?.checked = Some(checked);
        Ok(())
    }

    /// Increase the nesting level of a block. List items move to the next
    /// list level, reusing a neighbouring list of that level when one exists.
    pub fn indent(&mut self, block: usize) -> Result<(), EditError> {
        let current = self.block_mut(block)?.list;
        match current.and_then(|id| self.lists.get(&id).copied()) {
            Some(list) => {
                let target = List { style: list.style, indent: list.indent + 1 };
                let id = self.list_for(block, target);
                self.blocks[block].list = Some(id);
            }
            None => self.blocks[block].indent += 1,
        }
        self.prune_lists();
        Ok(())
    }

    /// Decrease the nesting level of a block. A list item at level 1 leaves
    /// its list.
    pub fn unindent(&mut self, block: usize) -> Result<(), EditError> {
        let current = self.block_mut(block)?.list;
        match current.and_then(|id| self.lists.get(&id).copied()) {
            Some(list) if list.indent <= 1 => {
                let format = &mut self.blocks[block];
                format.list = None;
                format.checked = None;
            }
            Some(list) => {
                let target = List { style: list.style, indent: list.indent - 1 };
                let id = self.list_for(block, target);
                self.blocks[block].list = Some(id);
            }
            None => {
                let format = &mut self.blocks[block];
                format.indent = format.indent.saturating_sub(1);
            }
        }
        self.prune_lists();
        Ok(())
    }

    pub fn apply_block_style(&mut self, block: usize, style: BlockStyle) -> Result<(), EditError> {
        let current = self.block_mut(block)?.list;
        match style.list_style() {
            Some(list_style) => {
                let indent = match current.and_then(|id| self.lists.get(&id)) {
                    Some(list) => list.indent,
                    None => self.blocks[block].indent + 1,
                };
                let wanted = List { style: list_style, indent };
                let id = match current {
                    Some(id) if self.lists.get(&id) == Some(&wanted) => id,
                    _ => self.list_for(block, wanted),
                };
                let format = &mut self.blocks[block];
                format.list = Some(id);
                format.indent = 0;
                format.heading = None;
                format.checked = style.checked();
            }
            None => {
                let format = &mut self.blocks[block];
                format.list = None;
                format.checked = None;
                format.heading = style.heading();
            }
        }
        self.prune_lists();
        Ok(())
    }

    /// Assemble a document from already split parts. `blocks` must hold one
    /// entry per newline plus one.
    pub(crate) fn from_parts(
        glyphs: Vec<Glyph>,
        blocks: Vec<BlockFormat>,
        lists: BTreeMap<ListId, List>,
    ) -> Self {
        debug_assert_eq!(blocks.len(), glyphs.iter().filter(|g| g.ch == '\n').count() + 1);
        let next_list = lists.keys().map(|id| id.0 + 1).max().unwrap_or(0);
        let mut doc = Self { glyphs, blocks, lists, next_list };
        doc.prune_lists();
        doc
    }

    // Adjacent list with the wanted style and level, or a freshly allocated one.
    fn list_for(&mut self, block: usize, wanted: List) -> ListId {
        let neighbours = [block.checked_sub(1), Some(block + 1)];
        for index in neighbours.into_iter().flatten() {
            if let Some(id) = self.blocks.get(index).and_then(|b| b.list) {
                if self.lists.get(&id) == Some(&wanted) {
                    return id;
                }
            }
        }
        let id = ListId(self.next_list);
        self.next_list += 1;
        self.lists.insert(id, wanted);
        id
    }

    fn prune_lists(&mut self) {
        let used: Vec<ListId> = self.blocks.iter().filter_map(|b| b.list).collect();
        self.lists.retain(|id, _| used.contains(id));
    }

    fn block_mut(&mut self, block: usize) -> Result<&mut BlockFormat, EditError> {
        let count = self.blocks.len();
        self.blocks
            .get_mut(block)
            .ok_or(EditError::NoSuchBlock { block, count })
    }

    fn check_pos(&self, pos: usize) -> Result<(), EditError> {
        if pos > self.glyphs.len() {
            return Err(EditError::OutOfRange { begin: pos, end: pos, len: self.glyphs.len() });
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), EditError> {
        if range.start > range.end || range.end > self.glyphs.len() {
            return Err(EditError::OutOfRange {
                begin: range.start,
                end: range.end,
                len: self.glyphs.len(),
            });
        }
        Ok(())
    }
}

/// Style of the list block `index` belongs to, if any.
pub fn list_style_of(doc: &RichDocument, index: usize) -> Option<ListStyle> {
    doc.block(index)
        .and_then(|b| b.list)
        .and_then(|id| doc.list(id))
        .map(|l| l.style)
}

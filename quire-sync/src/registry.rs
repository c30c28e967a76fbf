//! Payload schemas per action type.
//!
//! The registry is the single table the builder consults before turning a
//! tag into a memento. Every tag known to the protocol has exactly one
//! schema, listing the payload fields in wire order.

use crate::action_type::{ActionFamily, ActionType};
use crate::memento::Memento;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    I32,
    Bool,
    Rgba,
    String,
    /// Enumerated value stored as one byte.
    SubKind,
}

impl FieldKind {
    /// Encoded size of the smallest valid value.
    pub fn min_len(self) -> usize {
        match self {
            FieldKind::I32 | FieldKind::Rgba | FieldKind::String => 4,
            FieldKind::Bool | FieldKind::SubKind => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> Field {
    Field { name, kind }
}

const CHAR_TOGGLE: &[Field] = &[
    field("begin", FieldKind::I32),
    field("end", FieldKind::I32),
    field("enabled", FieldKind::Bool),
];
const CHAR_COLOR: &[Field] = &[
    field("begin", FieldKind::I32),
    field("end", FieldKind::I32),
    field("color", FieldKind::Rgba),
];
const CHAR_SIZE: &[Field] = &[
    field("begin", FieldKind::I32),
    field("end", FieldKind::I32),
    field("size", FieldKind::I32),
];
const CHAR_FAMILY: &[Field] = &[
    field("begin", FieldKind::I32),
    field("end", FieldKind::I32),
    field("family", FieldKind::String),
];
const NO_FIELDS: &[Field] = &[];
const BLOCK_POSITION: &[Field] = &[field("pos", FieldKind::I32)];
const BLOCK_CHECKED: &[Field] = &[field("pos", FieldKind::I32), field("checked", FieldKind::Bool)];
const BLOCK_STYLE: &[Field] = &[field("pos", FieldKind::I32), field("style", FieldKind::SubKind)];
const SELECTION_RANGE: &[Field] = &[field("begin", FieldKind::I32), field("end", FieldKind::I32)];
const PASTE_TEXT: &[Field] = &[
    field("begin", FieldKind::I32),
    field("end", FieldKind::I32),
    field("text", FieldKind::String),
];
const FILE_PATH: &[Field] = &[field("path", FieldKind::String)];
const DOCUMENT_TITLE: &[Field] = &[field("title", FieldKind::String)];
const TEXT_CHANGE: &[Field] = &[
    field("kind", FieldKind::SubKind),
    field("pos", FieldKind::I32),
    field("text", FieldKind::String),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSchema {
    pub action_type: ActionType,
    pub fields: &'static [Field],
}

impl ActionSchema {
    pub fn standard(action_type: ActionType) -> Self {
        use ActionType::*;
        let fields = match action_type {
            FormatBold | FormatItalic | FormatUnderline => CHAR_TOGGLE,
            FormatColor | FormatUnderlineColor => CHAR_COLOR,
            FontSize => CHAR_SIZE,
            FontFamily => CHAR_FAMILY,
            FormatAlignLeft | FormatAlignRight | FormatAlignCenter | FormatAlignJustify
            | FormatIndent | FormatUnindent => BLOCK_POSITION,
            FormatChecked => BLOCK_CHECKED,
            FormatBlockStyle => BLOCK_STYLE,
            EditCopy | EditCut => SELECTION_RANGE,
            EditPaste => PASTE_TEXT,
            EditUndo | EditRedo => NO_FIELDS,
            FileOpen | FileSave | FileSaveAs => FILE_PATH,
            DocNew => DOCUMENT_TITLE,
            TextChange => TEXT_CHANGE,
        };
        Self { action_type, fields }
    }

    pub fn family(&self) -> ActionFamily {
        self.action_type.family()
    }

    /// Smallest payload that can be valid for this schema.
    pub fn min_len(&self) -> usize {
        self.fields.iter().map(|f| f.kind.min_len()).sum()
    }

    /// Fresh memento of this schema's type, all fields at their defaults.
    pub fn instantiate(&self) -> Memento {
        Memento::empty(self.action_type)
    }
}

/// Tag → schema table.
#[derive(Debug, Clone)]
pub struct Registry {
    schemas: BTreeMap<ActionType, ActionSchema>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    /// Every action type with its standard schema.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for kind in ActionType::ALL {
            registry.register(ActionSchema::standard(kind));
        }
        registry
    }

    pub fn empty() -> Self {
        Self { schemas: BTreeMap::new() }
    }

    /// Add or replace a schema, returning the one it replaced.
    pub fn register(&mut self, schema: ActionSchema) -> Option<ActionSchema> {
        self.schemas.insert(schema.action_type, schema)
    }

    /// Registry with `kind` removed.
    pub fn without(mut self, kind: ActionType) -> Self {
        self.schemas.remove(&kind);
        self
    }

    pub fn lookup(&self, kind: ActionType) -> Option<&ActionSchema> {
        self.schemas.get(&kind)
    }

    pub fn lookup_tag(&self, tag: u16) -> Option<&ActionSchema> {
        ActionType::from_tag(tag).and_then(|kind| self.lookup(kind))
    }

    pub fn contains(&self, kind: ActionType) -> bool {
        self.schemas.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionSchema> {
        self.schemas.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_covers_every_tag() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), ActionType::ALL.len());
        for kind in ActionType::ALL {
            let schema = registry.lookup_tag(kind.tag()).unwrap();
            assert_eq!(schema.action_type, kind);
            assert_eq!(schema.instantiate().action_type(), kind);
        }
        assert!(registry.lookup_tag(999).is_none());
    }

    #[test]
    fn test_schema_matches_default_encoding() {
        // Default mementos use empty strings, so they hit the minimum size exactly.
        for schema in Registry::standard().iter() {
            assert_eq!(
                schema.instantiate().to_raw().len(),
                schema.min_len(),
                "{}",
                schema.action_type
            );
        }
    }

    #[test]
    fn test_field_order() {
        let schema = ActionSchema::standard(ActionType::TextChange);
        let names: Vec<&str> = schema.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["kind", "pos", "text"]);
        assert!(ActionSchema::standard(ActionType::EditUndo).fields.is_empty());
    }

    #[test]
    fn test_without_removes_only_that_type() {
        let registry = Registry::standard().without(ActionType::FontFamily);
        assert!(!registry.contains(ActionType::FontFamily));
        assert!(registry.contains(ActionType::FontSize));
        assert_eq!(registry.len(), ActionType::ALL.len() - 1);
    }
}

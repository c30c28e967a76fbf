//! The closed set of replicable edit commands.
//!
//! The numeric tag of every variant is part of the wire protocol. New
//! variants are appended; existing tags are never renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u16)]
pub enum ActionType {
    FormatBold = 0,
    FormatItalic = 1,
    FormatUnderline = 2,
    FormatAlignLeft = 3,
    FormatAlignRight = 4,
    FormatAlignCenter = 5,
    FormatAlignJustify = 6,
    FormatIndent = 7,
    FormatUnindent = 8,
    FormatColor = 9,
    FormatUnderlineColor = 10,
    FormatChecked = 11,
    FontSize = 12,
    FontFamily = 13,
    EditCopy = 14,
    EditPaste = 15,
    EditCut = 16,
    EditRedo = 17,
    EditUndo = 18,
    FileOpen = 19,
    FileSave = 20,
    FileSaveAs = 21,
    DocNew = 22,
    TextChange = 23,
    FormatBlockStyle = 24,
}

/// Which part of the editing context an action touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionFamily {
    /// Character formatting over a range.
    Char,
    /// Formatting of the block containing a position.
    Block,
    /// Clipboard and history.
    Edit,
    /// Document lifecycle and files.
    Document,
    /// Live keystrokes.
    Text,
}

impl ActionType {
    pub const ALL: [ActionType; 25] = [
        ActionType::FormatBold,
        ActionType::FormatItalic,
        ActionType::FormatUnderline,
        ActionType::FormatAlignLeft,
        ActionType::FormatAlignRight,
        ActionType::FormatAlignCenter,
        ActionType::FormatAlignJustify,
        ActionType::FormatIndent,
        ActionType::FormatUnindent,
        ActionType::FormatColor,
        ActionType::FormatUnderlineColor,
        ActionType::FormatChecked,
        ActionType::FontSize,
        ActionType::FontFamily,
        ActionType::EditCopy,
        ActionType::EditPaste,
        ActionType::EditCut,
        ActionType::EditRedo,
        ActionType::EditUndo,
        ActionType::FileOpen,
        ActionType::FileSave,
        ActionType::FileSaveAs,
        ActionType::DocNew,
        ActionType::TextChange,
        ActionType::FormatBlockStyle,
    ];

    pub fn tag(self) -> u16 {
        self as u16
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    pub fn family(self) -> ActionFamily {
        use ActionType::*;
        match self {
            FormatBold | FormatItalic | FormatUnderline | FormatColor | FormatUnderlineColor
            | FontSize | FontFamily => ActionFamily::Char,
            FormatAlignLeft | FormatAlignRight | FormatAlignCenter | FormatAlignJustify
            | FormatIndent | FormatUnindent | FormatChecked | FormatBlockStyle => {
                ActionFamily::Block
            }
            EditCopy | EditPaste | EditCut | EditRedo | EditUndo => ActionFamily::Edit,
            FileOpen | FileSave | FileSaveAs | DocNew => ActionFamily::Document,
            TextChange => ActionFamily::Text,
        }
    }

    /// Whether executing the action changes the current document.
    pub fn mutates_document(self) -> bool {
        !matches!(
            self,
            ActionType::EditCopy
                | ActionType::EditUndo
                | ActionType::EditRedo
                | ActionType::FileSave
                | ActionType::FileSaveAs
                | ActionType::FileOpen
                | ActionType::DocNew
        )
    }

    pub fn name(self) -> &'static str {
        use ActionType::*;
        match self {
            FormatBold => "FormatBold",
            FormatItalic => "FormatItalic",
            FormatUnderline => "FormatUnderline",
            FormatAlignLeft => "FormatAlignLeft",
            FormatAlignRight => "FormatAlignRight",
            FormatAlignCenter => "FormatAlignCenter",
            FormatAlignJustify => "FormatAlignJustify",
            FormatIndent => "FormatIndent",
            FormatUnindent => "FormatUnindent",
            FormatColor => "FormatColor",
            FormatUnderlineColor => "FormatUnderlineColor",
            FormatChecked => "FormatChecked",
            FontSize => "FontSize",
            FontFamily => "FontFamily",
            EditCopy => "EditCopy",
            EditPaste => "EditPaste",
            EditCut => "EditCut",
            EditRedo => "EditRedo",
            EditUndo => "EditUndo",
            FileOpen => "FileOpen",
            FileSave => "FileSave",
            FileSaveAs => "FileSaveAs",
            DocNew => "DocNew",
            TextChange => "TextChange",
            FormatBlockStyle => "FormatBlockStyle",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

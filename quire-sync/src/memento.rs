//! Action payloads.
//!
//! A [`Memento`] is the serializable state of one action. Its variant fixes
//! the [`ActionType`] for its whole life; [`Memento::init_from_raw`] only
//! replaces the field values.
//!
//! ```text
//! char     begin:i32 end:i32 value        (bool | rgba | i32 | string)
//! block    pos:i32 [value]                (bool | style:u8)
//! edit     begin:i32 end:i32 [text]       undo/redo carry nothing
//! document path|title:string
//! text     kind:u8 pos:i32 text:string
//! ```

use crate::action_type::ActionType;
use crate::codec::{CodecError, Decoder, Encoder, WireFormat};
use quire_core::{BlockStyle, Rgba};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharToggle {
    pub begin: i32,
    pub end: i32,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharColor {
    pub begin: i32,
    pub end: i32,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharSize {
    pub begin: i32,
    pub end: i32,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CharFamily {
    pub begin: i32,
    pub end: i32,
    pub family: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockPosition {
    pub pos: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockChecked {
    pub pos: i32,
    pub checked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockStyleChange {
    pub pos: i32,
    pub style: BlockStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionRange {
    pub begin: i32,
    pub end: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasteText {
    pub begin: i32,
    pub end: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilePath {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentTitle {
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TextChangeKind {
    #[default]
    Added = 0,
    Removed = 1,
}

impl TextChangeKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(TextChangeKind::Added),
            1 => Some(TextChangeKind::Removed),
            _ => None,
        }
    }
}

/// A keystroke-level change. For removals `text` is the removed text, so
/// its length gives the number of characters to delete.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextChange {
    pub kind: TextChangeKind,
    pub pos: i32,
    pub text: String,
}

impl WireFormat for CharToggle {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.begin).put_i32(self.end).put_bool(self.enabled);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            begin: dec.i32("begin")?,
            end: dec.i32("end")?,
            enabled: dec.bool("enabled")?,
        })
    }
}

impl WireFormat for CharColor {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.begin).put_i32(self.end).put(&self.color);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            begin: dec.i32("begin")?,
            end: dec.i32("end")?,
            color: dec.field("color")?,
        })
    }
}

impl WireFormat for CharSize {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.begin).put_i32(self.end).put_i32(self.size);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            begin: dec.i32("begin")?,
            end: dec.i32("end")?,
            size: dec.i32("size")?,
        })
    }
}

impl WireFormat for CharFamily {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.begin).put_i32(self.end).put_str(&self.family);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            begin: dec.i32("begin")?,
            end: dec.i32("end")?,
            family: dec.string("family")?,
        })
    }
}

impl WireFormat for BlockPosition {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.pos);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self { pos: dec.i32("pos")? })
    }
}

impl WireFormat for BlockChecked {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.pos).put_bool(self.checked);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            pos: dec.i32("pos")?,
            checked: dec.bool("checked")?,
        })
    }
}

impl WireFormat for BlockStyleChange {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.pos).put(&self.style);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            pos: dec.i32("pos")?,
            style: dec.field("style")?,
        })
    }
}

impl WireFormat for SelectionRange {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.begin).put_i32(self.end);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            begin: dec.i32("begin")?,
            end: dec.i32("end")?,
        })
    }
}

impl WireFormat for PasteText {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_i32(self.begin).put_i32(self.end).put_str(&self.text);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            begin: dec.i32("begin")?,
            end: dec.i32("end")?,
            text: dec.string("text")?,
        })
    }
}

impl WireFormat for FilePath {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_str(&self.path);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self { path: dec.string("path")? })
    }
}

impl WireFormat for DocumentTitle {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_str(&self.title);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self { title: dec.string("title")? })
    }
}

impl WireFormat for TextChange {
    fn encode(&self, enc: &mut Encoder) {
        enc.put_u8(self.kind as u8).put_i32(self.pos).put_str(&self.text);
    }

    fn decode_field(dec: &mut Decoder<'_>, _field: &'static str) -> Result<Self, CodecError> {
        Ok(Self {
            kind: dec.sub_kind("kind", TextChangeKind::from_u8)?,
            pos: dec.i32("pos")?,
            text: dec.string("text")?,
        })
    }
}

/// Payload of one action, tagged with its action type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Memento {
    Bold(CharToggle),
    Italic(CharToggle),
    Underline(CharToggle),
    AlignLeft(BlockPosition),
    AlignRight(BlockPosition),
    AlignCenter(BlockPosition),
    AlignJustify(BlockPosition),
    Indent(BlockPosition),
    Unindent(BlockPosition),
    Color(CharColor),
    UnderlineColor(CharColor),
    Checked(BlockChecked),
    FontSize(CharSize),
    FontFamily(CharFamily),
    Copy(SelectionRange),
    Paste(PasteText),
    Cut(SelectionRange),
    Redo,
    Undo,
    Open(FilePath),
    Save(FilePath),
    SaveAs(FilePath),
    New(DocumentTitle),
    TextChange(TextChange),
    BlockStyle(BlockStyleChange),
}

impl Memento {
    /// Default-valued memento for `kind`, ready for [`Memento::init_from_raw`].
    pub fn empty(kind: ActionType) -> Self {
        match kind {
            ActionType::FormatBold => Memento::Bold(Default::default()),
            ActionType::FormatItalic => Memento::Italic(Default::default()),
            ActionType::FormatUnderline => Memento::Underline(Default::default()),
            ActionType::FormatAlignLeft => Memento::AlignLeft(Default::default()),
            ActionType::FormatAlignRight => Memento::AlignRight(Default::default()),
            ActionType::FormatAlignCenter => Memento::AlignCenter(Default::default()),
            ActionType::FormatAlignJustify => Memento::AlignJustify(Default::default()),
            ActionType::FormatIndent => Memento::Indent(Default::default()),
            ActionType::FormatUnindent => Memento::Unindent(Default::default()),
            ActionType::FormatColor => Memento::Color(Default::default()),
            ActionType::FormatUnderlineColor => Memento::UnderlineColor(Default::default()),
            ActionType::FormatChecked => Memento::Checked(Default::default()),
            ActionType::FontSize => Memento::FontSize(Default::default()),
            ActionType::FontFamily => Memento::FontFamily(Default::default()),
            ActionType::EditCopy => Memento::Copy(Default::default()),
            ActionType::EditPaste => Memento::Paste(Default::default()),
            ActionType::EditCut => Memento::Cut(Default::default()),
            ActionType::EditRedo => Memento::Redo,
            ActionType::EditUndo => Memento::Undo,
            ActionType::FileOpen => Memento::Open(Default::default()),
            ActionType::FileSave => Memento::Save(Default::default()),
            ActionType::FileSaveAs => Memento::SaveAs(Default::default()),
            ActionType::DocNew => Memento::New(Default::default()),
            ActionType::TextChange => Memento::TextChange(Default::default()),
            ActionType::FormatBlockStyle => Memento::BlockStyle(Default::default()),
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Memento::Bold(_) => ActionType::FormatBold,
            Memento::Italic(_) => ActionType::FormatItalic,
            Memento::Underline(_) => ActionType::FormatUnderline,
            Memento::AlignLeft(_) => ActionType::FormatAlignLeft,
            Memento::AlignRight(_) => ActionType::FormatAlignRight,
            Memento::AlignCenter(_) => ActionType::FormatAlignCenter,
            Memento::AlignJustify(_) => ActionType::FormatAlignJustify,
            Memento::Indent(_) => ActionType::FormatIndent,
            Memento::Unindent(_) => ActionType::FormatUnindent,
            Memento::Color(_) => ActionType::FormatColor,
            Memento::UnderlineColor(_) => ActionType::FormatUnderlineColor,
            Memento::Checked(_) => ActionType::FormatChecked,
            Memento::FontSize(_) => ActionType::FontSize,
            Memento::FontFamily(_) => ActionType::FontFamily,
            Memento::Copy(_) => ActionType::EditCopy,
            Memento::Paste(_) => ActionType::EditPaste,
            Memento::Cut(_) => ActionType::EditCut,
            Memento::Redo => ActionType::EditRedo,
            Memento::Undo => ActionType::EditUndo,
            Memento::Open(_) => ActionType::FileOpen,
            Memento::Save(_) => ActionType::FileSave,
            Memento::SaveAs(_) => ActionType::FileSaveAs,
            Memento::New(_) => ActionType::DocNew,
            Memento::TextChange(_) => ActionType::TextChange,
            Memento::BlockStyle(_) => ActionType::FormatBlockStyle,
        }
    }

    pub fn encode(&self, enc: &mut Encoder) {
        match self {
            Memento::Bold(p) | Memento::Italic(p) | Memento::Underline(p) => p.encode(enc),
            Memento::AlignLeft(p)
            | Memento::AlignRight(p)
            | Memento::AlignCenter(p)
            | Memento::AlignJustify(p)
            | Memento::Indent(p)
            | Memento::Unindent(p) => p.encode(enc),
            Memento::Color(p) | Memento::UnderlineColor(p) => p.encode(enc),
            Memento::Checked(p) => p.encode(enc),
            Memento::FontSize(p) => p.encode(enc),
            Memento::FontFamily(p) => p.encode(enc),
            Memento::Copy(p) | Memento::Cut(p) => p.encode(enc),
            Memento::Paste(p) => p.encode(enc),
            Memento::Redo | Memento::Undo => {}
            Memento::Open(p) | Memento::Save(p) | Memento::SaveAs(p) => p.encode(enc),
            Memento::New(p) => p.encode(enc),
            Memento::TextChange(p) => p.encode(enc),
            Memento::BlockStyle(p) => p.encode(enc),
        }
    }

    pub fn to_raw(&self) -> Vec<u8> {
        let mut enc = Encoder::with_capacity(16);
        self.encode(&mut enc);
        enc.into_vec()
    }

    /// Replace the field values with the ones decoded from `raw`. The whole
    /// input must be consumed. On error the memento is left unchanged.
    pub fn init_from_raw(&mut self, raw: &[u8]) -> Result<(), CodecError> {
        let mut dec = Decoder::new(raw);
        let decoded = match self {
            Memento::Bold(_) => Memento::Bold(dec.field("payload")?),
            Memento::Italic(_) => Memento::Italic(dec.field("payload")?),
            Memento::Underline(_) => Memento::Underline(dec.field("payload")?),
            Memento::AlignLeft(_) => Memento::AlignLeft(dec.field("payload")?),
            Memento::AlignRight(_) => Memento::AlignRight(dec.field("payload")?),
            Memento::AlignCenter(_) => Memento::AlignCenter(dec.field("payload")?),
            Memento::AlignJustify(_) => Memento::AlignJustify(dec.field("payload")?),
            Memento::Indent(_) => Memento::Indent(dec.field("payload")?),
            Memento::Unindent(_) => Memento::Unindent(dec.field("payload")?),
            Memento::Color(_) => Memento::Color(dec.field("payload")?),
            Memento::UnderlineColor(_) => Memento::UnderlineColor(dec.field("payload")?),
            Memento::Checked(_) => Memento::Checked(dec.field("payload")?),
            Memento::FontSize(_) => Memento::FontSize(dec.field("payload")?),
            Memento::FontFamily(_) => Memento::FontFamily(dec.field("payload")?),
            Memento::Copy(_) => Memento::Copy(dec.field("payload")?),
            Memento::Paste(_) => Memento::Paste(dec.field("payload")?),
            Memento::Cut(_) => Memento::Cut(dec.field("payload")?),
            Memento::Redo => Memento::Redo,
            Memento::Undo => Memento::Undo,
            Memento::Open(_) => Memento::Open(dec.field("payload")?),
            Memento::Save(_) => Memento::Save(dec.field("payload")?),
            Memento::SaveAs(_) => Memento::SaveAs(dec.field("payload")?),
            Memento::New(_) => Memento::New(dec.field("payload")?),
            Memento::TextChange(_) => Memento::TextChange(dec.field("payload")?),
            Memento::BlockStyle(_) => Memento::BlockStyle(dec.field("payload")?),
        };
        dec.finish()?;
        *self = decoded;
        Ok(())
    }

    pub fn from_raw(kind: ActionType, raw: &[u8]) -> Result<Self, CodecError> {
        let mut memento = Memento::empty(kind);
        memento.init_from_raw(raw)?;
        Ok(memento)
    }
}

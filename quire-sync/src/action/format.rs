use super::{position, range, ActionError};
use crate::memento::Memento;
use quire_core::{Alignment, CharFormat, EditorContext};
use std::ops::Range;

/// Target of a character format: the explicit range, or the word touching
/// `begin` when the range is empty.
fn char_target(
    ctx: &dyn EditorContext,
    begin: i32,
    end: i32,
) -> Result<Range<usize>, ActionError> {
    let target = range(ctx, begin, end)?;
    if target.is_empty() {
        return Ok(ctx.word_at(target.start));
    }
    Ok(target)
}

pub(super) fn execute_char(memento: &Memento, ctx: &mut dyn EditorContext) -> Result<(), ActionError> {
    let (begin, end, format) = match memento {
        Memento::Bold(p) => (p.begin, p.end, CharFormat::bold(p.enabled)),
        Memento::Italic(p) => (p.begin, p.end, CharFormat::italic(p.enabled)),
        Memento::Underline(p) => (p.begin, p.end, CharFormat::underline(p.enabled)),
        Memento::Color(p) => (p.begin, p.end, CharFormat::foreground(p.color)),
        Memento::UnderlineColor(p) => (p.begin, p.end, CharFormat::underline_color(p.color)),
        Memento::FontSize(p) => (p.begin, p.end, CharFormat::point_size(p.size)),
        Memento::FontFamily(p) => (p.begin, p.end, CharFormat::family(p.family.clone())),
        other => {
            return Err(ActionError::InvalidMementoType {
                expected: other.action_type(),
                found: other.action_type(),
            })
        }
    };
    let target = char_target(ctx, begin, end)?;
    log::trace!("Merging {:?} into {:?}", format, target);
    ctx.checkpoint();
    ctx.merge_char_format(target, &format)?;
    Ok(())
}

pub(super) fn execute_block(memento: &Memento, ctx: &mut dyn EditorContext) -> Result<(), ActionError> {
    let pos = match memento {
        Memento::AlignLeft(p)
        | Memento::AlignRight(p)
        | Memento::AlignCenter(p)
        | Memento::AlignJustify(p)
        | Memento::Indent(p)
        | Memento::Unindent(p) => p.pos,
        Memento::Checked(p) => p.pos,
        Memento::BlockStyle(p) => p.pos,
        other => {
            return Err(ActionError::InvalidMementoType {
                expected: other.action_type(),
                found: other.action_type(),
            })
        }
    };
    let pos = position("pos", pos)?;
    // Validates the position before any history is recorded.
    ctx.document().block_at(pos)?;
    ctx.checkpoint();
    match memento {
        Memento::AlignLeft(_) => ctx.set_alignment(pos, Alignment::Left)?,
        Memento::AlignRight(_) => ctx.set_alignment(pos, Alignment::Right)?,
        Memento::AlignCenter(_) => ctx.set_alignment(pos, Alignment::Center)?,
        Memento::AlignJustify(_) => ctx.set_alignment(pos, Alignment::Justify)?,
        Memento::Indent(_) => ctx.indent(pos)?,
        Memento::Unindent(_) => ctx.unindent(pos)?,
        Memento::Checked(p) => ctx.set_checked(pos, p.checked)?,
        Memento::BlockStyle(p) => ctx.apply_block_style(pos, p.style)?,
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memento::{BlockChecked, BlockPosition, BlockStyleChange, CharColor, CharToggle};
    use quire_core::{BlockStyle, Editor, EditError, Rgba};

    fn editor(text: &str) -> Editor {
        let mut editor = Editor::default();
        editor.insert_text(0, text).unwrap();
        editor
    }

    #[test]
    fn test_empty_range_selects_word() {
        let mut ctx = editor("hello world");
        let memento = Memento::Bold(CharToggle { begin: 8, end: 8, enabled: true });
        execute_char(&memento, &mut ctx).unwrap();
        let doc = ctx.document();
        assert_eq!(doc.char_format_at(5).unwrap().bold, None);
        assert_eq!(doc.char_format_at(6).unwrap().bold, Some(true));
        assert_eq!(doc.char_format_at(10).unwrap().bold, Some(true));
    }

    #[test]
    fn test_color_merges_without_clobbering() {
        let mut ctx = editor("abc");
        execute_char(&Memento::Italic(CharToggle { begin: 0, end: 3, enabled: true }), &mut ctx)
            .unwrap();
        let red = Rgba::opaque(255, 0, 0);
        execute_char(&Memento::Color(CharColor { begin: 1, end: 2, color: red }), &mut ctx)
            .unwrap();
        let format = ctx.document().char_format_at(1).unwrap();
        assert_eq!(format.italic, Some(true));
        assert_eq!(format.foreground, Some(red));
    }

    #[test]
    fn test_out_of_range_records_no_history() {
        let mut ctx = editor("abc");
        let memento = Memento::Underline(CharToggle { begin: 1, end: 10, enabled: true });
        let err = execute_char(&memento, &mut ctx).unwrap_err();
        assert!(matches!(err, ActionError::Edit(EditError::OutOfRange { .. })));
        assert!(matches!(ctx.undo(), Err(EditError::NothingToUndo)));
    }

    #[test]
    fn test_block_actions_target_block_of_position() {
        let mut ctx = editor("one\ntwo");
        execute_block(&Memento::AlignCenter(BlockPosition { pos: 5 }), &mut ctx).unwrap();
        execute_block(
            &Memento::BlockStyle(BlockStyleChange { pos: 5, style: BlockStyle::TaskUnchecked }),
            &mut ctx,
        )
        .unwrap();
        execute_block(&Memento::Checked(BlockChecked { pos: 4, checked: true }), &mut ctx)
            .unwrap();

        let doc = ctx.document();
        assert_eq!(doc.block(0).unwrap().alignment, Alignment::Left);
        let second = doc.block(1).unwrap();
        assert_eq!(second.alignment, Alignment::Center);
        assert_eq!(second.checked, Some(true));
        assert!(second.list.is_some());
    }

    #[test]
    fn test_indent_then_unindent() {
        let mut ctx = editor("x");
        execute_block(&Memento::Indent(BlockPosition { pos: 0 }), &mut ctx).unwrap();
        assert_eq!(ctx.document().block(0).unwrap().indent, 1);
        execute_block(&Memento::Unindent(BlockPosition { pos: 1 }), &mut ctx).unwrap();
        assert_eq!(ctx.document().block(0).unwrap().indent, 0);
    }
}

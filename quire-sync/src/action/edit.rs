use super::{position, range, ActionError};
use crate::memento::{Memento, TextChange, TextChangeKind};
use quire_core::{EditError, EditorContext};
use std::ops::Range;

pub(super) fn execute(memento: &Memento, ctx: &mut dyn EditorContext) -> Result<(), ActionError> {
    match memento {
        Memento::Copy(p) => {
            let target = range(ctx, p.begin, p.end)?;
            let text = ctx.text(target)?;
            ctx.set_clipboard(text);
        }
        Memento::Cut(p) => {
            let target = range(ctx, p.begin, p.end)?;
            ctx.checkpoint();
            let removed = ctx.remove_text(target)?;
            ctx.set_clipboard(removed);
        }
        Memento::Paste(p) => {
            let target = range(ctx, p.begin, p.end)?;
            let at = target.start;
            ctx.checkpoint();
            ctx.remove_text(target)?;
            ctx.insert_text(at, &p.text)?;
        }
        Memento::Undo => ctx.undo()?,
        Memento::Redo => ctx.redo()?,
        other => {
            return Err(ActionError::InvalidMementoType {
                expected: other.action_type(),
                found: other.action_type(),
            })
        }
    }
    Ok(())
}

pub(super) fn execute_text_change(
    memento: &Memento,
    ctx: &mut dyn EditorContext,
) -> Result<(), ActionError> {
    let Memento::TextChange(change) = memento else {
        return Err(ActionError::InvalidMementoType {
            expected: crate::action_type::ActionType::TextChange,
            found: memento.action_type(),
        });
    };
    let span = text_change_span(change, ctx.document().len())?;
    match change.kind {
        TextChangeKind::Added => {
            ctx.checkpoint();
            ctx.insert_text(span.start, &change.text)?;
        }
        TextChangeKind::Removed => {
            ctx.checkpoint();
            let removed = ctx.remove_text(span.clone())?;
            if removed != change.text {
                log::debug!(
                    "Removed {:?} at {} where the origin removed {:?}",
                    removed,
                    span.start,
                    change.text
                );
            }
        }
    }
    Ok(())
}

/// Characters a text change touches in a document of `len` characters. An
/// insertion yields the empty range at its position.
pub(crate) fn text_change_span(change: &TextChange, len: usize) -> Result<Range<usize>, ActionError> {
    let pos = position("pos", change.pos)?;
    let end = match change.kind {
        TextChangeKind::Added => pos,
        TextChangeKind::Removed => pos.saturating_add(change.text.chars().count()),
    };
    if end > len {
        return Err(EditError::OutOfRange { begin: pos, end, len }.into());
    }
    Ok(pos..end)
}

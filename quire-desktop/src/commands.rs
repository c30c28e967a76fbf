//! Line commands read from stdin by the `quire` binary.

use quire_core::{Alignment, BlockStyle, Editor, EditorContext, Selection, to_html};
use quire_sync::{ActionRequest, SyncCoordinator, SyncError, TextChange, TextChangeKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command '{0}'")]
    Unknown(String),
    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("Invalid argument '{value}' for '{command}'")]
    InvalidArgument { command: &'static str, value: String },
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Select { begin: usize, end: usize },
    Type { pos: usize, text: String },
    Erase { pos: usize, len: usize },
    Request(ActionRequest),
    Show,
    Quit,
}

/// What the input loop does after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Print(String),
    Quit,
}

/// Parse one line. Blank lines and `#` comments yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word {
        "select" => {
            let (begin, end) = two_numbers("select", rest, "BEGIN END")?;
            Command::Select { begin, end }
        }
        "type" => {
            let (pos, text) = rest.split_once(' ').unwrap_or((rest, ""));
            if text.is_empty() {
                return Err(CommandError::MissingArgument { command: "type", expected: "POS TEXT" });
            }
            Command::Type { pos: number("type", pos)?, text: text.replace("\\n", "\n") }
        }
        "erase" => {
            let (pos, len) = two_numbers("erase", rest, "POS LEN")?;
            Command::Erase { pos, len }
        }
        "bold" => Command::Request(ActionRequest::Bold(switch("bold", rest)?)),
        "italic" => Command::Request(ActionRequest::Italic(switch("italic", rest)?)),
        "underline" => Command::Request(ActionRequest::Underline(switch("underline", rest)?)),
        "check" => Command::Request(ActionRequest::Checked(switch("check", rest)?)),
        "color" => Command::Request(ActionRequest::Color(color("color", rest)?)),
        "ucolor" => Command::Request(ActionRequest::UnderlineColor(color("ucolor", rest)?)),
        "size" => {
            let size = rest.parse::<i32>().map_err(|_| invalid("size", rest))?;
            Command::Request(ActionRequest::FontSize(size))
        }
        "family" => Command::Request(ActionRequest::FontFamily(required("family", rest, "NAME")?)),
        "align" => {
            let alignment = Alignment::from_css(rest).ok_or_else(|| invalid("align", rest))?;
            Command::Request(ActionRequest::Align(alignment))
        }
        "style" => {
            let style = BlockStyle::from_name(rest).ok_or_else(|| invalid("style", rest))?;
            Command::Request(ActionRequest::BlockStyle(style))
        }
        "indent" => Command::Request(ActionRequest::Indent),
        "unindent" => Command::Request(ActionRequest::Unindent),
        "copy" => Command::Request(ActionRequest::Copy),
        "cut" => Command::Request(ActionRequest::Cut),
        "paste" => Command::Request(ActionRequest::Paste),
        "undo" => Command::Request(ActionRequest::Undo),
        "redo" => Command::Request(ActionRequest::Redo),
        "new" => Command::Request(ActionRequest::New(required("new", rest, "TITLE")?)),
        "open" => Command::Request(ActionRequest::Open(required("open", rest, "PATH")?.into())),
        "save" => {
            let path = (!rest.is_empty()).then(|| PathBuf::from(rest));
            Command::Request(ActionRequest::Save(path))
        }
        "saveas" => {
            Command::Request(ActionRequest::SaveAs(required("saveas", rest, "PATH")?.into()))
        }
        "show" => Command::Show,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn invalid(command: &'static str, value: &str) -> CommandError {
    CommandError::InvalidArgument { command, value: value.to_string() }
}

fn required(
    command: &'static str,
    rest: &str,
    expected: &'static str,
) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, expected })
    } else {
        Ok(rest.to_string())
    }
}

fn number(command: &'static str, value: &str) -> Result<usize, CommandError> {
    value.parse().map_err(|_| invalid(command, value))
}

fn two_numbers(
    command: &'static str,
    rest: &str,
    expected: &'static str,
) -> Result<(usize, usize), CommandError> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(a), Some(b), None) => Ok((number(command, a)?, number(command, b)?)),
        _ => Err(CommandError::MissingArgument { command, expected }),
    }
}

fn switch(command: &'static str, rest: &str) -> Result<bool, CommandError> {
    match rest {
        "on" => Ok(true),
        "off" => Ok(false),
        "" => Err(CommandError::MissingArgument { command, expected: "on|off" }),
        other => Err(invalid(command, other)),
    }
}

fn color(command: &'static str, rest: &str) -> Result<quire_core::Rgba, CommandError> {
    quire_core::Rgba::parse_hex(rest).ok_or_else(|| invalid(command, rest))
}

/// Run a parsed command against the coordinator. Typing goes through the
/// keystroke path so peers see it as a text change.
pub fn execute(
    coordinator: &mut SyncCoordinator<Editor>,
    command: Command,
) -> Result<Outcome, SyncError> {
    match command {
        Command::Select { begin, end } => {
            coordinator.editor_mut().set_selection(Selection::range(begin, end));
        }
        Command::Type { pos, text } => {
            log::trace!("type {} chars at {pos}", text.chars().count());
            coordinator.keystroke(TextChange {
                kind: TextChangeKind::Added,
                pos: to_wire(pos),
                text,
            })?;
        }
        Command::Erase { pos, len } => {
            let text = coordinator
                .editor()
                .text(pos..pos.saturating_add(len))
                .map_err(quire_sync::ActionError::from)?;
            coordinator.keystroke(TextChange {
                kind: TextChangeKind::Removed,
                pos: to_wire(pos),
                text,
            })?;
        }
        Command::Request(request) => {
            let memento = coordinator.originate(request)?;
            log::debug!("Sent {}", memento.action_type());
        }
        Command::Show => {
            let editor = coordinator.editor();
            return Ok(Outcome::Print(format!(
                "[{}]\n{}",
                editor.current_title(),
                to_html(editor.document())
            )));
        }
        Command::Quit => return Ok(Outcome::Quit),
    }
    Ok(Outcome::Continue)
}

fn to_wire(pos: usize) -> i32 {
    i32::try_from(pos).unwrap_or(i32::MAX)
}

use super::ActionError;
use crate::action_type::ActionType;
use crate::memento::Memento;
use quire_core::EditorContext;
use std::path::Path;

pub(super) fn execute(memento: &Memento, ctx: &mut dyn EditorContext) -> Result<(), ActionError> {
    match memento {
        Memento::New(p) => ctx.new_document(&p.title),
        Memento::Open(p) => {
            if p.path.is_empty() {
                return Err(ActionError::MissingPath(ActionType::FileOpen));
            }
            ctx.open_document(Path::new(&p.path))?;
        }
        Memento::Save(p) => {
            let path = (!p.path.is_empty()).then(|| Path::new(&p.path));
            ctx.save_document(path)?;
        }
        Memento::SaveAs(p) => {
            if p.path.is_empty() {
                return Err(ActionError::MissingPath(ActionType::FileSaveAs));
            }
            ctx.save_document(Some(Path::new(&p.path)))?;
        }
        other => {
            return Err(ActionError::InvalidMementoType {
                expected: other.action_type(),
                found: other.action_type(),
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memento::{DocumentTitle, FilePath};
    use quire_core::{EditError, Editor, UNTITLED};
    use tempfile::tempdir;

    fn file(path: &Path) -> FilePath {
        FilePath { path: path.to_string_lossy().into_owned() }
    }

    #[test]
    fn test_new_switches_current_document() {
        let mut ctx = Editor::default();
        execute(&Memento::New(DocumentTitle { title: "draft".to_string() }), &mut ctx).unwrap();
        assert_eq!(ctx.current_title(), "draft");
        assert_eq!(ctx.table().len(), 2);
    }

    #[test]
    fn test_save_without_path_needs_known_location() {
        let mut ctx = Editor::default();
        let err = execute(&Memento::Save(FilePath::default()), &mut ctx).unwrap_err();
        assert!(matches!(err, ActionError::Edit(EditError::NoSavePath { .. })));
        assert_eq!(ctx.current_title(), UNTITLED);
    }

    #[test]
    fn test_save_as_then_plain_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.html");
        let mut ctx = Editor::default();
        ctx.insert_text(0, "first").unwrap();

        execute(&Memento::SaveAs(file(&path)), &mut ctx).unwrap();
        assert_eq!(ctx.current_title(), "notes.html");

        ctx.insert_text(5, " second").unwrap();
        execute(&Memento::Save(FilePath::default()), &mut ctx).unwrap();
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("first second"));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let mut ctx = Editor::default();
        let err = execute(&Memento::Open(file(&dir.path().join("absent.html"))), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, ActionError::Edit(EditError::Io { .. })));
        assert!(matches!(
            execute(&Memento::Open(FilePath::default()), &mut ctx),
            Err(ActionError::MissingPath(ActionType::FileOpen))
        ));
    }
}

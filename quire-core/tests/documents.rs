use quire_core::{
    Alignment, BlockStyle, CharFormat, EditorContext, Editor, Rgba, Selection, UNTITLED,
};
use tempfile::tempdir;

fn formatted_editor() -> Editor {
    let mut editor = Editor::default();
    editor
        .insert_text(0, "Shopping\nmilk\neggs\nfooter")
        .unwrap();
    editor.apply_block_style(0, BlockStyle::Heading2).unwrap();
    editor.apply_block_style(9, BlockStyle::TaskChecked).unwrap();
    editor.apply_block_style(14, BlockStyle::TaskUnchecked).unwrap();
    editor.set_alignment(20, Alignment::Center).unwrap();
    editor
        .merge_char_format(9..13, &CharFormat::underline(true))
        .unwrap();
    editor
        .merge_char_format(9..13, &CharFormat::underline_color(Rgba::new(0, 0, 255, 128)))
        .unwrap();
    editor
        .merge_char_format(19..25, &CharFormat::point_size(8))
        .unwrap();
    editor
}

#[test]
fn test_formatted_document_survives_save_and_open() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("list.html");

    let mut editor = formatted_editor();
    editor.save_document(Some(&path)).unwrap();

    let mut reader = Editor::default();
    reader.open_document(&path).unwrap();
    assert_eq!(reader.document(), editor.document());
    assert_eq!(reader.current_title(), "list.html");

    let titles: Vec<&str> = reader.table().titles().collect();
    assert_eq!(titles, vec![UNTITLED, "list.html"]);
}

#[test]
fn test_reopening_overwrites_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.html");
    std::fs::write(&path, "<p>first</p>").unwrap();

    let mut editor = Editor::default();
    editor.open_document(&path).unwrap();
    std::fs::write(&path, "<p>second</p>").unwrap();
    editor.open_document(&path).unwrap();

    assert_eq!(editor.table().len(), 2);
    assert_eq!(editor.document().plain_text(), "second");
}

#[test]
fn test_word_under_cursor() {
    let mut editor = formatted_editor();
    editor.set_selection(Selection::caret(16));
    let word = editor.word_at(editor.selection().begin());
    assert_eq!(editor.text(word).unwrap(), "eggs");
}

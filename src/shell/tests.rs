use super::*;
use tempfile::TempDir;

#[test]
fn menu_choices_parse_from_their_keys() {
    assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::AddFiles));
    assert_eq!(MenuChoice::parse(" 7 "), Some(MenuChoice::Ask));
    assert_eq!(MenuChoice::parse("0"), Some(MenuChoice::Quit));
    assert_eq!(MenuChoice::parse("8"), None);
    assert_eq!(MenuChoice::parse("11"), None);
    assert_eq!(MenuChoice::parse(""), None);

    for choice in MenuChoice::ALL {
        assert_eq!(MenuChoice::parse(&choice.key().to_string()), Some(choice));
    }
}

#[test]
fn menu_labels() {
    assert_eq!(MenuChoice::AddFiles.to_string(), "1. 📂 Add Files");
    assert_eq!(MenuChoice::Quit.to_string(), "0. 🚪 Quit");
}

#[test]
fn lists_only_supported_files_sorted() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let dir = temp_dir.path();
    for name in [
        "b.txt",
        "a.pdf",
        "slides.PPTX",
        "requirements.txt",
        "data.csv",
        "README",
    ] {
        std::fs::write(dir.join(name), "x").expect("fixture written");
    }
    std::fs::create_dir(dir.join("nested.txt")).expect("dir created");

    let files = list_supported_files(dir).expect("listed");
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().expect("name").to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, ["a.pdf", "b.txt", "slides.PPTX"]);
}

#[test]
fn listing_missing_directory_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    assert!(list_supported_files(&temp_dir.path().join("nope")).is_err());
}

#[test]
fn selection_parses_one_based_numbers() {
    assert_eq!(parse_selection("1", 3), Ok(vec![0]));
    assert_eq!(parse_selection("3, 1", 3), Ok(vec![2, 0]));
    assert_eq!(parse_selection("2,2,2", 3), Ok(vec![1]));
}

#[test]
fn selection_ignores_non_numeric_tokens() {
    assert_eq!(parse_selection("1, abc, ,2", 2), Ok(vec![0, 1]));
    assert_eq!(parse_selection("abc", 2), Err(SelectionError::Empty));
    assert_eq!(parse_selection("", 2), Err(SelectionError::Empty));
}

#[test]
fn selection_rejects_out_of_range() {
    assert_eq!(
        parse_selection("1,4", 3),
        Err(SelectionError::OutOfRange(4, 3))
    );
    assert_eq!(
        parse_selection("0", 3),
        Err(SelectionError::OutOfRange(0, 3))
    );
}

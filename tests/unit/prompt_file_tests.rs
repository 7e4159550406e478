//! Unit tests for temporary prompt files.

use agent_conductor::models::EngineId;
use agent_conductor::runner::PromptFile;

#[test]
fn file_holds_payload_and_is_removed_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let file = PromptFile::create(dir.path(), EngineId::Claude, "a very long prompt").unwrap();
    let path = file.path().to_path_buf();

    assert!(path
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("claude_stdin_"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "a very long prompt");

    drop(file);
    assert!(!path.exists());
}

#[test]
fn substitute_replaces_trailing_prompt_token() {
    let dir = tempfile::tempdir().unwrap();
    let file = PromptFile::create(dir.path(), EngineId::Claude, "payload").unwrap();

    let mut argv = vec!["claude".to_owned(), "-r".to_owned(), "s1".to_owned(), "payload".to_owned()];
    file.substitute(&mut argv, "payload");

    assert_eq!(argv.len(), 4);
    assert_eq!(argv[2], "s1");
    assert_eq!(
        argv[3],
        format!("Read the full prompt from the file at {}", file.path().display())
    );
}

#[test]
fn substitute_appends_when_prompt_token_absent() {
    let dir = tempfile::tempdir().unwrap();
    let file = PromptFile::create(dir.path(), EngineId::Claude, "payload").unwrap();

    let mut argv = vec!["claude".to_owned(), "-r".to_owned(), "s1".to_owned()];
    file.substitute(&mut argv, "payload");

    assert_eq!(argv.len(), 4);
    assert_eq!(argv[2], "s1");
    assert_eq!(argv[3], file.directive());
}

#[test]
fn missing_directory_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PromptFile::create(&dir.path().join("absent"), EngineId::Claude, "x").unwrap_err();
    assert!(matches!(err, agent_conductor::AppError::Io(_)), "got {err:?}");
}

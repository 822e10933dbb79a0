use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const DIAGNOSTIC: &str = "API key not found. Please set GEMINI_API_KEY in your .env file.";

fn run_console(cwd: &Path, args: &[&str]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_chat_console"))
        .args(args)
        .current_dir(cwd)
        .env_remove("GEMINI_API_KEY")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    // The process may already have exited; a broken pipe is expected then.
    let _ = child.stdin.take().unwrap().write_all(b"hello\nexit\n");
    child.wait_with_output().unwrap()
}

#[test]
fn missing_api_key_fails_before_reading_input() {
    let dir = tempfile::tempdir().unwrap();

    let output = run_console(dir.path(), &[]);

    assert_eq!(Some(1), output.status.code());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains(DIAGNOSTIC));
}

#[test]
fn env_file_without_api_key_fails_before_reading_input() {
    let dir = tempfile::tempdir().unwrap();
    let env_file = dir.path().join("chat.env");
    std::fs::write(&env_file, "GEMINI_MODEL=gemini-2.0-flash\nGEMINI_API_KEY=\n").unwrap();

    let output = run_console(dir.path(), &["--env-file", env_file.to_str().unwrap()]);

    assert_eq!(Some(1), output.status.code());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains(DIAGNOSTIC));
}

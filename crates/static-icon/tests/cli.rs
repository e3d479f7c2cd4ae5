use std::process::Command;

#[test]
fn help_exits_successfully() {
    // Arrange
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_static-icon"));
    cmd.arg("--help");

    // Act
    let output = cmd.output().expect("failed to execute static-icon");

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("File Explorer taskbar button"));
    assert!(stdout.contains("doctor"));
    assert!(stdout.contains("symbols"));
}

#[test]
fn version_exits_successfully() {
    // Arrange
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_static-icon"));
    cmd.arg("--version");

    // Act
    let output = cmd.output().expect("failed to execute static-icon");

    // Assert
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("static-icon"));
}

#[test]
fn symbols_accepts_a_search_path() {
    let output = Command::new(env!("CARGO_BIN_EXE_static-icon"))
        .args(["symbols", "--help"])
        .output()
        .expect("failed to execute static-icon");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("--search-path"));
}

#[test]
fn unknown_subcommand_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_static-icon"))
        .arg("start")
        .output()
        .expect("failed to execute static-icon");

    assert!(!output.status.success());
}

// tests/cli_test.rs
use std::process::Command;

fn gha_ci() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_gha-ci"));
    cmd.env_remove("GITHUB_OUTPUT")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GITHUB_REPOSITORY");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let output = gha_ci().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    for command in [
        "changes",
        "changed-dirs",
        "release-label",
        "version",
        "publish",
        "cleanup",
        "trigger-tests",
        "report-test",
    ] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
}

#[test]
fn test_unknown_command_fails() {
    let output = gha_ci().arg("deploy-everything").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_invalid_label_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let output = gha_ci()
        .args(["--root", root.path().to_str().unwrap()])
        .args(["version", "--unit", "foo", "--release-label", "huge"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("huge"));
}

#[test]
fn test_missing_repository_is_rejected() {
    let output = gha_ci()
        .args(["release-label", "--pull-number", "1", "--token", "t"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

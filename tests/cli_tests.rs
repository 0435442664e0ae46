// CLI behaviour that needs no OMBEA hardware

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const QUESTIONS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/questions.json");

/// Binary isolated from the developer's .env, config file and credentials
fn caces_vote(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("caces-vote").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("OMBEA_CLIENT_ID")
        .env_remove("OMBEA_CLIENT_SECRET")
        .env_remove("RUST_LOG")
        .env("CACES_VOTE__OBSERVABILITY__LOG_LEVEL", "warn");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    caces_vote(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("links"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("rehearse"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_prints_defaults() {
    let dir = TempDir::new().unwrap();
    caces_vote(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url = \"http://localhost:9236\""))
        .stdout(predicate::str::contains("default_time_limit_secs = 30"));
}

#[test]
fn test_config_write_applies_environment_overrides() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("written.toml");

    caces_vote(&dir)
        .env("CACES_VOTE__SESSION__AUTO_CLOSE_POLLS", "true")
        .args(["config", "--write"])
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written"));

    let written = std::fs::read_to_string(&target).unwrap();
    assert!(written.contains("auto_close_polls = true"));
}

#[test]
fn test_config_file_is_read_from_flag() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("salle-b.toml");
    std::fs::write(
        &config_path,
        "[hardware]\nbase_url = \"http://10.0.0.5:9236\"\n",
    )
    .unwrap();

    caces_vote(&dir)
        .arg("config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("http://10.0.0.5:9236"));
}

#[test]
fn test_check_without_credentials_fails() {
    let dir = TempDir::new().unwrap();
    caces_vote(&dir)
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Client ID ou Client Secret manquant."))
        .stderr(predicate::str::contains("OMBEA hardware not ready"));
}

#[test]
fn test_rehearse_in_test_mode_runs_every_question() {
    let dir = TempDir::new().unwrap();
    caces_vote(&dir)
        .args(["rehearse", "--test-mode", "--poll-seconds", "1", "--questions", QUESTIONS])
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 1/2"))
        .stdout(predicate::str::contains("Question 2/2"))
        .stdout(predicate::str::contains("B. La capacité effective"))
        .stdout(predicate::str::contains("A. Vrai"))
        .stdout(predicate::str::contains("Rehearsal finished"));
}

#[test]
fn test_rehearse_with_missing_question_file_fails() {
    let dir = TempDir::new().unwrap();
    caces_vote(&dir)
        .args(["rehearse", "--test-mode", "--questions", "absent.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read questions"));
}

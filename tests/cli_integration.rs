//! Integration tests for the supass CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Stdin is never a terminal here, so the binary reads one line per
//! field; with no stdin at all any prompt fails immediately.

use std::fs;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: a supass Command pointed at `dir`, isolated from the caller's env.
fn supass(dir: &std::path::Path) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("supass").expect("binary should exist");
    cmd.env_remove("SUPASS_DIR")
        .env_remove("SUPASS_ENCRYPT_KEY")
        .env_remove("RUST_LOG")
        .arg("-f")
        .arg(dir);
    cmd
}

#[test]
fn help_flag_shows_usage() {
    #[allow(deprecated)]
    Command::cargo_bin("supass")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("id/password vault"))
        .stdout(predicate::str::contains("--account_id"))
        .stdout(predicate::str::contains("--account_file_path"))
        .stdout(predicate::str::contains("--encrypt_key"))
        .stdout(predicate::str::contains("--is_new_account"));
}

#[test]
fn version_flag_shows_version() {
    #[allow(deprecated)]
    Command::cargo_bin("supass")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("supass"));
}

#[test]
fn first_run_prompts_and_second_run_loads() {
    let tmp = TempDir::new().unwrap();
    let vault = tmp.path().join("vault");

    supass(&vault)
        .arg("--reveal")
        .write_stdin("alice\ns3cret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("s3cret"))
        .stderr(predicate::str::contains("saved"));

    let contents = fs::read_to_string(vault.join("accounts.cfg")).unwrap();
    assert!(contents.contains("id = alice"));
    assert!(!contents.contains("s3cret"));
    assert!(vault.join(".encrypt_key").is_file());

    // No stdin: succeeding proves nothing was prompted.
    supass(&vault)
        .arg("--reveal")
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("s3cret"));
}

#[test]
fn passwords_are_masked_without_reveal() {
    let tmp = TempDir::new().unwrap();

    supass(tmp.path())
        .write_stdin("alice\ns3cret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("s3cret").not());
}

#[test]
fn missing_input_fails() {
    let tmp = TempDir::new().unwrap();

    supass(tmp.path())
        .write_stdin("alice\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Prompt interrupted"));
}

#[test]
fn accounts_are_separate_sections() {
    let tmp = TempDir::new().unwrap();

    supass(tmp.path())
        .args(["-i", "home"])
        .write_stdin("alice\none\n")
        .assert()
        .success();
    supass(tmp.path())
        .args(["-i", "work"])
        .write_stdin("bob\ntwo\n")
        .assert()
        .success();

    supass(tmp.path())
        .args(["-i", "home", "--reveal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("alice"))
        .stdout(predicate::str::contains("one"));

    let contents = fs::read_to_string(tmp.path().join("accounts.cfg")).unwrap();
    assert!(contents.contains("[home]"));
    assert!(contents.contains("[work]"));
}

#[test]
fn new_account_flag_reprompts() {
    let tmp = TempDir::new().unwrap();

    supass(tmp.path())
        .write_stdin("alice\ns3cret\n")
        .assert()
        .success();
    supass(tmp.path())
        .arg("-n")
        .write_stdin("bob\nhunter2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("bob"));

    supass(tmp.path())
        .arg("--reveal")
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2"));
}

#[test]
fn tampered_ciphertext_reprompts_unless_strict() {
    let tmp = TempDir::new().unwrap();

    supass(tmp.path())
        .write_stdin("alice\ns3cret\n")
        .assert()
        .success();

    let path = tmp.path().join("accounts.cfg");
    let contents = fs::read_to_string(&path).unwrap();
    fs::write(&path, contents.replace("pw = ", "pw = !")).unwrap();

    supass(tmp.path())
        .arg("--strict")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid ciphertext"));

    supass(tmp.path())
        .arg("--reveal")
        .write_stdin("alice\nfresh\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("fresh"));
}

#[test]
fn explicit_key_is_not_written() {
    let tmp = TempDir::new().unwrap();

    supass(tmp.path())
        .args(["-k", "AbCdEfGhIj"])
        .write_stdin("alice\ns3cret\n")
        .assert()
        .success();
    assert!(!tmp.path().join(".encrypt_key").exists());

    supass(tmp.path())
        .args(["-k", "AbCdEfGhIj", "--reveal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s3cret"));
}

#[test]
fn custom_schema_file() {
    let tmp = TempDir::new().unwrap();
    let schema = tmp.path().join("schema.toml");
    fs::write(
        &schema,
        "[[field]]\nkey = \"token\"\nkind = \"password\"\nprompt = \"Token: \"\n",
    )
    .unwrap();

    supass(&tmp.path().join("vault"))
        .arg("--schema")
        .arg(&schema)
        .arg("--reveal")
        .write_stdin("tok_123\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("token"))
        .stdout(predicate::str::contains("tok_123"))
        .stderr(predicate::str::contains("Token: "));
}

#[test]
fn settings_file_sets_default_account() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("settings.toml"),
        "default_account = \"personal\"\n",
    )
    .unwrap();

    supass(tmp.path())
        .write_stdin("alice\ns3cret\n")
        .assert()
        .success();

    let contents = fs::read_to_string(tmp.path().join("accounts.cfg")).unwrap();
    assert!(contents.contains("[personal]"));
}

#[test]
fn vault_path_that_is_a_file_fails() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("plain");
    fs::write(&file, "x").unwrap();

    supass(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Storage error"));
}

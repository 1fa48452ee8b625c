#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TEST_PASSWORD: &str = "test-password-123";

/// `oxprefs` against a temporary store directory with cheap key derivation.
fn oxprefs(dir: &TempDir) -> Command {
    let mut cmd = oxprefs_no_password(dir);
    cmd.env("OXPREFS_PASSWORD", TEST_PASSWORD);
    cmd
}

fn oxprefs_no_password(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("oxprefs").unwrap();
    cmd.env("OXPREFS_DIR", dir.path())
        .env("OXPREFS_KDF_LOG_N", "10")
        .env_remove("OXPREFS_PASSWORD")
        .env_remove("OXPREFS_STORE")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted key-value preferences"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_put_then_get_typed() {
    let dir = TempDir::new().unwrap();

    oxprefs(&dir)
        .args(["put", "age", "30", "--type", "int"])
        .assert()
        .success();

    oxprefs(&dir)
        .args(["get", "age", "--type", "int"])
        .assert()
        .success()
        .stdout("30\n");

    // Any stored text reads back as a string
    oxprefs(&dir)
        .args(["get", "age"])
        .assert()
        .success()
        .stdout("30\n");
}

#[test]
fn test_store_file_has_no_plaintext() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir)
        .args(["put", "api_key", "sk-live-abcdef"])
        .assert()
        .success();

    let text = fs::read_to_string(dir.path().join("default.json")).unwrap();
    assert!(!text.contains("api_key"));
    assert!(!text.contains("sk-live-abcdef"));
}

#[test]
fn test_get_missing_key() {
    let dir = TempDir::new().unwrap();

    oxprefs(&dir)
        .args(["get", "missing"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Key not found: missing"));

    oxprefs(&dir)
        .args(["get", "missing", "--default", "fallback"])
        .assert()
        .success()
        .stdout("fallback\n");
}

#[test]
fn test_get_type_mismatch_uses_default() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir)
        .args(["put", "name", "Some Test String"])
        .assert()
        .success();

    oxprefs(&dir)
        .args(["get", "name", "--type", "int", "--default", "-1"])
        .assert()
        .success()
        .stdout("-1\n");
}

#[test]
fn test_put_rejects_invalid_value() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir)
        .args(["put", "count", "many", "--type", "int"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid int value"));
}

#[test]
fn test_wrong_password_sees_nothing() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir)
        .args(["put", "secret", "value"])
        .assert()
        .success();

    oxprefs(&dir)
        .args(["--password", "wrong-password", "get", "secret", "--default", "none"])
        .assert()
        .success()
        .stdout("none\n");
}

#[test]
fn test_rm() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir).args(["put", "k", "v"]).assert().success();
    oxprefs(&dir).args(["rm", "k"]).assert().success();
    oxprefs(&dir).args(["get", "k"]).assert().code(3);

    oxprefs(&dir).args(["rm", "k"]).assert().code(3);
    oxprefs(&dir).args(["rm", "k", "--force"]).assert().success();
}

#[test]
fn test_keys_json_and_raw() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir).args(["put", "b", "2"]).assert().success();
    oxprefs(&dir).args(["put", "a", "1"]).assert().success();

    let output = oxprefs(&dir).args(["keys", "--json"]).output().unwrap();
    assert!(output.status.success());
    let keys: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(keys, vec!["a", "b"]);

    let output = oxprefs(&dir).args(["keys", "--raw", "--json"]).output().unwrap();
    let tokens: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tokens.len(), 2);
    assert!(!tokens.contains(&"a".to_string()));

    oxprefs(&dir)
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("Key"))
        .stdout(predicate::str::contains("a"));
}

#[test]
fn test_import_json_file() {
    let dir = TempDir::new().unwrap();
    let legacy = dir.path().join("legacy.json");
    fs::write(&legacy, r#"{"theme": "dark", "volume": "7"}"#).unwrap();

    oxprefs(&dir)
        .arg("import")
        .arg(&legacy)
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported 2 entries"));

    // Running again without --override writes nothing
    oxprefs(&dir)
        .arg("import")
        .arg(&legacy)
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported 0 entries"));

    oxprefs(&dir)
        .args(["get", "volume", "--type", "int"])
        .assert()
        .success()
        .stdout("7\n");

    oxprefs(&dir)
        .arg("import")
        .arg(&legacy)
        .arg("--remove")
        .assert()
        .success();
    let remaining: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&legacy).unwrap()).unwrap();
    assert_eq!(remaining, serde_json::json!({}));
}

#[test]
fn test_import_typed_json_values() {
    let dir = TempDir::new().unwrap();
    let legacy = dir.path().join("typed.json");
    fs::write(
        &legacy,
        r#"{"launches": 3, "beta": true, "ratio": 0.5, "theme": "dark", "skip": null,
            "installed": {"type": "long", "value": 1700000000000}}"#,
    )
    .unwrap();

    oxprefs(&dir)
        .arg("import")
        .arg(&legacy)
        .arg("--remove")
        .assert()
        .success()
        .stderr(predicate::str::contains("Imported 5 entries"));

    oxprefs(&dir)
        .args(["get", "launches", "--type", "int"])
        .assert()
        .success()
        .stdout("3\n");
    oxprefs(&dir)
        .args(["get", "beta", "--type", "bool"])
        .assert()
        .success()
        .stdout("true\n");
    oxprefs(&dir)
        .args(["get", "ratio", "--type", "float"])
        .assert()
        .success()
        .stdout("0.5\n");
    oxprefs(&dir)
        .args(["get", "installed", "--type", "long"])
        .assert()
        .success()
        .stdout("1700000000000\n");

    // Entries without a preference form stay behind in the source
    let remaining: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&legacy).unwrap()).unwrap();
    assert_eq!(remaining, serde_json::json!({"skip": null}));
}

#[test]
fn test_import_rejects_non_object() {
    let dir = TempDir::new().unwrap();
    let legacy = dir.path().join("list.json");
    fs::write(&legacy, "[1, 2, 3]").unwrap();

    oxprefs(&dir)
        .arg("import")
        .arg(&legacy)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a JSON object"));
}

#[test]
fn test_wipe_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir).args(["put", "k", "v"]).assert().success();

    oxprefs(&dir)
        .arg("wipe")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    oxprefs(&dir).args(["get", "k"]).assert().success();

    oxprefs(&dir)
        .args(["wipe", "--yes"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Deleted 1 entries"));
    oxprefs(&dir).args(["get", "k"]).assert().code(3);
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let dir = TempDir::new().unwrap();
    let output = oxprefs(&dir)
        .args(["encrypt", "hello world"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let token = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));

    oxprefs(&dir)
        .args(["decrypt", &token])
        .assert()
        .success()
        .stdout("hello world\n");

    oxprefs(&dir)
        .args(["--password", "other", "decrypt", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be decrypted"));
}

#[test]
fn test_password_stdin() {
    let dir = TempDir::new().unwrap();
    oxprefs_no_password(&dir)
        .args(["--password-stdin", "put", "k", "from-stdin"])
        .write_stdin(format!("{TEST_PASSWORD}\n"))
        .assert()
        .success();

    // Same password via the environment reads the value
    oxprefs(&dir)
        .args(["get", "k"])
        .assert()
        .success()
        .stdout("from-stdin\n");

    oxprefs_no_password(&dir)
        .args(["--password-stdin", "keys"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty"));
}

#[test]
fn test_named_store_and_corrupt_file() {
    let dir = TempDir::new().unwrap();
    oxprefs(&dir)
        .args(["--store", "work", "put", "k", "v"])
        .assert()
        .success();
    assert!(dir.path().join("work.json").exists());
    assert!(!dir.path().join("default.json").exists());

    fs::write(dir.path().join("broken.json"), "not json").unwrap();
    oxprefs(&dir)
        .args(["--store", "broken", "keys"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("corrupt"));
}

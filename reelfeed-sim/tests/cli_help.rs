use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;

#[test]
fn help_mentions_options() {
    let mut cmd = cargo_bin_cmd!("reelfeed-sim");
    let output = cmd
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    for flag in ["--script", "--config", "--posts", "--videos-per-post"] {
        assert!(text.contains(flag), "help missing {flag}");
    }
}

#[test]
fn missing_script_is_an_error() {
    let mut cmd = cargo_bin_cmd!("reelfeed-sim");
    cmd.arg("--script")
        .arg("does/not/exist.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read session script"));
}

#[test]
fn replays_script_and_prints_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("session.toml");
    fs::write(
        &script,
        r#"
        [[step]]
        action = "post_viewability"
        items = [{ index = 1 }]

        [[step]]
        action = "advance_ms"
        ms = 1000
        "#,
    )
    .unwrap();
    let config = dir.path().join("reelfeed.toml");
    fs::write(&config, "debounce_ms = 120\n").unwrap();

    let mut cmd = cargo_bin_cmd!("reelfeed-sim");
    let output = cmd
        .arg("--script")
        .arg(&script)
        .arg("--config")
        .arg(&config)
        .arg("--posts")
        .arg("4")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["active_slot"]["post_index"], 1);
    assert_eq!(report["active_slot"]["video_index"], 0);
    assert_eq!(report["elapsed_ms"], 1000);
    assert_eq!(report["analytics"]["playback_start"], 1);
    assert_eq!(report["watch"]["total_entries"], 1);
}

#[test]
fn invalid_config_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("session.toml");
    fs::write(&script, "").unwrap();
    let config = dir.path().join("reelfeed.toml");
    fs::write(&config, "[prefetch]\nconcurrency = 0\n").unwrap();

    let mut cmd = cargo_bin_cmd!("reelfeed-sim");
    cmd.arg("--script")
        .arg(&script)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("coordinator refused configuration"));
}

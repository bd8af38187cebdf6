use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn transcript(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("transcript").unwrap();
    cmd.current_dir(config_dir.path())
        .env_remove("DEEPGRAM_API_KEY")
        .arg("--config")
        .arg(config_dir.path().join("config.yaml"));
    cmd
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("transcript")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn fetch_subtitle_file_as_json() {
    let dir = TempDir::new().unwrap();

    let assert = transcript(&dir)
        .args(["--quiet", "fetch", "--subtitle-file"])
        .arg(fixture("sample.vtt"))
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(json["source"], "subtitle-track");
    assert_eq!(json["subtitle_count"], 2);
    assert_eq!(json["total_duration"], 8.25);
    assert_eq!(json["language"], "en");
    assert_eq!(json["subtitles"][0]["text"], "Hello there");
    assert_eq!(json["subtitles"][1]["text"], "General Kenobi");
}

#[test]
fn fetch_subtitle_file_as_text() {
    let dir = TempDir::new().unwrap();

    transcript(&dir)
        .args(["--quiet", "fetch", "--format", "text", "--language", "de", "--subtitle-file"])
        .arg(fixture("sample.vtt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("[00:00:01.000 --> 00:00:03.000] Hello there"))
        .stdout(predicate::str::contains("[00:00:05.500 --> 00:00:08.250] General Kenobi"));
}

#[test]
fn fetch_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("transcripts").join("sample.json");

    transcript(&dir)
        .args(["--quiet", "fetch", "--subtitle-file"])
        .arg(fixture("sample.vtt"))
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    let saved = fs_err::read_to_string(&out).unwrap();
    assert!(saved.contains("\"subtitle_count\": 2"));
}

#[test]
fn fetch_without_input_fails() {
    let dir = TempDir::new().unwrap();

    transcript(&dir).arg("fetch").assert().failure();
}

#[test]
fn fetch_rejects_invalid_video() {
    let dir = TempDir::new().unwrap();

    transcript(&dir)
        .args(["--quiet", "fetch", "https://example.com/watch?v=dQw4w9WgXcQ"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn fetch_reports_every_exhausted_source() {
    let dir = TempDir::new().unwrap();
    let empty = dir.path().join("empty.vtt");
    fs_err::write(&empty, "WEBVTT\n\n").unwrap();

    transcript(&dir)
        .args(["--quiet", "fetch", "--subtitle-file"])
        .arg(&empty)
        .assert()
        .failure()
        .stderr(predicate::str::contains("All transcript sources exhausted"))
        .stderr(predicate::str::contains("structured-api: skipped"))
        .stderr(predicate::str::contains("subtitle-track: no result"));
}

#[test]
fn config_show_prints_defaults() {
    let dir = TempDir::new().unwrap();

    transcript(&dir)
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nova-2"));

    assert!(dir.path().join("config.yaml").exists());
}

#[cfg(unix)]
#[test]
fn second_interrupt_aborts_a_stuck_fetch() {
    use std::os::unix::fs::PermissionsExt;
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let dir = TempDir::new().unwrap();
    let ffmpeg = dir.path().join("ffmpeg");
    fs_err::write(&ffmpeg, "#!/bin/sh\nexec sleep 30\n").unwrap();
    fs_err::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = dir.path().join("config.yaml");
    fs_err::write(
        &config,
        format!("media:\n  ffmpeg_path: {}\n  timeout_secs: 60\n", ffmpeg.display()),
    )
    .unwrap();
    let video = dir.path().join("talk.mp4");
    fs_err::write(&video, b"not really a video").unwrap();

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("transcript"))
        .current_dir(dir.path())
        .env("DEEPGRAM_API_KEY", "test-key")
        .arg("--config")
        .arg(&config)
        .args(["--quiet", "fetch", "--video-path"])
        .arg(&video)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let interrupt = |pid: u32| {
        std::process::Command::new("kill")
            .args(["-INT", &pid.to_string()])
            .status()
            .unwrap();
    };

    std::thread::sleep(Duration::from_millis(1500));
    interrupt(child.id());
    std::thread::sleep(Duration::from_millis(500));
    interrupt(child.id());

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            child.kill().unwrap();
            panic!("fetch kept running after a second interrupt");
        }
        std::thread::sleep(Duration::from_millis(100));
    };

    assert_eq!(status.code(), Some(130));
}

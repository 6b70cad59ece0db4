use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

use serial_test::serial;

/// Stand-in for yt-dlp: writes `<dir>/<last url segment>.mp4` and prints its path.
/// URLs containing "fail" exit non-zero.
const FAKE_YTDLP: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "2026.09.01"
  exit 0
fi
out=""
prev=""
url=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
  url="$arg"
done
case "$url" in
  *fail*) echo "ERROR: [youtube] $url: Video unavailable" >&2; exit 1 ;;
esac
dir=$(dirname "$out")
name=$(basename "$url")
echo "[download] Destination: $dir/$name.mp4"
printf 'video' > "$dir/$name.mp4"
echo "$dir/$name.mp4"
"#;

#[cfg(unix)]
fn install_fake_ytdlp(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("yt-dlp");
    fs::write(&path, FAKE_YTDLP).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Run the binary inside `cwd` with a clean credential environment
fn vidrelay(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_vidrelay"));
    cmd.current_dir(cwd).args(args);
    for key in [
        "STREAMTAPE_API_USERNAME",
        "STREAMTAPE_API_KEY",
        "STREAMTAPE_API_URL",
        "DOWNLOAD_DIR",
        "YTDLP_BIN",
        "FFMPEG_BIN",
        "FFMPEG_LOCATION",
    ] {
        cmd.env_remove(key);
    }
    cmd.envs(envs.iter().copied());
    cmd.output().expect("Failed to execute vidrelay")
}

fn combined_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// Test help commands work
#[test]
#[serial]
fn test_help_commands() {
    let temp_dir = TempDir::new().unwrap();
    let help_output = vidrelay(temp_dir.path(), &["--help"], &[]);

    assert!(help_output.status.success(), "Help command failed");

    let help_stdout = String::from_utf8_lossy(&help_output.stdout);
    for command in ["vidrelay", "run", "download", "upload", "clean", "check"] {
        assert!(
            help_stdout.contains(command),
            "Help should list {command}, got: {help_stdout}"
        );
    }
}

/// A missing URL list is a hard failure
#[test]
#[serial]
fn test_run_without_task_list_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = vidrelay(temp_dir.path(), &["run"], &[]);

    assert!(!output.status.success(), "Run should fail without youtube_urls.txt");
    assert!(combined_output(&output).contains("youtube_urls.txt"));
}

/// An empty list is not an error
#[test]
#[serial]
fn test_run_with_empty_task_list() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("youtube_urls.txt"), "\n# none yet\n").unwrap();

    let output = vidrelay(temp_dir.path(), &["run"], &[]);
    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("No video URLs found"));
}

/// Download step writes every good URL into the default staging directory
#[cfg(unix)]
#[test]
#[serial]
fn test_download_command_continues_past_failures() {
    let temp_dir = TempDir::new().unwrap();
    let ytdlp = install_fake_ytdlp(temp_dir.path());
    fs::write(
        temp_dir.path().join("youtube_urls.txt"),
        "https://example.com/watch/first\nhttps://example.com/watch/fail\nhttps://example.com/watch/second\n",
    )
    .unwrap();

    let output = vidrelay(
        temp_dir.path(),
        &["download"],
        &[("YTDLP_BIN", ytdlp.to_str().unwrap())],
    );
    let text = combined_output(&output);

    assert!(!output.status.success(), "One download failed, exit should be non-zero");
    assert!(text.contains("1 of 3 downloads failed"), "got: {text}");

    let staging = temp_dir.path().join("downloaded_videos");
    assert!(staging.join("first.mp4").exists());
    assert!(staging.join("second.mp4").exists());
    assert!(!staging.join("fail.mp4").exists());
}

/// Run fails fast without credentials, before downloading anything
#[cfg(unix)]
#[test]
#[serial]
fn test_run_requires_credentials() {
    let temp_dir = TempDir::new().unwrap();
    let ytdlp = install_fake_ytdlp(temp_dir.path());
    fs::write(
        temp_dir.path().join("youtube_urls.txt"),
        "https://example.com/watch/first\n",
    )
    .unwrap();

    let output = vidrelay(
        temp_dir.path(),
        &["run"],
        &[("YTDLP_BIN", ytdlp.to_str().unwrap())],
    );

    assert!(!output.status.success());
    assert!(combined_output(&output).contains("credentials"));
    assert!(!temp_dir.path().join("downloaded_videos").exists());
}

/// An unreachable upload API fails each task and keeps the staged files
#[cfg(unix)]
#[test]
#[serial]
fn test_run_with_unreachable_api_keeps_files() {
    let temp_dir = TempDir::new().unwrap();
    let ytdlp = install_fake_ytdlp(temp_dir.path());
    fs::write(
        temp_dir.path().join("urls.txt"),
        "https://example.com/watch/one\nhttps://example.com/watch/two\n",
    )
    .unwrap();
    let report = temp_dir.path().join("report.json");

    let output = vidrelay(
        temp_dir.path(),
        &[
            "run",
            "--urls",
            "urls.txt",
            "--dir",
            "staging",
            "--report",
            report.to_str().unwrap(),
        ],
        &[
            ("YTDLP_BIN", ytdlp.to_str().unwrap()),
            ("STREAMTAPE_API_USERNAME", "user"),
            ("STREAMTAPE_API_KEY", "secret"),
            ("STREAMTAPE_API_URL", "http://127.0.0.1:9"),
        ],
    );
    let text = combined_output(&output);

    assert!(!output.status.success());
    assert!(text.contains("2 of 2 videos failed"), "got: {text}");
    assert!(temp_dir.path().join("staging/one.mp4").exists());
    assert!(temp_dir.path().join("staging/two.mp4").exists());

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["failed"], 2);
    assert_eq!(json["tasks"][0]["status"]["stage"], "upload");
    assert!(json["tasks"][0]["local_path"]
        .as_str()
        .unwrap()
        .ends_with("one.mp4"));
}

/// Clean removes staged files, or prunes to --keep
#[test]
#[serial]
fn test_clean_command() {
    let temp_dir = TempDir::new().unwrap();
    let staging = temp_dir.path().join("downloaded_videos");
    fs::create_dir(&staging).unwrap();
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        fs::write(staging.join(name), "").unwrap();
    }

    let output = vidrelay(temp_dir.path(), &["clean", "--keep", "1"], &[]);
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(fs::read_dir(&staging).unwrap().count(), 1);

    let output = vidrelay(temp_dir.path(), &["clean"], &[]);
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);

    let output = vidrelay(temp_dir.path(), &["clean", "--dir", "/non/existent/path"], &[]);
    assert!(!output.status.success(), "Clean should fail with invalid path");
}

/// Upload of a missing staging directory fails
#[test]
#[serial]
fn test_upload_invalid_directory() {
    let temp_dir = TempDir::new().unwrap();
    let output = vidrelay(
        temp_dir.path(),
        &["upload", "--dir", "/non/existent/path"],
        &[("STREAMTAPE_API_USERNAME", "user"), ("STREAMTAPE_API_KEY", "secret")],
    );

    assert!(!output.status.success(), "Upload should fail with invalid path");
}

/// Check passes with yt-dlp present even when ffmpeg is missing
#[cfg(unix)]
#[test]
#[serial]
fn test_check_command() {
    let temp_dir = TempDir::new().unwrap();
    let ytdlp = install_fake_ytdlp(temp_dir.path());

    let output = vidrelay(
        temp_dir.path(),
        &["check"],
        &[
            ("YTDLP_BIN", ytdlp.to_str().unwrap()),
            ("FFMPEG_BIN", "/non/existent/ffmpeg"),
        ],
    );
    let text = combined_output(&output);
    assert!(output.status.success(), "{text}");
    assert!(text.contains("2026.09.01"));
    assert!(text.contains("ffmpeg not found"));

    let output = vidrelay(
        temp_dir.path(),
        &["check"],
        &[("YTDLP_BIN", "/non/existent/yt-dlp")],
    );
    assert!(!output.status.success(), "Check should fail without yt-dlp");
}

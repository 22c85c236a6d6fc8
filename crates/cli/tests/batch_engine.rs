//! Runs the `gtp` binary in batch mode against a shell-script engine.
#![cfg(unix)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Started as `sh gtp -model ... -config ...` from the workspace dir.
const FAKE_ENGINE: &str = r#"
echo "GTP ready, begin sending commands" >&2
while read -r id cmd rest; do
	case "$cmd" in
		genmove) printf '=%s Q16\n\n' "$id" ;;
		play) case "$rest" in
			*" A1") printf '?%s illegal move\n\n' "$id" ;;
			*) printf '=%s\n\n' "$id" ;;
		esac ;;
		*) printf '=%s\n\n' "$id" ;;
	esac
done
"#;

fn gtp_binary() -> PathBuf {
	let mut path = std::env::current_exe().unwrap();
	path.pop();
	path.pop();
	path.push("gtp");
	path
}

fn workspace_with_engine() -> TempDir {
	let dir = TempDir::new().unwrap();
	std::fs::write(dir.path().join("gtp"), FAKE_ENGINE).unwrap();
	dir
}

fn run_gtp_batch(workspace: &Path, katago: &str, lines: &[&str]) -> (bool, String, String) {
	let mut child = Command::new(gtp_binary())
		.current_dir(workspace)
		.args(["batch", "--katago", katago, "--command-timeout-ms", "10000"])
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.expect("failed to start gtp batch");

	{
		let stdin = child.stdin.as_mut().expect("stdin unavailable");
		for line in lines {
			writeln!(stdin, "{line}").expect("failed to write batch request");
		}
	}

	let output = child.wait_with_output().expect("failed waiting for gtp batch");
	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	(output.status.success(), stdout, stderr)
}

fn parse_ndjson(stdout: &str) -> Vec<serde_json::Value> {
	stdout
		.lines()
		.filter(|line| !line.trim().is_empty())
		.map(|line| serde_json::from_str::<serde_json::Value>(line).expect("line should be valid JSON"))
		.collect()
}

#[test]
fn batch_plays_a_game_against_engine_process() {
	let workspace = workspace_with_engine();
	let (success, stdout, stderr) = run_gtp_batch(
		workspace.path(),
		"/bin/sh",
		&[
			r#"{"requestId":"1","op":"start","gameId":"g1"}"#,
			r#"{"requestId":"2","op":"move","gameId":"g1","x":3,"y":3}"#,
			r#"{"requestId":"3","op":"move","gameId":"g1","x":0,"y":0}"#,
			r#"{"requestId":"4","op":"close","gameId":"g1"}"#,
			r#"{"requestId":"5","op":"quit"}"#,
		],
	);

	assert!(success, "batch run failed: {stderr}");
	let lines = parse_ndjson(&stdout);
	assert_eq!(lines.len(), 5, "unexpected output: {stdout}");

	assert_eq!(lines[0]["ok"], true);
	assert_eq!(lines[0]["data"]["gameId"], "g1");

	assert_eq!(lines[1]["requestId"], "2");
	assert_eq!(lines[1]["data"]["ai"]["x"], 15);
	assert_eq!(lines[1]["data"]["ai"]["y"], 15);

	assert_eq!(lines[2]["ok"], false);
	assert_eq!(lines[2]["error"]["code"], "ENGINE_REJECTED");

	assert_eq!(lines[3]["data"]["removed"], true);
	assert_eq!(lines[4]["op"], "quit");
}

#[test]
fn batch_reports_missing_engine_per_request() {
	let workspace = TempDir::new().unwrap();
	let (success, stdout, stderr) = run_gtp_batch(
		workspace.path(),
		"/nonexistent/katago",
		&[
			r#"{"op":"start","gameId":"g1"}"#,
			r#"{"op":"genmove","gameId":"g1","color":"white"}"#,
		],
	);

	assert!(success, "batch should survive engine failures: {stderr}");
	let lines = parse_ndjson(&stdout);
	assert_eq!(lines.len(), 2);
	for line in &lines {
		assert_eq!(line["ok"], false);
		assert_eq!(line["error"]["code"], "ENGINE_UNAVAILABLE");
	}
}

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use tempfile::tempdir;

pub fn run_gs_source(src: &str) -> String {
    let output = run_gs_source_raw(src);
    if !output.status.success() {
        panic!(
            "command failed: {}\nstdout:\n{}\nstderr:\n{}",
            output.status, output.stdout, output.stderr
        );
    }
    output.stdout
}

pub fn run_gs_source_expect_err(src: &str) -> CommandOutput {
    let output = run_gs_source_raw(src);
    assert!(
        !output.status.success(),
        "expected command to fail but it succeeded\nstdout:\n{}",
        output.stdout
    );
    output
}

pub fn run_gs_source_raw(src: &str) -> CommandOutput {
    let dir = tempdir().expect("create temp dir");
    let script_path = dir.path().join("script.gs");
    fs::write(&script_path, src).expect("write script");
    let mut command = gato(dir.path());
    command.arg(&script_path);
    execute(command, None)
}

pub fn run_gato_args(args: &[&str]) -> CommandOutput {
    let dir = tempdir().expect("create temp dir");
    let mut command = gato(dir.path());
    command.args(args);
    execute(command, None)
}

pub fn run_repl(input: &str) -> CommandOutput {
    let dir = tempdir().expect("create temp dir");
    execute(gato(dir.path()), Some(input))
}

/// `gato` running in `cwd` with logging quiet and no inherited GATO_* settings.
pub fn gato(cwd: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_gato"));
    command
        .current_dir(cwd)
        .env("GATO_TRACE", "0")
        .env("GATO_LOG", "off")
        .env_remove("GATO_MAX_DEPTH")
        .env_remove("GATO_TASK_THREADS");
    command
}

fn execute(mut command: Command, stdin: Option<&str>) -> CommandOutput {
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().expect("failed to run gato");
    if let Some(input) = stdin {
        let mut pipe = child.stdin.take().expect("stdin piped");
        pipe.write_all(input.as_bytes()).expect("write stdin");
    }
    let output = child.wait_with_output().expect("wait for gato");
    CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        status: output.status,
    }
}

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

// src/system/executor.rs

//! Command line assembly and the final `exec` into the terminal.

use crate::models::ResolvedTerminal;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command as StdCommand;
use thiserror::Error;

/// Errors launching the terminal.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The command line has no program.
    #[error("No command specified to run.")]
    EmptyCommand,
    /// The exec call itself failed.
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
}

/// What the caller wants the terminal to do, as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Application ID to request.
    pub app_id: Option<String>,
    /// Window title to request.
    pub title: Option<String>,
    /// Working directory for the terminal.
    pub dir: Option<PathBuf>,
    /// Keep the terminal open after the command exits.
    pub hold: bool,
    /// Program and arguments to run inside the terminal. Empty launches a bare terminal.
    pub command: Vec<String>,
}

/// Builds the full argument vector: the terminal's `Exec`, the requested optional
/// features the terminal supports, then the run-program argument and the command.
pub fn build_command_line(terminal: &ResolvedTerminal, request: &LaunchRequest) -> Vec<String> {
    let mut argv = terminal.exec.clone();
    let args = &terminal.args;

    let dir = request.dir.as_ref().map(|d| d.to_string_lossy().into_owned());
    for (feature, template, value) in [
        ("app-id", &args.app_id, &request.app_id),
        ("title", &args.title, &request.title),
        ("dir", &args.dir, &dir),
    ] {
        let Some(value) = value else { continue };
        if template.is_empty() {
            log::debug!("'{}' does not support --{}, skipping.", terminal.entry_id, feature);
            continue;
        }
        push_templated(&mut argv, template, value);
    }

    if request.hold {
        if args.hold.is_empty() {
            log::debug!("'{}' does not support --hold, skipping.", terminal.entry_id);
        } else {
            argv.push(args.hold.clone());
        }
    }

    if !request.command.is_empty() {
        if !args.exec.is_empty() {
            argv.push(args.exec.clone());
        }
        argv.extend(request.command.iter().cloned());
    }

    argv
}

/// `--class=` + `foo` gives `--class=foo`; `--title` + `foo` gives two arguments.
fn push_templated(argv: &mut Vec<String>, template: &str, value: &str) {
    if template.ends_with('=') {
        argv.push(format!("{}{}", template, value));
    } else {
        argv.push(template.to_string());
        argv.push(value.to_string());
    }
}

/// Replaces the current process with `argv`. Only returns on failure.
pub fn exec_terminal(argv: &[String], dir: Option<&PathBuf>) -> ExecutionError {
    let Some((program, args)) = argv.split_first() else {
        return ExecutionError::EmptyCommand;
    };

    let mut command = StdCommand::new(program);
    command.args(args);
    if let Some(dir) = dir {
        command.current_dir(dir);
    }

    log::debug!("Executing: {:?}", argv);
    let error = command.exec();
    ExecutionError::CommandFailed(argv.join(" "), error)
}

// src/cli.rs

//! Command-line arguments of the `xdg-terminal-exec` binary.

use crate::system::executor::LaunchRequest;
use clap::Parser;
use std::path::PathBuf;

/// xdg-terminal-exec: run a command in the user's preferred terminal emulator.
///
/// The terminal is picked from `*xdg-terminals.list` preference files and the
/// desktop entries in the `TerminalEmulator` category. Without a command, the
/// terminal is opened on its own.
///
/// Examples:
/// - `xdg-terminal-exec`
/// - `xdg-terminal-exec --title=Logs -- journalctl -f`
/// - `xdg-terminal-exec --print-id --print-path`
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application ID (window class) to request from the terminal.
    #[arg(long, value_name = "ID")]
    pub app_id: Option<String>,

    /// Window title to request from the terminal.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Working directory for the terminal and the command.
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Keep the terminal open after the command exits.
    #[arg(long)]
    pub hold: bool,

    /// Print the final command line, one argument per SEP (default newline), and exit.
    #[arg(long, value_name = "SEP", num_args = 0..=1, require_equals = true, default_missing_value = "\n")]
    pub print_cmd: Option<String>,

    /// Print the chosen entry ID (with `:action` if any) and exit.
    #[arg(long)]
    pub print_id: bool,

    /// Print the path of the chosen desktop entry and exit.
    #[arg(long)]
    pub print_path: bool,

    /// Command to run inside the terminal, with its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    /// True when the invocation only reports and never launches.
    pub fn print_only(&self) -> bool {
        self.print_cmd.is_some() || self.print_id || self.print_path
    }

    /// The launch options as the executor consumes them.
    pub fn launch_request(&self) -> LaunchRequest {
        LaunchRequest {
            app_id: self.app_id.clone(),
            title: self.title.clone(),
            dir: self.dir.clone(),
            hold: self.hold,
            command: self.command.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_then_command() {
        let cli = Cli::try_parse_from([
            "xdg-terminal-exec",
            "--title=Logs",
            "--hold",
            "journalctl",
            "-f",
            "--title=inner",
        ])
        .unwrap();
        assert_eq!(cli.title.as_deref(), Some("Logs"));
        assert!(cli.hold);
        assert_eq!(cli.command, vec!["journalctl", "-f", "--title=inner"]);
        assert!(!cli.print_only());
    }

    #[test]
    fn test_print_cmd_separator() {
        let cli = Cli::try_parse_from(["xdg-terminal-exec", "--print-cmd"]).unwrap();
        assert_eq!(cli.print_cmd.as_deref(), Some("\n"));
        assert!(cli.print_only());

        let cli = Cli::try_parse_from(["xdg-terminal-exec", "--print-cmd= ", "ls"]).unwrap();
        assert_eq!(cli.print_cmd.as_deref(), Some(" "));
        assert_eq!(cli.command, vec!["ls"]);
    }

    #[test]
    fn test_double_dash_command() {
        let cli = Cli::try_parse_from(["xdg-terminal-exec", "--dir=/tmp", "--", "--weird"]).unwrap();
        let request = cli.launch_request();
        assert_eq!(request.dir, Some(PathBuf::from("/tmp")));
        assert_eq!(request.command, vec!["--weird"]);
    }
}

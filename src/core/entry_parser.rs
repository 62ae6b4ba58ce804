//! # Entry Parser
//!
//! Validates one desktop entry file as a terminal candidate and extracts its command
//! template and terminal argument templates.
//!
//! The file is read line by line while tracking which group we are in:
//!
//! | group                         | keys checked                        | `Exec` read           |
//! |-------------------------------|-------------------------------------|-----------------------|
//! | before `[Desktop Entry]`      | none                                | no                    |
//! | `[Desktop Entry]`             | all recognized keys                 | if no action requested|
//! | `[Desktop Action <requested>]`| `Exec` only                         | yes                   |
//! | any other group               | none                                | no                    |
//!
//! Checks run in file order and the first failing one rejects the candidate.

use crate::{
    constants::TERMINAL_CATEGORY,
    core::exec_tokenizer::{self, TokenizeError},
    system::lookup::ExecutableLookup,
};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Why a candidate entry was discarded. Every variant is recoverable: the resolver
/// logs it and moves on to the next candidate.
#[derive(Error, Debug)]
pub enum Rejection {
    /// The entry file could not be read.
    #[error("Could not read entry: {0}")]
    Io(#[from] std::io::Error),
    /// The entry does not list the `TerminalEmulator` category.
    #[error("Entry is not in the TerminalEmulator category.")]
    NotTerminal,
    /// The requested action is missing from `Actions`.
    #[error("Action '{0}' is not declared in Actions.")]
    ActionNotDeclared(String),
    /// None of the current desktops is listed in `OnlyShowIn`.
    #[error("Entry is not shown in the current desktop (OnlyShowIn).")]
    OnlyShowIn,
    /// A current desktop is listed in `NotShowIn`.
    #[error("Entry is hidden in the current desktop (NotShowIn).")]
    NotShowIn,
    /// The entry sets `Hidden=true`.
    #[error("Entry is marked Hidden.")]
    Hidden,
    /// The `TryExec` program is not installed.
    #[error("TryExec '{0}' is not executable.")]
    TryExecMissing(String),
    /// The `Exec` value is malformed.
    #[error("Invalid Exec: {0}")]
    Exec(#[from] TokenizeError),
    /// Nothing is left of `Exec` after removing field codes.
    #[error("Exec has no arguments left after field stripping.")]
    ExecEmpty,
    /// The first `Exec` token is not an executable.
    #[error("Exec program '{0}' is not executable.")]
    ExecNotFound(String),
    /// The group that should provide `Exec` has none.
    #[error("No Exec found for the requested scope.")]
    NoExec,
    /// Strict mode and the entry declares no run-program argument.
    #[error("Entry defines no run-program argument (strict execarg mode).")]
    NoExecArg,
}

/// Terminal argument templates as declared by the entry. `None` means "key absent",
/// which matters for the run-program argument where an empty value is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryArgs {
    /// Run-program argument (`TerminalArgExec`).
    pub exec: Option<String>,
    /// Deprecated `ExecArg` spelling, only captured in compatibility mode.
    pub legacy_exec: Option<String>,
    /// App-id template (`TerminalArgAppId`).
    pub app_id: Option<String>,
    /// Title template (`TerminalArgTitle`).
    pub title: Option<String>,
    /// Working directory template (`TerminalArgDir`).
    pub dir: Option<String>,
    /// Hold flag (`TerminalArgHold`).
    pub hold: Option<String>,
}

/// A candidate entry that passed every check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    /// Tokenized `Exec` of the main group or the requested action.
    pub exec: Vec<String>,
    /// Whether `Categories` listed `TerminalEmulator`.
    pub is_terminal: bool,
    /// Terminal argument templates found in the main group.
    pub args: EntryArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    BeforeMain,
    Main,
    TargetAction,
    Other,
}

/// Parses desktop entries against one environment.
#[derive(Debug)]
pub struct EntryParser<'a> {
    lookup: &'a ExecutableLookup,
    desktops: &'a [String],
    compat: bool,
}

impl<'a> EntryParser<'a> {
    /// Creates a parser. `compat` enables the deprecated `ExecArg` key.
    pub fn new(lookup: &'a ExecutableLookup, desktops: &'a [String], compat: bool) -> Self {
        Self {
            lookup,
            desktops,
            compat,
        }
    }

    /// Reads and validates the entry at `path`.
    ///
    /// # Arguments
    /// * `action` - Use the `Exec` of `[Desktop Action <action>]` instead of the main one.
    /// * `filter_desktops` - Apply `OnlyShowIn`/`NotShowIn` (fallback candidates only).
    pub fn parse_file(
        &self,
        path: &Path,
        action: Option<&str>,
        filter_desktops: bool,
    ) -> Result<ParsedEntry, Rejection> {
        let content = fs::read_to_string(path)?;
        self.parse_str(&content, action, filter_desktops)
    }

    /// Same as [`EntryParser::parse_file`] on already loaded content.
    pub fn parse_str(
        &self,
        content: &str,
        action: Option<&str>,
        filter_desktops: bool,
    ) -> Result<ParsedEntry, Rejection> {
        let mut evaluation = Evaluation::new(self, action, filter_desktops);

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                if !evaluation.enter_group(header) {
                    break;
                }
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                evaluation.check_key(key.trim_end(), value.trim_start())?;
            }
        }

        evaluation.finish()
    }
}

/// Per-candidate state, created fresh for every parse.
struct Evaluation<'p, 'a> {
    parser: &'p EntryParser<'a>,
    action: Option<&'p str>,
    filter_desktops: bool,
    group: Group,
    main_seen: bool,
    target_seen: bool,
    is_terminal: bool,
    action_declared: bool,
    exec: Option<Vec<String>>,
    args: EntryArgs,
}

impl<'p, 'a> Evaluation<'p, 'a> {
    fn new(parser: &'p EntryParser<'a>, action: Option<&'p str>, filter_desktops: bool) -> Self {
        Self {
            parser,
            action,
            filter_desktops,
            group: Group::BeforeMain,
            main_seen: false,
            target_seen: false,
            is_terminal: false,
            action_declared: false,
            exec: None,
            args: EntryArgs::default(),
        }
    }

    /// Switches group. Returns false once every group that matters has been read:
    /// the main group, plus the requested action group if any, in either order.
    fn enter_group(&mut self, header: &str) -> bool {
        let leaving = self.group;
        self.group = if header == "Desktop Entry" {
            Group::Main
        } else if self.action.is_some()
            && header.strip_prefix("Desktop Action ") == self.action
        {
            Group::TargetAction
        } else {
            Group::Other
        };

        match leaving {
            Group::Main => self.main_seen = true,
            Group::TargetAction => self.target_seen = true,
            Group::BeforeMain | Group::Other => return true,
        }
        !(self.main_seen && (self.action.is_none() || self.target_seen))
    }

    fn check_key(&mut self, key: &str, value: &str) -> Result<(), Rejection> {
        match self.group {
            Group::Main => self.check_main_key(key, value),
            Group::TargetAction if key == "Exec" => self.read_exec(value),
            _ => Ok(()),
        }
    }

    fn check_main_key(&mut self, key: &str, value: &str) -> Result<(), Rejection> {
        match key {
            "Categories" => {
                if !split_list(value).any(|c| c == TERMINAL_CATEGORY) {
                    return Err(Rejection::NotTerminal);
                }
                self.is_terminal = true;
            }
            "Actions" => {
                if let Some(action) = self.action {
                    if !split_list(value).any(|a| a == action) {
                        return Err(Rejection::ActionNotDeclared(action.to_string()));
                    }
                    self.action_declared = true;
                }
            }
            "OnlyShowIn" if self.filter_desktops => {
                if !split_list(value).any(|d| self.parser.desktops.iter().any(|c| c == d)) {
                    return Err(Rejection::OnlyShowIn);
                }
            }
            "NotShowIn" if self.filter_desktops => {
                if split_list(value).any(|d| self.parser.desktops.iter().any(|c| c == d)) {
                    return Err(Rejection::NotShowIn);
                }
            }
            "Hidden" => {
                if value == "true" {
                    return Err(Rejection::Hidden);
                }
            }
            "TryExec" => {
                let program = exec_tokenizer::expand_escapes(value);
                if !self.parser.lookup.is_executable(&program) {
                    return Err(Rejection::TryExecMissing(program));
                }
            }
            "Exec" if self.action.is_none() => self.read_exec(value)?,
            _ => self.capture_terminal_arg(key, value),
        }
        Ok(())
    }

    fn capture_terminal_arg(&mut self, key: &str, value: &str) {
        let name = key.strip_prefix("X-").unwrap_or(key);
        let slot = match name {
            "TerminalArgExec" => &mut self.args.exec,
            "TerminalArgAppId" => &mut self.args.app_id,
            "TerminalArgTitle" => &mut self.args.title,
            "TerminalArgDir" => &mut self.args.dir,
            "TerminalArgHold" => &mut self.args.hold,
            "ExecArg" if self.parser.compat => &mut self.args.legacy_exec,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(exec_tokenizer::expand_escapes(value));
        }
    }

    fn read_exec(&mut self, value: &str) -> Result<(), Rejection> {
        if self.exec.is_some() {
            log::trace!("Ignoring repeated Exec key.");
            return Ok(());
        }
        let argv = exec_tokenizer::parse_exec(value)?;
        let program = argv.first().ok_or(Rejection::ExecEmpty)?;
        if !self.parser.lookup.is_executable(program) {
            return Err(Rejection::ExecNotFound(program.clone()));
        }
        self.exec = Some(argv);
        Ok(())
    }

    fn finish(self) -> Result<ParsedEntry, Rejection> {
        if !self.is_terminal {
            return Err(Rejection::NotTerminal);
        }
        if let Some(action) = self.action
            && !self.action_declared
        {
            return Err(Rejection::ActionNotDeclared(action.to_string()));
        }
        let exec = self.exec.ok_or(Rejection::NoExec)?;
        Ok(ParsedEntry {
            exec,
            is_terminal: self.is_terminal,
            args: self.args,
        })
    }
}

/// Items of a `;`-separated desktop entry list, empty items skipped.
fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(';').filter(|item| !item.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::lookup::install_fake_executable;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        _root: TempDir,
        lookup: ExecutableLookup,
    }

    fn fixture() -> Fixture {
        let root = tempdir().unwrap();
        let bin = root.path().join("bin");
        install_fake_executable(&bin, "myterm");
        install_fake_executable(&bin, "myterm-helper");
        let lookup = ExecutableLookup::new(Some(bin.into_os_string()), root.path().to_path_buf());
        Fixture { _root: root, lookup }
    }

    const BASIC: &str = "[Desktop Entry]\n\
        Type=Application\n\
        Name=My Term\n\
        Categories=System;TerminalEmulator;\n\
        Exec=myterm --login %f\n\
        X-TerminalArgExec=-e\n\
        X-TerminalArgAppId=--class=\n\
        TerminalArgTitle=--title\n\
        X-TerminalArgDir=--working-directory\n\
        X-TerminalArgHold=--hold\n";

    #[test]
    fn test_parses_main_group() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let entry = parser.parse_str(BASIC, None, false).unwrap();
        assert_eq!(entry.exec, vec!["myterm", "--login"]);
        assert!(entry.is_terminal);
        assert_eq!(entry.args.exec.as_deref(), Some("-e"));
        assert_eq!(entry.args.app_id.as_deref(), Some("--class="));
        assert_eq!(entry.args.title.as_deref(), Some("--title"));
        assert_eq!(entry.args.dir.as_deref(), Some("--working-directory"));
        assert_eq!(entry.args.hold.as_deref(), Some("--hold"));
    }

    #[test]
    fn test_requires_terminal_category() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let missing = "[Desktop Entry]\nExec=myterm\n";
        assert!(matches!(parser.parse_str(missing, None, false), Err(Rejection::NotTerminal)));
        let other = "[Desktop Entry]\nCategories=Utility;\nExec=myterm\n";
        assert!(matches!(parser.parse_str(other, None, false), Err(Rejection::NotTerminal)));
    }

    #[test]
    fn test_action_exec_replaces_main_exec() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let content = "[Desktop Entry]\n\
            Categories=TerminalEmulator;\n\
            Actions=new-window;server;\n\
            Exec=myterm\n\
            \n\
            [Desktop Action new-window]\n\
            Exec=myterm --new\n\
            \n\
            [Desktop Action server]\n\
            Exec=myterm-helper --server\n";

        let entry = parser.parse_str(content, Some("server"), false).unwrap();
        assert_eq!(entry.exec, vec!["myterm-helper", "--server"]);

        let main = parser.parse_str(content, None, false).unwrap();
        assert_eq!(main.exec, vec!["myterm"]);

        assert!(matches!(
            parser.parse_str(content, Some("missing"), false),
            Err(Rejection::ActionNotDeclared(a)) if a == "missing"
        ));
    }

    #[test]
    fn test_action_group_before_main_group() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let content = "[Desktop Action server]\n\
            Exec=myterm-helper --server\n\
            \n\
            [Desktop Entry]\n\
            Categories=TerminalEmulator;\n\
            Actions=server;\n\
            Exec=myterm\n";

        let entry = parser.parse_str(content, Some("server"), false).unwrap();
        assert_eq!(entry.exec, vec!["myterm-helper", "--server"]);
        assert!(entry.is_terminal);
    }

    #[test]
    fn test_declared_action_without_group_has_no_exec() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let content = "[Desktop Entry]\nCategories=TerminalEmulator;\nActions=ghost;\nExec=myterm\n";
        assert!(matches!(parser.parse_str(content, Some("ghost"), false), Err(Rejection::NoExec)));
        let undeclared = "[Desktop Entry]\nCategories=TerminalEmulator;\nExec=myterm\n[Desktop Action ghost]\nExec=myterm\n";
        assert!(matches!(
            parser.parse_str(undeclared, Some("ghost"), false),
            Err(Rejection::ActionNotDeclared(_))
        ));
    }

    #[test]
    fn test_desktop_filters_only_for_fallback() {
        let f = fixture();
        let desktops = vec!["sway".to_string(), "wlroots".to_string()];
        let parser = EntryParser::new(&f.lookup, &desktops, true);

        let only_gnome = format!("{}OnlyShowIn=GNOME;\n", BASIC);
        assert!(parser.parse_str(&only_gnome, None, false).is_ok());
        assert!(matches!(parser.parse_str(&only_gnome, None, true), Err(Rejection::OnlyShowIn)));

        let only_wlroots = format!("{}OnlyShowIn=GNOME;wlroots;\n", BASIC);
        assert!(parser.parse_str(&only_wlroots, None, true).is_ok());

        let not_sway = format!("{}NotShowIn=sway;\n", BASIC);
        assert!(parser.parse_str(&not_sway, None, false).is_ok());
        assert!(matches!(parser.parse_str(&not_sway, None, true), Err(Rejection::NotShowIn)));
    }

    #[test]
    fn test_hidden_and_try_exec() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let hidden = format!("{}Hidden=true\n", BASIC);
        assert!(matches!(parser.parse_str(&hidden, None, false), Err(Rejection::Hidden)));
        let visible = format!("{}Hidden=false\n", BASIC);
        assert!(parser.parse_str(&visible, None, false).is_ok());

        let try_missing = format!("{}TryExec=not-installed\n", BASIC);
        assert!(matches!(
            parser.parse_str(&try_missing, None, false),
            Err(Rejection::TryExecMissing(p)) if p == "not-installed"
        ));
        let try_ok = format!("{}TryExec=myterm-helper\n", BASIC);
        assert!(parser.parse_str(&try_ok, None, false).is_ok());
    }

    #[test]
    fn test_exec_must_resolve_and_tokenize() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let head = "[Desktop Entry]\nCategories=TerminalEmulator;\n";

        let missing = format!("{}Exec=other-term\n", head);
        assert!(matches!(parser.parse_str(&missing, None, false), Err(Rejection::ExecNotFound(_))));

        let shell = format!("{}Exec=myterm $SHELL\n", head);
        assert!(matches!(parser.parse_str(&shell, None, false), Err(Rejection::Exec(_))));

        let only_fields = format!("{}Exec=%f\n", head);
        assert!(matches!(parser.parse_str(&only_fields, None, false), Err(Rejection::ExecEmpty)));

        let no_exec = head.to_string();
        assert!(matches!(parser.parse_str(&no_exec, None, false), Err(Rejection::NoExec)));
    }

    #[test]
    fn test_exec_outside_readable_groups_is_ignored() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let content = "Exec=myterm --before\n\
            [Other Group]\n\
            Exec=myterm --other\n\
            [Desktop Entry]\n\
            Categories=TerminalEmulator;\n\
            Exec=myterm\n";
        assert_eq!(parser.parse_str(content, None, false).unwrap().exec, vec!["myterm"]);
    }

    #[test]
    fn test_legacy_exec_arg_only_in_compat() {
        let f = fixture();
        let content = "[Desktop Entry]\nCategories=TerminalEmulator;\nExec=myterm\nX-ExecArg=-x\n";

        let compat = EntryParser::new(&f.lookup, &[], true);
        let entry = compat.parse_str(content, None, false).unwrap();
        assert_eq!(entry.args.legacy_exec.as_deref(), Some("-x"));
        assert_eq!(entry.args.exec, None);

        let strict = EntryParser::new(&f.lookup, &[], false);
        assert_eq!(strict.parse_str(content, None, false).unwrap().args.legacy_exec, None);
    }

    #[test]
    fn test_terminal_args_are_escape_expanded() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let content = "[Desktop Entry]\nCategories=TerminalEmulator;\nExec=myterm\nTerminalArgExec=\nX-TerminalArgTitle=--title\\s\n";
        let entry = parser.parse_str(content, None, false).unwrap();
        assert_eq!(entry.args.exec.as_deref(), Some(""));
        assert_eq!(entry.args.title.as_deref(), Some("--title "));
    }

    #[test]
    fn test_parse_file_reports_io_errors() {
        let f = fixture();
        let parser = EntryParser::new(&f.lookup, &[], true);
        let result = parser.parse_file(Path::new("/nonexistent/entry.desktop"), None, false);
        assert!(matches!(result, Err(Rejection::Io(_))));
    }
}

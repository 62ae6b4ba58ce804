//! # Config Loader
//!
//! Reads the `*xdg-terminals.list` preference files, most specific first, and folds
//! them into one ordered list of preferred entries plus the global [`Directives`].
//!
//! Every line is one of:
//! - a directive (`/enable_cache`, `/disable_cache`, `/execarg_compat`,
//!   `/execarg_strict`, `/execarg_default:<entry-id>:<argument>`),
//! - a fallback override (`+<entry-id>` or `-<entry-id>`),
//! - a preferred entry (`<entry-id>` or `<entry-id>:<action>`).
//!
//! Bad lines are reported and skipped; loading never fails.

use crate::models::{Directives, PreferredEntry};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref ENTRY_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid regex");
    static ref ACTION_RE: Regex = Regex::new(r"^[A-Za-z0-9-]+$").expect("valid regex");
}

/// Returns true if `id` is a syntactically valid desktop entry ID.
pub fn is_valid_entry_id(id: &str) -> bool {
    ENTRY_ID_RE.is_match(id)
}

/// Returns true if `action` is a syntactically valid action name.
pub fn is_valid_action(action: &str) -> bool {
    ACTION_RE.is_match(action)
}

/// Result of loading all preference files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedConfig {
    /// Global directives, with environment toggles already applied.
    pub directives: Directives,
    /// Explicitly preferred entries, deduplicated, in order of appearance.
    pub preferred: Vec<PreferredEntry>,
}

/// Accumulates preference files into a [`LoadedConfig`].
#[derive(Debug, Default)]
pub struct ConfigLoader {
    directives: Directives,
    preferred: Vec<PreferredEntry>,
    seen: HashSet<PreferredEntry>,
}

impl ConfigLoader {
    /// Creates a loader whose one-shot directives are already decided by the
    /// environment toggles, if given.
    pub fn new(cache_override: Option<bool>, compat_override: Option<bool>) -> Self {
        Self {
            directives: Directives {
                cache_enabled: cache_override,
                execarg_compat: compat_override,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Loads every file in `files` (most specific first). Missing files are skipped.
    pub fn load_files(mut self, files: &[PathBuf]) -> LoadedConfig {
        for path in files {
            match fs::read_to_string(path) {
                Ok(content) => {
                    log::debug!("Reading preference list '{}'", path.display());
                    self.load_str(&content, path);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    log::trace!("No preference list at '{}'", path.display());
                }
                Err(e) => {
                    log::warn!("Skipping unreadable preference list '{}': {}", path.display(), e);
                }
            }
        }
        self.finish()
    }

    /// Applies the content of one preference file. `origin` is only used in diagnostics.
    pub fn load_str(&mut self, content: &str, origin: &Path) {
        for (number, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            self.apply_line(line, origin, number + 1);
        }
    }

    /// Consumes the loader and returns everything loaded so far.
    pub fn finish(self) -> LoadedConfig {
        LoadedConfig {
            directives: self.directives,
            preferred: self.preferred,
        }
    }

    fn apply_line(&mut self, line: &str, origin: &Path, number: usize) {
        let at = || format!("{}:{}", origin.display(), number);

        if let Some(directive) = line.strip_prefix('/') {
            self.apply_directive(directive, &at());
        } else if let Some(id) = line.strip_prefix('+') {
            self.apply_fallback_override(id, true, &at());
        } else if let Some(id) = line.strip_prefix('-') {
            self.apply_fallback_override(id, false, &at());
        } else {
            self.add_preferred(line, &at());
        }
    }

    fn apply_directive(&mut self, directive: &str, at: &str) {
        match directive {
            "enable_cache" => set_once(&mut self.directives.cache_enabled, true, "cache", at),
            "disable_cache" => set_once(&mut self.directives.cache_enabled, false, "cache", at),
            "execarg_compat" => {
                set_once(&mut self.directives.execarg_compat, true, "execarg mode", at);
            }
            "execarg_strict" => {
                set_once(&mut self.directives.execarg_compat, false, "execarg mode", at);
            }
            _ => match directive.strip_prefix("execarg_default:") {
                Some(rest) => self.add_execarg_default(rest, at),
                None => log::warn!("{}: unknown directive '/{}' ignored.", at, directive),
            },
        }
    }

    fn add_execarg_default(&mut self, rest: &str, at: &str) {
        if !self.directives.execarg_compat() {
            log::warn!("{}: '/execarg_default' ignored outside of compat mode.", at);
            return;
        }
        let Some((id, arg)) = rest.split_once(':') else {
            log::warn!("{}: '/execarg_default' needs '<entry-id>:<argument>'.", at);
            return;
        };
        if !is_valid_entry_id(id) {
            log::warn!("{}: invalid entry ID '{}' in '/execarg_default'.", at, id);
            return;
        }
        if self.directives.execarg_defaults.contains_key(id) {
            log::debug!("{}: execarg default for '{}' already defined.", at, id);
            return;
        }
        self.directives
            .execarg_defaults
            .insert(id.to_string(), arg.to_string());
    }

    fn apply_fallback_override(&mut self, id: &str, include: bool, at: &str) {
        if !is_valid_entry_id(id) {
            log::warn!("{}: invalid entry ID '{}' ignored.", at, id);
            return;
        }
        let directives = &mut self.directives;
        if directives.fallback_included.contains(id) || directives.fallback_excluded.contains(id) {
            log::debug!("{}: fallback override for '{}' already set.", at, id);
            return;
        }
        if include {
            directives.fallback_included.insert(id.to_string());
        } else {
            directives.fallback_excluded.insert(id.to_string());
        }
    }

    fn add_preferred(&mut self, line: &str, at: &str) {
        let (id, action) = match line.split_once(':') {
            Some((id, action)) => (id, Some(action)),
            None => (line, None),
        };
        if !is_valid_entry_id(id) {
            log::warn!("{}: invalid entry ID '{}' ignored.", at, id);
            return;
        }
        if let Some(action) = action
            && !is_valid_action(action)
        {
            log::warn!("{}: invalid action '{}' for '{}' ignored.", at, action, id);
            return;
        }

        let entry = PreferredEntry::new(id, action.map(str::to_string));
        if self.seen.insert(entry.clone()) {
            self.preferred.push(entry);
        } else {
            log::trace!("{}: '{}' already listed.", at, entry);
        }
    }
}

/// Sets a one-shot directive unless an earlier source already decided it.
fn set_once(slot: &mut Option<bool>, value: bool, what: &str, at: &str) {
    match slot {
        None => *slot = Some(value),
        Some(existing) if *existing == value => {
            log::debug!("{}: repeated {} directive ignored.", at, what);
        }
        Some(_) => log::warn!("{}: {} directive already set, ignoring.", at, what),
    }
}

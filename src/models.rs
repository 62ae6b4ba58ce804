// src/models.rs

//! Data shared between the preference loader, the resolver and the cache.

use crate::constants::{DEFAULT_CACHE_ENABLED, DEFAULT_EXECARG_COMPAT};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

// --- PREFERENCE MODELS (what the `*.list` files produce) ---

/// A desktop entry explicitly requested by a preference list, optionally scoped to
/// one of its `[Desktop Action ...]` groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreferredEntry {
    /// Desktop entry ID, e.g. `foot.desktop`.
    pub entry_id: String,
    /// Requested `[Desktop Action ...]`, if any.
    pub action: Option<String>,
}

impl PreferredEntry {
    /// Creates an entry, optionally scoped to `action`.
    pub fn new(entry_id: impl Into<String>, action: Option<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            action,
        }
    }
}

impl fmt::Display for PreferredEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Some(action) => write!(f, "{}:{}", self.entry_id, action),
            None => f.write_str(&self.entry_id),
        }
    }
}

/// Global directives gathered from all preference lists.
///
/// `cache_enabled` and `execarg_compat` are one-shot: the first value set (by an
/// environment toggle or by the most specific file) wins and later attempts are
/// reported and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// `/enable_cache` or `/disable_cache`, if decided.
    pub cache_enabled: Option<bool>,
    /// `/execarg_compat` or `/execarg_strict`, if decided.
    pub execarg_compat: Option<bool>,
    /// Legacy run-argument per entry ID, only collected in compatibility mode.
    pub execarg_defaults: HashMap<String, String>,
    /// Entries removed from the fallback list (`-entry.desktop`).
    pub fallback_excluded: HashSet<String>,
    /// Entries protected from fallback exclusion (`+entry.desktop`).
    pub fallback_included: HashSet<String>,
}

impl Directives {
    /// Whether results are cached, defaults applied.
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled.unwrap_or(DEFAULT_CACHE_ENABLED)
    }

    /// Whether compatibility mode is on, defaults applied.
    pub fn execarg_compat(&self) -> bool {
        self.execarg_compat.unwrap_or(DEFAULT_EXECARG_COMPAT)
    }

    /// Whether a discovered entry may appear in the fallback list.
    /// An explicit include always beats an exclusion.
    pub fn allows_fallback(&self, entry_id: &str) -> bool {
        self.fallback_included.contains(entry_id) || !self.fallback_excluded.contains(entry_id)
    }
}

// --- RESOLUTION MODELS ---

/// Terminal-specific argument templates. An empty string means the terminal does not
/// support the feature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalArgs {
    /// Tells the terminal "run the following program" (e.g. `-e`).
    pub exec: String,
    /// Prefix for the application ID.
    pub app_id: String,
    /// Prefix for the window title.
    pub title: String,
    /// Prefix for the working directory.
    pub dir: String,
    /// Flag keeping the window open after the command exits.
    pub hold: String,
}

/// The terminal chosen for this invocation. Produced once, either freshly resolved
/// or read back from the cache, and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTerminal {
    /// Desktop entry ID of the chosen terminal.
    pub entry_id: String,
    /// The desktop entry file it was read from.
    pub path: PathBuf,
    /// Empty when the main `Exec` of the entry was used.
    pub action: String,
    /// Tokenized and field-stripped `Exec`. Never empty.
    pub exec: Vec<String>,
    /// Argument templates for the optional features.
    pub args: TerminalArgs,
}

impl ResolvedTerminal {
    /// Executable that starts the terminal (first `Exec` token).
    pub fn launcher(&self) -> Option<&str> {
        self.exec.first().map(String::as_str)
    }

    /// `entry-id` or `entry-id:action`, the form used by the preference lists.
    pub fn qualified_id(&self) -> String {
        if self.action.is_empty() {
            self.entry_id.clone()
        } else {
            format!("{}:{}", self.entry_id, self.action)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_beats_exclude() {
        let mut directives = Directives::default();
        directives.fallback_excluded.insert("foot.desktop".to_string());
        assert!(!directives.allows_fallback("foot.desktop"));

        directives.fallback_included.insert("foot.desktop".to_string());
        assert!(directives.allows_fallback("foot.desktop"));
        assert!(directives.allows_fallback("kitty.desktop"));
    }

    #[test]
    fn test_qualified_id() {
        let mut terminal = ResolvedTerminal {
            entry_id: "foot.desktop".to_string(),
            path: PathBuf::from("/usr/share/applications/foot.desktop"),
            action: String::new(),
            exec: vec!["foot".to_string()],
            args: TerminalArgs::default(),
        };
        assert_eq!(terminal.qualified_id(), "foot.desktop");
        terminal.action = "server".to_string();
        assert_eq!(terminal.qualified_id(), "foot.desktop:server");
        assert_eq!(
            PreferredEntry::new("foot.desktop", Some("server".to_string())).to_string(),
            "foot.desktop:server"
        );
    }
}

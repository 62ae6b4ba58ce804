// src/core/paths.rs

//! Base directories and the file locations derived from them.

use crate::{
    constants::{
        APPLICATIONS_SUBDIR, CACHE_FILENAME, CONFIG_DATA_SUBDIR, CONFIG_LIST_FILENAME,
        ENV_CACHE_ENABLED, ENV_EXECARG_COMPAT,
    },
    system::lookup::ExecutableLookup,
};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use thiserror::Error;

/// Errors locating the base directories.
#[derive(Error, Debug)]
pub enum PathError {
    /// No user config directory could be determined.
    #[error("Could not find the user config directory.")]
    ConfigDirNotFound,
    /// No user data directory could be determined.
    #[error("Could not find the user data directory.")]
    DataDirNotFound,
    /// No user cache directory could be determined.
    #[error("Could not find the user cache directory.")]
    CacheDirNotFound,
    /// The working directory is unavailable.
    #[error("Could not determine the current working directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Snapshot of every process input the resolution core depends on.
///
/// The core never reads the process environment on its own: the binary builds one of
/// these with [`Environment::from_process`] and tests build them by hand.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// `$XDG_CONFIG_HOME`.
    pub config_home: PathBuf,
    /// `$XDG_CONFIG_DIRS`, most preferred first.
    pub config_dirs: Vec<PathBuf>,
    /// `$XDG_DATA_HOME`.
    pub data_home: PathBuf,
    /// `$XDG_DATA_DIRS`, most preferred first.
    pub data_dirs: Vec<PathBuf>,
    /// `$XDG_CACHE_HOME`.
    pub cache_home: PathBuf,
    /// Raw `$XDG_CURRENT_DESKTOP` value (colon separated).
    pub current_desktop: String,
    /// Raw `$PATH` value.
    pub search_path: Option<OsString>,
    /// Working directory, for relative program paths.
    pub cwd: PathBuf,
    /// Pre-seeds the one-shot cache directive.
    pub cache_override: Option<bool>,
    /// Pre-seeds the one-shot compatibility directive.
    pub compat_override: Option<bool>,
}

impl Environment {
    /// Reads the XDG base directories, desktop, `PATH` and override toggles.
    pub fn from_process() -> Result<Self, PathError> {
        // `dirs` already honours XDG_CONFIG_HOME & co. and falls back to ~/.config etc.
        let config_home = dirs::config_dir().ok_or(PathError::ConfigDirNotFound)?;
        let data_home = dirs::data_dir().ok_or(PathError::DataDirNotFound)?;
        let cache_home = dirs::cache_dir().ok_or(PathError::CacheDirNotFound)?;

        let config_dirs = dir_list_from_env("XDG_CONFIG_DIRS", &["/etc/xdg"]);
        let data_dirs = dir_list_from_env("XDG_DATA_DIRS", &["/usr/local/share", "/usr/share"]);

        Ok(Self {
            config_home,
            config_dirs,
            data_home,
            data_dirs,
            cache_home,
            current_desktop: env::var("XDG_CURRENT_DESKTOP").unwrap_or_default(),
            search_path: env::var_os("PATH"),
            cwd: env::current_dir().map_err(PathError::CurrentDir)?,
            cache_override: toggle_from_env(ENV_CACHE_ENABLED),
            compat_override: toggle_from_env(ENV_EXECARG_COMPAT),
        })
    }

    /// The desktops named in `$XDG_CURRENT_DESKTOP`, in order.
    pub fn current_desktops(&self) -> Vec<String> {
        self.current_desktop
            .split(':')
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Preference list files, most specific first. Missing files are simply skipped
    /// by the loader, so every candidate location is listed.
    pub fn config_files(&self) -> Vec<PathBuf> {
        let desktops: Vec<String> = self
            .current_desktops()
            .iter()
            .map(|d| d.to_lowercase())
            .collect();

        let config_roots = std::iter::once(self.config_home.clone())
            .chain(self.config_dirs.iter().cloned());
        let data_roots = std::iter::once(&self.data_home)
            .chain(self.data_dirs.iter())
            .map(|dir| dir.join(CONFIG_DATA_SUBDIR));

        config_roots
            .chain(data_roots)
            .flat_map(|root| {
                desktops
                    .iter()
                    .map(|desktop| root.join(format!("{}-{}", desktop, CONFIG_LIST_FILENAME)))
                    .chain(std::iter::once(root.join(CONFIG_LIST_FILENAME)))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Desktop entry directories in ascending preference: system data dirs from the
    /// least preferred one up, then the user data dir last.
    pub fn entry_dirs(&self) -> Vec<PathBuf> {
        self.data_dirs
            .iter()
            .rev()
            .chain(std::iter::once(&self.data_home))
            .map(|dir| dir.join(APPLICATIONS_SUBDIR))
            .collect()
    }

    /// Location of the cache record.
    pub fn cache_file(&self) -> PathBuf {
        self.cache_home.join(CACHE_FILENAME)
    }

    /// An executable lookup bound to this `PATH` and working directory.
    pub fn lookup(&self) -> ExecutableLookup {
        ExecutableLookup::new(self.search_path.clone(), self.cwd.clone())
    }

    /// An environment rooted entirely inside `root`, for tests.
    #[cfg(test)]
    pub(crate) fn rooted(root: &std::path::Path) -> Self {
        Self {
            config_home: root.join("config"),
            config_dirs: vec![root.join("etc")],
            data_home: root.join("data"),
            data_dirs: vec![root.join("share")],
            cache_home: root.join("cache"),
            current_desktop: String::new(),
            search_path: Some(root.join("bin").into_os_string()),
            cwd: root.to_path_buf(),
            cache_override: None,
            compat_override: None,
        }
    }
}

/// Splits a colon separated directory list. Relative entries are ignored, as the
/// base directory specification requires; an unset or empty variable yields `defaults`.
fn dir_list_from_env(var: &str, defaults: &[&str]) -> Vec<PathBuf> {
    let dirs: Vec<PathBuf> = env::var_os(var)
        .map(|value| {
            env::split_paths(&value)
                .filter(|p| p.is_absolute())
                .collect()
        })
        .unwrap_or_default();

    if dirs.is_empty() {
        defaults.iter().map(PathBuf::from).collect()
    } else {
        dirs
    }
}

fn toggle_from_env(var: &str) -> Option<bool> {
    let value = env::var(var).ok()?;
    let parsed = parse_toggle(&value);
    if parsed.is_none() && !value.is_empty() {
        log::warn!("Ignoring {}='{}': expected a boolean value.", var, value);
    }
    parsed
}

/// Parses the boolean spellings accepted by the override toggles.
pub fn parse_toggle(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Renders a list of directories for user-facing messages.
pub fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_config_files_order() {
        let mut environment = Environment::rooted(Path::new("/r"));
        environment.current_desktop = "GNOME:ubuntu".to_string();

        let files = environment.config_files();
        let expected: Vec<PathBuf> = [
            "/r/config/gnome-xdg-terminals.list",
            "/r/config/ubuntu-xdg-terminals.list",
            "/r/config/xdg-terminals.list",
            "/r/etc/gnome-xdg-terminals.list",
            "/r/etc/ubuntu-xdg-terminals.list",
            "/r/etc/xdg-terminals.list",
            "/r/data/xdg-terminal-exec/gnome-xdg-terminals.list",
            "/r/data/xdg-terminal-exec/ubuntu-xdg-terminals.list",
            "/r/data/xdg-terminal-exec/xdg-terminals.list",
            "/r/share/xdg-terminal-exec/gnome-xdg-terminals.list",
            "/r/share/xdg-terminal-exec/ubuntu-xdg-terminals.list",
            "/r/share/xdg-terminal-exec/xdg-terminals.list",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(files, expected);
    }

    #[test]
    fn test_entry_dirs_ascending_preference() {
        let mut environment = Environment::rooted(Path::new("/r"));
        environment.data_dirs = vec![PathBuf::from("/usr/local/share"), PathBuf::from("/usr/share")];
        assert_eq!(
            environment.entry_dirs(),
            vec![
                PathBuf::from("/usr/share/applications"),
                PathBuf::from("/usr/local/share/applications"),
                PathBuf::from("/r/data/applications"),
            ]
        );
    }

    #[test]
    fn test_current_desktops_skips_empty_items() {
        let mut environment = Environment::default();
        environment.current_desktop = ":sway::wlroots:".to_string();
        assert_eq!(environment.current_desktops(), vec!["sway", "wlroots"]);
    }

    #[test]
    fn test_parse_toggle() {
        assert_eq!(parse_toggle("1"), Some(true));
        assert_eq!(parse_toggle(" Yes "), Some(true));
        assert_eq!(parse_toggle("off"), Some(false));
        assert_eq!(parse_toggle("maybe"), None);
        assert_eq!(parse_toggle(""), None);
    }
}

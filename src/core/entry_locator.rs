//! # Entry Locator
//!
//! Scans the `applications` directories for desktop entries and maps every entry ID
//! to the single file that defines it. Directories are scanned in ascending
//! preference, so a later directory shadows an earlier one.

use crate::{
    constants::DESKTOP_ENTRY_EXTENSION,
    core::config_loader::is_valid_entry_id,
    models::Directives,
};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Every discovered desktop entry plus the derived fallback order.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    paths: HashMap<String, PathBuf>,
    fallback: Vec<String>,
    searched_dirs: Vec<PathBuf>,
}

impl EntryIndex {
    /// Scans `dirs` (ascending preference) and builds the index.
    ///
    /// The fallback list holds every discovered ID that `directives` does not exclude,
    /// ordered by the preference of the directory providing it (most preferred first),
    /// then by file name.
    pub fn scan(dirs: &[PathBuf], directives: &Directives) -> Self {
        let mut paths = HashMap::new();
        let mut per_dir: Vec<Vec<String>> = Vec::with_capacity(dirs.len());

        for dir in dirs {
            let found = discover_entries(dir);
            log::debug!("Found {} desktop entries in '{}'", found.len(), dir.display());
            let mut ids = Vec::with_capacity(found.len());
            for (id, path) in found {
                if let Some(shadowed) = paths.insert(id.clone(), path) {
                    log::trace!("'{}' shadows '{}'", id, shadowed.display());
                }
                ids.push(id);
            }
            per_dir.push(ids);
        }

        let mut seen = HashSet::new();
        let fallback = per_dir
            .into_iter()
            .rev()
            .flatten()
            .filter(|id| seen.insert(id.clone()))
            .filter(|id| {
                let allowed = directives.allows_fallback(id);
                if !allowed {
                    log::debug!("'{}' excluded from fallback.", id);
                }
                allowed
            })
            .collect();

        Self {
            paths,
            fallback,
            searched_dirs: dirs.to_vec(),
        }
    }

    /// The file defining `entry_id`, if any directory provides it.
    pub fn path_of(&self, entry_id: &str) -> Option<&Path> {
        self.paths.get(entry_id).map(PathBuf::as_path)
    }

    /// Fallback candidates, most preferred first.
    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    /// Every directory that was scanned, in scan order.
    pub fn searched_dirs(&self) -> &[PathBuf] {
        &self.searched_dirs
    }

    /// Number of distinct entry IDs found.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True when no desktop entry was found at all.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Lists the desktop entries below one directory as `(entry-id, path)` pairs, sorted by
/// path. Files whose relative path has a component outside the entry ID character set
/// are ignored.
pub fn discover_entries(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                // A missing directory is the common case here, not worth a warning.
                log::trace!("Skipping during scan of '{}': {}", dir.display(), err);
                None
            }
        })
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(DESKTOP_ENTRY_EXTENSION) {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        match entry_id_from_relative(relative) {
            Some(id) => found.push((id, path.to_path_buf())),
            None => log::debug!("Ignoring '{}': unsafe file name.", path.display()),
        }
    }

    found
}

/// Builds an entry ID from a path relative to its search root: components are joined
/// with `-` (`kde/konsole.desktop` becomes `kde-konsole.desktop`).
pub fn entry_id_from_relative(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        let Component::Normal(part) = component else {
            return None;
        };
        let part = part.to_str()?;
        if !is_valid_entry_id(part) {
            return None;
        }
        parts.push(part);
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("-"))
    }
}

// src/system/lookup.rs

//! Executable lookup against a `PATH` snapshot.

use std::ffi::OsString;
use std::path::PathBuf;

/// Answers "can this program be executed?" against a fixed `PATH` snapshot.
///
/// Names containing a `/` are checked as paths (relative ones against `cwd`),
/// bare names are searched in `search_path`.
#[derive(Debug, Clone)]
pub struct ExecutableLookup {
    search_path: Option<OsString>,
    cwd: PathBuf,
}

impl ExecutableLookup {
    /// A lookup over `search_path` (a raw `$PATH`) relative to `cwd`.
    pub fn new(search_path: Option<OsString>, cwd: PathBuf) -> Self {
        Self { search_path, cwd }
    }

    /// Full path of `program`, if it resolves to an executable file.
    pub fn find(&self, program: &str) -> Option<PathBuf> {
        if program.is_empty() {
            return None;
        }
        match which::which_in(program, self.search_path.as_ref(), &self.cwd) {
            Ok(path) => Some(path),
            Err(e) => {
                log::trace!("'{}' is not executable: {}", program, e);
                None
            }
        }
    }

    /// Shorthand for `find(program).is_some()`.
    pub fn is_executable(&self, program: &str) -> bool {
        self.find(program).is_some()
    }
}

/// Test helper: creates an executable shell stub named `name` inside `dir`.
#[cfg(test)]
pub(crate) fn install_fake_executable(dir: &std::path::Path, name: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

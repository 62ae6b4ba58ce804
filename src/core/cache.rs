// src/core/cache.rs

//! Persists the last resolution, keyed by a hash of everything it depended on.

use crate::{
    constants::CACHE_FORMAT_VERSION,
    core::paths::Environment,
    models::{ResolvedTerminal, TerminalArgs},
    system::lookup::ExecutableLookup,
};
use log::debug;
use std::{
    fs,
    io::{self, ErrorKind, Write},
    os::unix::{ffi::OsStrExt, fs::PermissionsExt},
    path::{Path, PathBuf},
    thread,
    time::UNIX_EPOCH,
};
use thiserror::Error;
use walkdir::WalkDir;

const HASH_TRUNCATE_LENGTH: usize = 16; // 16 bytes = 32 hex characters

/// Separates the `Exec` tokens inside the record body.
const UNIT_SEPARATOR: char = '\u{1f}';
/// Closes the record. Everything before it on the last line is body.
const RECORD_TERMINATOR: &str = "\u{1e}end";
/// hash, launcher, path, entry ID, action, exec arg, app-id, title, dir, hold.
const HEADER_LINES: usize = 10;
/// Upper bound on lines read before giving up on a record.
const MAX_RECORD_LINES: usize = 1024;

/// Errors raised while encoding, decoding or persisting a cache record.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),
    /// The temporary file could not replace the cache file.
    #[error("Could not move cache file into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    /// The record ended before its terminator.
    #[error("Cache record is truncated.")]
    Truncated,
    /// The record is longer than any valid record can be.
    #[error("Cache record exceeds {MAX_RECORD_LINES} lines.")]
    TooManyLines,
    /// The record carries no `Exec` tokens.
    #[error("Cache record has an empty Exec.")]
    EmptyExec,
    /// A mandatory header line is empty.
    #[error("Cache record has no {0}.")]
    MissingField(&'static str),
    /// A header field cannot be written on a single line.
    #[error("Field '{0}' contains a line break and cannot be cached.")]
    EmbeddedNewline(&'static str),
    /// An `Exec` token contains one of the record separators.
    #[error("Exec token contains a record separator and cannot be cached.")]
    EmbeddedSeparator,
    /// The entry path cannot be stored as text.
    #[error("Entry path '{0}' is not valid UTF-8.")]
    NonUtf8Path(PathBuf),
}

/// A resolved terminal as persisted on disk, keyed by the environment hash it was
/// computed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Environment hash the record was computed under.
    pub hash: String,
    /// Executable that must still resolve for the record to be trusted.
    pub launcher: String,
    /// The cached resolution.
    pub terminal: ResolvedTerminal,
}

impl CacheRecord {
    /// Wraps `terminal`, taking the launcher from its first `Exec` token.
    pub fn new(hash: String, terminal: ResolvedTerminal) -> Self {
        let launcher = terminal.launcher().unwrap_or_default().to_string();
        Self {
            hash,
            launcher,
            terminal,
        }
    }

    /// Serializes the record: ten header lines, then the `Exec` tokens joined by a unit
    /// separator and closed by the record terminator.
    ///
    /// # Errors
    /// Header fields may not contain line breaks, tokens may not contain separators.
    pub fn render(&self) -> Result<String, CacheError> {
        let t = &self.terminal;
        let path = t
            .path
            .to_str()
            .ok_or_else(|| CacheError::NonUtf8Path(t.path.clone()))?;
        let header: [(&'static str, &str); HEADER_LINES] = [
            ("hash", self.hash.as_str()),
            ("launcher", self.launcher.as_str()),
            ("path", path),
            ("entry_id", t.entry_id.as_str()),
            ("action", t.action.as_str()),
            ("exec_arg", t.args.exec.as_str()),
            ("app_id_arg", t.args.app_id.as_str()),
            ("title_arg", t.args.title.as_str()),
            ("dir_arg", t.args.dir.as_str()),
            ("hold_arg", t.args.hold.as_str()),
        ];

        let mut out = String::new();
        for (name, value) in header {
            if value.contains(['\n', '\r']) {
                return Err(CacheError::EmbeddedNewline(name));
            }
            out.push_str(value);
            out.push('\n');
        }

        if t.exec.is_empty() {
            return Err(CacheError::EmptyExec);
        }
        if t
            .exec
            .iter()
            .any(|token| token.contains(UNIT_SEPARATOR) || token.contains('\u{1e}'))
        {
            return Err(CacheError::EmbeddedSeparator);
        }
        out.push_str(&t.exec.join(&UNIT_SEPARATOR.to_string()));
        out.push_str(RECORD_TERMINATOR);
        out.push('\n');
        Ok(out)
    }

    /// Parses a record produced by [`CacheRecord::render`].
    pub fn parse(text: &str) -> Result<Self, CacheError> {
        let mut lines = text.split('\n');

        let header: [&str; HEADER_LINES] = lines
            .by_ref()
            .take(HEADER_LINES)
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| CacheError::Truncated)?;
        let [hash, launcher, path, entry_id, action, exec_arg, app_id, title, dir, hold] = header;

        // The body may span lines: tokens can carry embedded line breaks.
        let mut body = String::new();
        let mut terminated = false;
        for (offset, line) in lines.enumerate() {
            if HEADER_LINES + offset >= MAX_RECORD_LINES {
                return Err(CacheError::TooManyLines);
            }
            if let Some(last) = line.strip_suffix(RECORD_TERMINATOR) {
                body.push_str(last);
                terminated = true;
                break;
            }
            body.push_str(line);
            body.push('\n');
        }
        if !terminated {
            return Err(CacheError::Truncated);
        }
        if hash.is_empty() {
            return Err(CacheError::MissingField("hash"));
        }
        if launcher.is_empty() {
            return Err(CacheError::MissingField("launcher"));
        }
        if body.is_empty() {
            return Err(CacheError::EmptyExec);
        }

        let exec: Vec<String> = body.split(UNIT_SEPARATOR).map(str::to_string).collect();
        Ok(Self {
            hash: hash.to_string(),
            launcher: launcher.to_string(),
            terminal: ResolvedTerminal {
                entry_id: entry_id.to_string(),
                path: PathBuf::from(path),
                action: action.to_string(),
                exec,
                args: TerminalArgs {
                    exec: exec_arg.to_string(),
                    app_id: app_id.to_string(),
                    title: title.to_string(),
                    dir: dir.to_string(),
                    hold: hold.to_string(),
                },
            },
        })
    }
}

/// Hashes everything a resolution depends on: the format version, the current desktop,
/// the compatibility toggle, and a metadata listing of every preference file and every
/// desktop entry directory.
///
/// # Errors
/// Returns an I/O error if an existing directory cannot be listed.
pub fn compute_hash(environment: &Environment) -> io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CACHE_FORMAT_VERSION.as_bytes());
    hasher.update(b"\n");
    hasher.update(environment.current_desktop.as_bytes());
    hasher.update(b"\n");
    hasher.update(format!("{:?}\n", environment.compat_override).as_bytes());

    for path in environment
        .config_files()
        .iter()
        .chain(environment.entry_dirs().iter())
    {
        hash_listing(&mut hasher, path)?;
    }

    let hash = hasher.finalize();
    let digest = hex::encode(hash.as_bytes().get(..HASH_TRUNCATE_LENGTH).unwrap_or_default());
    debug!("Environment hash: {}", digest);
    Ok(digest)
}

/// Feeds one path into the hasher: its name and metadata, recursing into directories.
/// Entries that cannot be inspected (dangling links, unreadable directories, link
/// loops) are listed with a `!` marker instead of failing the whole hash.
fn hash_listing(hasher: &mut blake3::Hasher, root: &Path) -> io::Result<()> {
    hasher.update(root.as_os_str().as_bytes());
    hasher.update(b"\n");

    if let Err(e) = fs::metadata(root) {
        if e.kind() == ErrorKind::NotFound {
            hasher.update(b"-\n");
            return Ok(());
        }
        return Err(e);
    }

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let (path, metadata) = match entry {
            Ok(entry) => {
                let metadata = entry.metadata();
                (entry.into_path(), metadata)
            }
            Err(e) => {
                let Some(path) = e.path().map(Path::to_path_buf) else {
                    return Err(e.into());
                };
                (path, Err(e))
            }
        };
        let relative = path.strip_prefix(root).unwrap_or(&path);
        hasher.update(relative.as_os_str().as_bytes());

        let metadata = match metadata {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Listing '{}' as unreadable: {}", path.display(), e);
                hasher.update(b"\t!\n");
                continue;
            }
        };
        let kind = if metadata.is_dir() { 'd' } else { 'f' };
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        hasher.update(format!("\t{}\t{}\t{}\n", kind, metadata.len(), mtime).as_bytes());
    }
    Ok(())
}

/// Returns the cached terminal if the record parses, was computed under
/// `expected_hash`, and its launcher is still executable. Any problem is a miss.
pub fn load(
    cache_file: &Path,
    expected_hash: &str,
    lookup: &ExecutableLookup,
) -> Option<ResolvedTerminal> {
    let text = match fs::read_to_string(cache_file) {
        Ok(text) => text,
        Err(e) => {
            debug!("Cache miss: cannot read '{}': {}", cache_file.display(), e);
            return None;
        }
    };

    let record = match CacheRecord::parse(&text) {
        Ok(record) => record,
        Err(e) => {
            debug!("Cache miss: {}", e);
            return None;
        }
    };

    if record.hash != expected_hash {
        debug!("Cache miss: hash {} != {}", record.hash, expected_hash);
        return None;
    }
    if !lookup.is_executable(&record.launcher) {
        debug!("Cache miss: launcher '{}' is gone.", record.launcher);
        return None;
    }

    debug!("Cache hit for '{}'", record.terminal.qualified_id());
    Some(record.terminal)
}

/// Writes `record` to `cache_file` with owner-only permissions, replacing any
/// previous file. A record that cannot be represented removes the old file instead.
pub fn store(cache_file: &Path, record: &CacheRecord) -> Result<(), CacheError> {
    let rendered = match record.render() {
        Ok(text) => text,
        Err(e) => {
            remove(cache_file);
            return Err(e);
        }
    };

    let parent = cache_file.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut file = tempfile::Builder::new()
        .prefix(".xdg-terminal-exec")
        .permissions(fs::Permissions::from_mode(0o600))
        .tempfile_in(parent)?;
    file.write_all(rendered.as_bytes())?;
    file.flush()?;
    file.persist(cache_file)?;

    debug!("Cache written to '{}'", cache_file.display());
    Ok(())
}

/// Persists a fresh resolution, or removes the cache when caching is disabled.
/// `known_hash` is reused when the lookup phase already computed it.
pub fn save(
    environment: &Environment,
    cache_enabled: bool,
    known_hash: Option<String>,
    terminal: &ResolvedTerminal,
) -> Result<(), CacheError> {
    let cache_file = environment.cache_file();
    if !cache_enabled {
        remove(&cache_file);
        return Ok(());
    }

    let hash = match known_hash {
        Some(hash) => hash,
        None => match compute_hash(environment) {
            Ok(hash) => hash,
            Err(e) => {
                remove(&cache_file);
                return Err(e.into());
            }
        },
    };

    store(&cache_file, &CacheRecord::new(hash, terminal.clone()))
}

/// Runs [`save`] on a background thread. Failures are logged and swallowed, with a
/// best-effort removal of a possibly inconsistent file.
pub fn spawn_save(
    environment: Environment,
    cache_enabled: bool,
    known_hash: Option<String>,
    terminal: ResolvedTerminal,
) -> Option<thread::JoinHandle<()>> {
    let spawned = thread::Builder::new()
        .name("cache-writer".to_string())
        .spawn(move || {
            if let Err(e) = save(&environment, cache_enabled, known_hash, &terminal) {
                debug!("Cache not written: {}", e);
                remove(&environment.cache_file());
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            debug!("Could not start cache writer: {}", e);
            None
        }
    }
}

/// Deletes the cache file, ignoring a missing file.
pub fn remove(cache_file: &Path) {
    match fs::remove_file(cache_file) {
        Ok(()) => debug!("Removed cache '{}'", cache_file.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove cache '{}': {}", cache_file.display(), e),
    }
}

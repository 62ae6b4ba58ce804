// src/core/session.rs

//! One invocation end to end: cache lookup, resolution, cache write-back.

use crate::{
    core::{
        cache,
        config_loader::ConfigLoader,
        entry_locator::EntryIndex,
        paths::Environment,
        resolver::Resolver,
    },
    models::ResolvedTerminal,
};
use anyhow::Result;
use std::thread::JoinHandle;

/// The outcome of [`find_terminal`]: the chosen terminal and, after a fresh
/// resolution, the background thread writing it back to the cache.
#[derive(Debug)]
pub struct Lookup {
    /// The chosen terminal.
    pub terminal: ResolvedTerminal,
    /// True when the terminal came straight from the cache.
    pub from_cache: bool,
    /// Pending background cache write.
    pub cache_writer: Option<JoinHandle<()>>,
}

impl Lookup {
    /// Waits for the pending cache write, if any. Its outcome is ignored.
    pub fn finish_cache_write(&mut self) {
        if let Some(handle) = self.cache_writer.take()
            && handle.join().is_err()
        {
            log::debug!("Cache writer panicked.");
        }
    }
}

/// Finds the terminal to use for this invocation.
///
/// Tries the cache first (unless the environment already disabled it), then runs the
/// full load, scan and resolve pipeline and schedules a cache write for the result.
///
/// # Errors
/// Fails only when no candidate survives resolution.
pub fn find_terminal(environment: &Environment) -> Result<Lookup> {
    let lookup = environment.lookup();
    let cache_file = environment.cache_file();

    let mut known_hash = None;
    let mut hash_failed = false;
    if environment.cache_override != Some(false) {
        match cache::compute_hash(environment) {
            Ok(hash) => {
                if let Some(terminal) = cache::load(&cache_file, &hash, &lookup) {
                    return Ok(Lookup {
                        terminal,
                        from_cache: true,
                        cache_writer: None,
                    });
                }
                known_hash = Some(hash);
            }
            Err(e) => {
                log::debug!("Cannot hash environment, caching skipped: {}", e);
                cache::remove(&cache_file);
                hash_failed = true;
            }
        }
    }

    let config = ConfigLoader::new(environment.cache_override, environment.compat_override)
        .load_files(&environment.config_files());
    let index = EntryIndex::scan(&environment.entry_dirs(), &config.directives);
    log::debug!(
        "{} preferred entries, {} desktop entries, {} fallback candidates",
        config.preferred.len(),
        index.len(),
        index.fallback().len()
    );

    let desktops = environment.current_desktops();
    let terminal = Resolver::new(&config, &index, &lookup, &desktops).resolve()?;

    let cache_writer = if hash_failed {
        None
    } else {
        cache::spawn_save(
            environment.clone(),
            config.directives.cache_enabled(),
            known_hash,
            terminal.clone(),
        )
    };

    Ok(Lookup {
        terminal,
        from_cache: false,
        cache_writer,
    })
}

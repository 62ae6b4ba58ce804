//! # Resolver
//!
//! Walks the candidate stream (explicitly preferred entries, then the fallback list)
//! and returns the first entry that passes every check.

use crate::{
    constants::DEFAULT_EXEC_ARG,
    core::{
        config_loader::LoadedConfig,
        entry_locator::EntryIndex,
        entry_parser::{EntryArgs, EntryParser, ParsedEntry, Rejection},
        paths,
    },
    models::{PreferredEntry, ResolvedTerminal, TerminalArgs},
    system::lookup::ExecutableLookup,
};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Fatal resolution failures.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Every candidate was rejected or none exists.
    #[error("No usable terminal entry found. Searched desktop entries in: {searched}")]
    NoTerminal { searched: String },
}

/// One step of the candidate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate<'c> {
    Explicit(&'c PreferredEntry),
    /// Everything after this point comes from the directory scan.
    Boundary,
    Fallback(&'c str),
}

/// Picks the terminal for one invocation.
#[derive(Debug)]
pub struct Resolver<'a> {
    config: &'a LoadedConfig,
    index: &'a EntryIndex,
    parser: EntryParser<'a>,
}

impl<'a> Resolver<'a> {
    /// Prepares a resolver over one loaded configuration and entry index.
    pub fn new(
        config: &'a LoadedConfig,
        index: &'a EntryIndex,
        lookup: &'a ExecutableLookup,
        desktops: &'a [String],
    ) -> Self {
        let parser = EntryParser::new(lookup, desktops, config.directives.execarg_compat());
        Self {
            config,
            index,
            parser,
        }
    }

    /// Returns the first fully valid candidate.
    ///
    /// # Errors
    /// [`ResolveError::NoTerminal`] when the whole stream is exhausted.
    pub fn resolve(&self) -> Result<ResolvedTerminal, ResolveError> {
        let mut filter_desktops = false;
        let mut processed: HashSet<(&str, Option<&str>)> = HashSet::new();

        for candidate in self.candidates() {
            let (entry_id, action) = match candidate {
                Candidate::Boundary => {
                    filter_desktops = true;
                    continue;
                }
                Candidate::Explicit(entry) => (entry.entry_id.as_str(), entry.action.as_deref()),
                Candidate::Fallback(entry_id) => (entry_id, None),
            };

            if !processed.insert((entry_id, action)) {
                continue;
            }
            let Some(path) = self.index.path_of(entry_id) else {
                log::debug!("Skipping '{}': no such desktop entry.", entry_id);
                continue;
            };

            match self.evaluate(entry_id, path, action, filter_desktops) {
                Ok(terminal) => {
                    log::debug!(
                        "Selected '{}' from '{}'",
                        terminal.qualified_id(),
                        terminal.path.display()
                    );
                    return Ok(terminal);
                }
                Err(rejection) => {
                    log::debug!("Skipping '{}' ({}): {}", entry_id, path.display(), rejection);
                }
            }
        }

        Err(ResolveError::NoTerminal {
            searched: paths::display_dirs(self.index.searched_dirs()),
        })
    }

    fn candidates(&self) -> impl Iterator<Item = Candidate<'a>> {
        let explicit = self.config.preferred.iter().map(Candidate::Explicit);
        let fallback = self
            .index
            .fallback()
            .iter()
            .map(|id| Candidate::Fallback(id.as_str()));
        explicit
            .chain(std::iter::once(Candidate::Boundary))
            .chain(fallback)
    }

    fn evaluate(
        &self,
        entry_id: &str,
        path: &Path,
        action: Option<&str>,
        filter_desktops: bool,
    ) -> Result<ResolvedTerminal, Rejection> {
        let ParsedEntry {
            exec,
            is_terminal,
            args,
        } = self.parser.parse_file(path, action, filter_desktops)?;

        if exec.is_empty() {
            return Err(Rejection::ExecEmpty);
        }
        if !is_terminal {
            return Err(Rejection::NotTerminal);
        }
        let exec_arg = self.exec_arg_for(entry_id, &args)?;

        Ok(ResolvedTerminal {
            entry_id: entry_id.to_string(),
            path: path.to_path_buf(),
            action: action.unwrap_or_default().to_string(),
            exec,
            args: TerminalArgs {
                exec: exec_arg,
                app_id: args.app_id.unwrap_or_default(),
                title: args.title.unwrap_or_default(),
                dir: args.dir.unwrap_or_default(),
                hold: args.hold.unwrap_or_default(),
            },
        })
    }

    /// The run-program argument: the entry's own value if it defines one, otherwise
    /// (compat mode only) the deprecated key, the configured per-entry default, or `-e`.
    fn exec_arg_for(&self, entry_id: &str, args: &EntryArgs) -> Result<String, Rejection> {
        if let Some(exec_arg) = &args.exec {
            return Ok(exec_arg.clone());
        }
        let directives = &self.config.directives;
        if !directives.execarg_compat() {
            return Err(Rejection::NoExecArg);
        }
        Ok(args
            .legacy_exec
            .clone()
            .or_else(|| directives.execarg_defaults.get(entry_id).cloned())
            .unwrap_or_else(|| DEFAULT_EXEC_ARG.to_string()))
    }
}

// src/constants.rs

//! File names, defaults and environment variable names.

/// Name of the per-user cache file (inside `$XDG_CACHE_HOME`).
pub const CACHE_FILENAME: &str = "xdg-terminal-exec";

/// Token mixed into every cache hash. Bump it whenever the record layout
/// or the resolution rules change.
pub const CACHE_FORMAT_VERSION: &str = "xdg-terminal-exec cache v1";

/// Generic (desktop-agnostic) preference list file name.
pub const CONFIG_LIST_FILENAME: &str = "xdg-terminals.list";

/// Sub-directory of the XDG data dirs that may also hold preference lists.
pub const CONFIG_DATA_SUBDIR: &str = "xdg-terminal-exec";

/// Sub-directory of the XDG data dirs holding desktop entries.
pub const APPLICATIONS_SUBDIR: &str = "applications";

/// Extension every desktop entry file carries.
pub const DESKTOP_ENTRY_EXTENSION: &str = "desktop";

/// Category a desktop entry must declare to be considered a terminal.
pub const TERMINAL_CATEGORY: &str = "TerminalEmulator";

/// Run-program argument used in compatibility mode when nothing else defines one.
pub const DEFAULT_EXEC_ARG: &str = "-e";

/// Cache used unless a toggle or directive says otherwise.
pub const DEFAULT_CACHE_ENABLED: bool = true;

/// Compatibility mode used unless a toggle or directive says otherwise.
pub const DEFAULT_EXECARG_COMPAT: bool = true;

/// Environment toggle pre-seeding the cache directive.
pub const ENV_CACHE_ENABLED: &str = "XTE_CACHE_ENABLED";

/// Environment toggle pre-seeding the compatibility directive.
pub const ENV_EXECARG_COMPAT: &str = "XTE_EXECARG_COMPAT";

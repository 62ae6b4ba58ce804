//! # xdg-terminal-exec
//!
//! Picks the user's preferred terminal emulator from `*xdg-terminals.list` preference
//! files and `TerminalEmulator` desktop entries, and builds the command line that runs
//! a program in it.
//!
//! The resolution engine lives in [`core`]; [`system`] holds the pieces that touch the
//! process itself (executable lookup and the final `exec`).

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;

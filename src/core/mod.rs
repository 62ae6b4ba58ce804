// src/core/mod.rs

//! The terminal resolution engine: preference loading, entry discovery and parsing,
//! `Exec` tokenizing, candidate resolution and the result cache.

pub mod cache;
pub mod config_loader;
pub mod entry_locator;
pub mod entry_parser;
pub mod exec_tokenizer;
pub mod paths;
pub mod resolver;
pub mod session;

//! # System Interaction Layer
//!
//! Abstractions over the operating system, kept apart from the resolution logic.
//!
//! ## Modules
//!
//! - **`lookup`**: Answers whether a program can be executed, against a `PATH` snapshot.
//! - **`executor`**: Assembles the terminal command line from the resolved entry and the
//!   caller's request, then replaces the current process with it.

pub mod executor;
pub mod lookup;

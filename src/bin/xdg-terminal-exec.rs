// src/bin/xdg-terminal-exec.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use xdg_terminal_exec::{
    cli::Cli,
    core::{paths::Environment, session},
    system::executor,
};

/// The main entry point of `xdg-terminal-exec`.
/// It sets up logging, resolves the terminal, and either reports or launches it.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let environment =
        Environment::from_process().context("Failed to read the XDG environment")?;
    let mut lookup = session::find_terminal(&environment)?;
    let terminal = &lookup.terminal;
    log::debug!(
        "Using '{}' ({})",
        terminal.qualified_id(),
        if lookup.from_cache { "cached" } else { "resolved" }
    );

    let request = cli.launch_request();
    let argv = executor::build_command_line(terminal, &request);

    if cli.print_only() {
        if cli.print_id {
            println!("{}", terminal.qualified_id());
        }
        if cli.print_path {
            println!("{}", terminal.path.display());
        }
        if let Some(separator) = &cli.print_cmd {
            println!("{}", argv.join(separator));
        }
        lookup.finish_cache_write();
        return Ok(());
    }

    // The process image is replaced below; the record must be on disk first.
    lookup.finish_cache_write();
    Err(executor::exec_terminal(&argv, request.dir.as_ref()).into())
}

mod cli;
mod commands;
mod config;
mod progress;
mod ui;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub manifest_path: PathBuf,
    pub luarocks: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let manifest_path = match cli.manifest {
        Some(path) => path,
        None => config::default_manifest_path()?,
    };

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        manifest_path,
        luarocks: cli.luarocks,
    };

    match cli.command {
        Command::Sync(args) => commands::sync::run(&ctx, &args),
        Command::Install(args) => commands::install::run(&ctx, &args),
        Command::Remove(args) => commands::remove::run(&ctx, &args),
        Command::Update(args) => commands::update::run(&ctx, &args),
        Command::Prune(args) => commands::prune::run(&ctx, &args),
        Command::Status(args) => commands::status::run(&ctx, &args),
    }
}

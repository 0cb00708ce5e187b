use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rocksync")]
#[command(version)]
#[command(about = "Declarative LuaRocks package management", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the rocks manifest (defaults to the user config dir)
    #[arg(long, global = true, env = "ROCKSYNC_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// luarocks binary to invoke
    #[arg(
        long,
        global = true,
        env = "ROCKSYNC_LUAROCKS",
        default_value = "luarocks"
    )]
    pub luarocks: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge installed rocks to the manifest
    Sync(SyncArgs),

    /// Install a rock and record it in the manifest
    Install(InstallArgs),

    /// Remove a rock and drop it from the manifest
    Remove(RemoveArgs),

    /// Upgrade manifest rocks to their newest available versions
    Update(UpdateArgs),

    /// Remove a rock together with its orphaned dependencies
    Prune(PruneArgs),

    /// Show desired vs installed state
    Status(StatusArgs),
}

#[derive(clap::Args)]
pub struct SyncArgs {
    /// Skip the confirmation prompt before removing rocks
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(clap::Args)]
pub struct InstallArgs {
    /// Rock to install
    pub name: String,

    /// Version to pin, or "dev" for the unreleased build
    pub version: Option<String>,

    /// Mark the rock lazy: do not auto-activate its runtime files
    #[arg(long)]
    pub opt: bool,
}

#[derive(clap::Args)]
pub struct RemoveArgs {
    /// Rock to remove
    pub name: String,
}

#[derive(clap::Args)]
pub struct UpdateArgs {
    /// Update only this rock
    pub name: Option<String>,
}

#[derive(clap::Args)]
pub struct PruneArgs {
    /// Rock to prune
    pub name: String,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(clap::Args)]
pub struct StatusArgs {
    /// Emit machine-readable JSON instead of the table
    #[arg(long)]
    pub json: bool,
}

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

/// Action-log version control for 3D scenes
///
/// scenelog records the actions that build a scene as a replayable log,
/// commits the log together with a snapshot into git, and rebuilds any
/// historical state by replaying its log from an empty scene.
///
/// This binary drives a headless reference scene; it is the operator and
/// debugging surface over the same session the editor integration uses.
///
/// QUICK START:
///
///   scenelog -C robot init --name "Ada" --email ada@studio.test
///   scenelog -C robot record "bpy.ops.mesh.primitive_cube_add()"
///   scenelog -C robot commit -m "add cube"
///   scenelog -C robot log
#[derive(Parser)]
#[command(name = "scenelog")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'scenelog <command> --help' for more information on a specific command.")]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, default_value = ".", value_name = "DIR")]
    directory: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project
    ///
    /// Writes the configuration, an empty action log and snapshot, and a
    /// repository with the first commits.
    Init(commands::InitArgs),

    /// Capture host records into the project
    ///
    /// Records are read from the arguments, or one per line from stdin when
    /// none are given. Accepted actions are applied to the scene and saved.
    Record(commands::RecordArgs),

    /// Save and commit the current state
    Commit(commands::CommitArgs),

    /// Create a branch at HEAD
    Branch(commands::BranchArgs),

    /// List branches, marking the active one
    Branches,

    /// Switch to a branch and rebuild the scene from its log
    Checkout(commands::CheckoutArgs),

    /// Show the commits of a branch, most recent first
    Log(commands::LogArgs),

    /// Revert to an earlier commit by creating a new commit
    Revert(commands::RevertArgs),

    /// Show branch, HEAD and uncommitted actions
    Status(commands::StatusArgs),

    /// Print the action log stored in a commit
    Show(commands::ShowArgs),
}

fn main() -> Result<()> {
    let _telemetry = scenelog::telemetry::init();
    let cli = Cli::parse();
    let root = cli.directory;

    match cli.command {
        Commands::Init(args) => commands::init(&root, &args),
        Commands::Record(args) => commands::record(&root, &args),
        Commands::Commit(args) => commands::commit(&root, &args),
        Commands::Branch(args) => commands::branch(&root, &args),
        Commands::Branches => commands::branches(&root),
        Commands::Checkout(args) => commands::checkout(&root, &args),
        Commands::Log(args) => commands::log(&root, &args),
        Commands::Revert(args) => commands::revert(&root, &args),
        Commands::Status(args) => commands::status(&root, &args),
        Commands::Show(args) => commands::show(&root, &args),
    }
}

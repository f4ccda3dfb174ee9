//! Subcommand implementations for the `scenelog` binary.

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use scenelog::actionlog;
use scenelog::replay;
use scenelog::store::{Identity, RevertOutcome};
use scenelog::{HeadlessScene, Session};
use serde_json::json;

type SceneSession = Session<HeadlessScene>;

fn open(root: &Path) -> Result<SceneSession> {
    Session::open(root, HeadlessScene::new())
        .with_context(|| format!("could not open project at {}", root.display()))
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Author name for commits
    #[arg(long, default_value = "Artist")]
    name: String,

    /// Author email for commits
    #[arg(long, default_value = "artist@example.com")]
    email: String,
}

pub fn init(root: &Path, args: &InitArgs) -> Result<()> {
    let identity = Identity::new(&args.name, &args.email);
    let session = Session::create(root, identity, HeadlessScene::new())
        .with_context(|| format!("could not create project at {}", root.display()))?;
    let head = session.head()?;
    println!(
        "Created project '{}' on branch {} at {}",
        session.layout().name(),
        head.branch,
        head.commit.map(|c| c.short()).unwrap_or_default()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// record
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct RecordArgs {
    /// Raw host records; read from stdin when omitted
    records: Vec<String>,
}

pub fn record(root: &Path, args: &RecordArgs) -> Result<()> {
    let mut session = open(root)?;
    session.set_executes_actions(true);
    let mut produced = 0;
    if args.records.is_empty() {
        for line in std::io::stdin().lock().lines() {
            produced += session.on_action(&line.context("could not read stdin")?);
        }
    } else {
        for record in &args.records {
            produced += session.on_action(record);
        }
    }
    let saved = session.save()?;
    println!("Saved {saved} action(s) ({produced} accepted)");
    Ok(())
}

// ---------------------------------------------------------------------------
// commit / branch / checkout / revert
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CommitArgs {
    /// Commit message
    #[arg(short, long)]
    message: String,
}

pub fn commit(root: &Path, args: &CommitArgs) -> Result<()> {
    let mut session = open(root)?;
    let oid = session.commit(&args.message)?;
    println!("[{} {}] {}", session.head()?.branch, oid.short(), args.message);
    Ok(())
}

#[derive(Args)]
pub struct BranchArgs {
    /// Name of the new branch
    name: String,
}

pub fn branch(root: &Path, args: &BranchArgs) -> Result<()> {
    let mut session = open(root)?;
    session.create_branch(&args.name)?;
    println!("Created branch {}", args.name);
    Ok(())
}

pub fn branches(root: &Path) -> Result<()> {
    let session = open(root)?;
    for branch in session.branches()? {
        let marker = if branch.is_active { '*' } else { ' ' };
        println!("{marker} {}", branch.name);
    }
    Ok(())
}

#[derive(Args)]
pub struct CheckoutArgs {
    /// Branch to switch to
    name: String,

    /// Drop uncommitted actions instead of refusing
    #[arg(long)]
    discard: bool,
}

pub fn checkout(root: &Path, args: &CheckoutArgs) -> Result<()> {
    let mut session = open(root)?;
    let report = session.checkout(&args.name, args.discard)?;
    println!(
        "Switched to branch {} ({} action(s) replayed)",
        args.name, report.executed
    );
    Ok(())
}

#[derive(Args)]
pub struct RevertArgs {
    /// Commit id to restore (at least 4 hex digits)
    commit: String,
}

pub fn revert(root: &Path, args: &RevertArgs) -> Result<()> {
    let mut session = open(root)?;
    match session.revert_to(&args.commit)? {
        Some(RevertOutcome::Reverted { commit, target, .. }) => {
            println!("Reverted to {} as {}", target.short(), commit.short());
        }
        Some(RevertOutcome::Cancelled) | None => {
            println!("Already at {}; nothing to revert", args.commit);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// log / status / show
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct LogArgs {
    /// Branch to list (default: the active branch)
    branch: Option<String>,

    /// Emit JSON lines
    #[arg(long)]
    json: bool,
}

pub fn log(root: &Path, args: &LogArgs) -> Result<()> {
    let session = open(root)?;
    let branch = match &args.branch {
        Some(b) => b.clone(),
        None => session.head()?.branch,
    };
    let now = chrono::Utc::now();
    for record in session.commits(&branch)? {
        let record = record?;
        if args.json {
            let value = json!({
                "id": record.id.to_string(),
                "author": record.author,
                "email": record.email,
                "date": record.date,
                "message": record.message,
            });
            println!("{value}");
        } else {
            println!(
                "{}  {:>8}  {:<16} {}",
                record.short_id,
                record.age(now),
                record.author,
                record.message
            );
        }
    }
    Ok(())
}

#[derive(Args)]
pub struct StatusArgs {
    /// Emit JSON
    #[arg(long)]
    json: bool,
}

pub fn status(root: &Path, args: &StatusArgs) -> Result<()> {
    let session = open(root)?;
    let status = session.status()?;
    let head = status.head.map(|h| h.short()).unwrap_or_default();
    if args.json {
        let value = json!({
            "branch": status.branch,
            "head": head,
            "pending": status.pending,
            "fingerprint": session.document().fingerprint(),
        });
        println!("{value}");
    } else {
        println!("On branch {} at {head}", status.branch);
        if status.pending == 0 {
            println!("Nothing to commit");
        } else {
            println!("{} action(s) saved since the last commit", status.pending);
        }
    }
    Ok(())
}

#[derive(Args)]
pub struct ShowArgs {
    /// Commit id (default: HEAD)
    commit: Option<String>,

    /// Replay the log and print the resulting scene instead
    #[arg(long)]
    state: bool,
}

pub fn show(root: &Path, args: &ShowArgs) -> Result<()> {
    let session = open(root)?;
    let store = session.store();
    let commit = match &args.commit {
        Some(id) => store.resolve_commit(id)?,
        None => match session.head()?.commit {
            Some(c) => c,
            None => bail!("HEAD has no commits"),
        },
    };
    let text = store.read_log_at(commit)?;
    let actions = actionlog::parse_actions(&text, 0);
    if args.state {
        let mut scene = HeadlessScene::new();
        replay::replay(&mut scene, &actions)?;
        println!("{}", serde_json::to_string_pretty(scene.state())?);
        println!("fingerprint {}", scene.fingerprint());
    } else {
        for action in &actions {
            println!("{action}");
        }
    }
    Ok(())
}

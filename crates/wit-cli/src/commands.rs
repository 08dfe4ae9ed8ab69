use std::path::PathBuf;
use std::sync::Arc;

use chrono::DateTime;
use colored::Colorize;
use wit_remote::DirRemote;
use wit_sync::{
    FetchReport, PullReport, PushReport, RemoteClients, Session, SyncResult,
};
use wit_types::{CommitId, RepoId};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> SyncResult<()> {
    let clients = make_clients(&cli.remote)?;
    match cli.command {
        Command::Init(args) => cmd_init(args, clients),
        Command::Status(_) => cmd_status(clients),
        Command::Add(args) => cmd_add(args, clients),
        Command::Commit(args) => cmd_commit(args, clients),
        Command::Log(args) => cmd_log(args, clients),
        Command::Remote(_) => cmd_remote(clients),
        Command::Push(_) => cmd_push(clients).await,
        Command::Fetch(_) => cmd_fetch(clients).await,
        Command::Pull(_) => cmd_pull(clients).await,
        Command::Clone(args) => cmd_clone(args, clients).await,
        Command::Checkout(args) => cmd_checkout(args, clients).await,
    }
}

fn make_clients(remote_dir: &str) -> SyncResult<RemoteClients> {
    let remote = Arc::new(DirRemote::open(remote_dir)?);
    Ok(RemoteClients::new(remote.clone(), remote))
}

fn open_session(clients: RemoteClients) -> SyncResult<Session> {
    Session::open(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")), clients)
}

fn cmd_init(args: InitArgs, clients: RemoteClients) -> SyncResult<()> {
    let path = args.path.unwrap_or_else(|| ".".into());
    let session = Session::init(&path, &args.name, &args.author, clients)?;
    println!(
        "{} Initialized wit repository in {}",
        "✓".green().bold(),
        session.workdir().display().to_string().bold()
    );
    Ok(())
}

fn cmd_status(clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    let status = session.status()?;

    println!("State: {}", status.state.to_string().cyan());
    match session.head()? {
        Some(head) => println!("HEAD:  {}", head.short().yellow()),
        None => println!("HEAD:  {}", "(no commits)".dimmed()),
    }

    if !status.staged.is_empty() {
        println!("\nStaged (index vs HEAD):");
        for entry in &status.staged {
            println!("  {} {}", format!("{}:", entry.change).green(), entry.path);
        }
    }
    if !status.modified.is_empty() {
        println!("\nModified:");
        for path in &status.modified {
            println!("  {}", path.red());
        }
    }
    if !status.deleted.is_empty() {
        println!("\nDeleted:");
        for path in &status.deleted {
            println!("  {}", path.red());
        }
    }
    if !status.untracked.is_empty() {
        println!("\nUntracked:");
        for path in &status.untracked {
            println!("  {}", path.dimmed());
        }
    }
    if status.worktree_clean() && status.staged.is_empty() {
        println!("\nWorking tree clean.");
    }
    Ok(())
}

fn cmd_add(args: AddArgs, clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    let paths = if args.paths.is_empty() {
        vec![".".to_string()]
    } else {
        args.paths
    };
    let staged = session.add(&paths)?;
    for path in &staged {
        println!("  {} {}", "staged:".green(), path);
    }
    println!("{} file(s) staged", staged.len());
    Ok(())
}

fn cmd_commit(args: CommitArgs, clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    let id = session.commit(&args.message)?;
    println!(
        "{} Committed {} {}",
        "✓".green().bold(),
        id.short().yellow(),
        args.message
    );
    Ok(())
}

fn cmd_log(args: LogArgs, clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    for entry in session.log(args.limit)? {
        let date = DateTime::from_timestamp(entry.timestamp_secs as i64, 0)
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| entry.timestamp_secs.to_string());
        let sync_mark = match &entry.remote_id {
            Some(remote) => format!("↑{}", remote.short()).green().to_string(),
            None => "local".dimmed().to_string(),
        };
        println!(
            "{}  {}  {}  [{}]",
            entry.id.short().yellow().bold(),
            date.dimmed(),
            entry.message,
            sync_mark
        );
        println!("        {} {}", "author:".dimmed(), entry.author);
    }
    Ok(())
}

fn cmd_remote(clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    let config = session.config()?;
    match &config.repo_id {
        Some(id) => println!("Repository: {}", id.to_string().bold()),
        None => println!("Repository: {}", "(not yet created; push to create)".dimmed()),
    }
    match session.remote_head()? {
        Some(remote) => println!(
            "Remote head: {} (version {})",
            remote.commit.short().yellow(),
            remote.version
        ),
        None => println!("Remote head: {}", "(never fetched)".dimmed()),
    }
    println!("State: {}", session.sync_state()?.to_string().cyan());
    Ok(())
}

async fn cmd_push(clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    match session.push().await? {
        PushReport::UpToDate => println!("Already up to date."),
        PushReport::Pushed {
            commits,
            head,
            new_version,
        } => println!(
            "{} Pushed {} commit(s); remote now {} at version {}",
            "✓".green().bold(),
            commits,
            head.short().yellow(),
            new_version
        ),
    }
    Ok(())
}

async fn cmd_fetch(clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    match session.fetch().await? {
        FetchReport::NoRemoteHead => println!("Remote has no head yet."),
        FetchReport::Fetched { head, new_commits } => println!(
            "{} Fetched {} new commit(s); remote head {}",
            "✓".green().bold(),
            new_commits,
            head.short().yellow()
        ),
    }
    Ok(())
}

async fn cmd_pull(clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    match session.pull().await? {
        PullReport::UpToDate => println!("Already up to date."),
        PullReport::FastForward { to, .. } => println!(
            "{} Fast-forwarded to {}",
            "✓".green().bold(),
            to.short().yellow()
        ),
    }
    Ok(())
}

async fn cmd_clone(args: CloneArgs, clients: RemoteClients) -> SyncResult<()> {
    let dir = args.dir.clone().unwrap_or_else(|| args.repo_id.clone());
    let (session, head) = Session::clone_repository(
        &dir,
        RepoId::new(args.repo_id),
        &args.author,
        clients,
    )
    .await?;
    match head {
        Some(head) => println!(
            "{} Cloned into {} at {}",
            "✓".green().bold(),
            session.workdir().display().to_string().bold(),
            head.short().yellow()
        ),
        None => println!(
            "{} Cloned empty repository into {}",
            "✓".green().bold(),
            session.workdir().display().to_string().bold()
        ),
    }
    Ok(())
}

async fn cmd_checkout(args: CheckoutArgs, clients: RemoteClients) -> SyncResult<()> {
    let session = open_session(clients)?;
    let id = CommitId::from_text(&args.commit)
        .map_err(|e| wit_sync::SyncError::Storage(format!("invalid commit id: {e}")))?;
    let report = session.checkout(id).await?;
    println!(
        "{} Checked out {} ({} written, {} deleted)",
        "✓".green().bold(),
        id.short().yellow(),
        report.written,
        report.deleted
    );
    Ok(())
}

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wit",
    about = "wit: single-branch, content-addressed version control with a mirrored remote",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory serving as the remote ledger and blob storage.
    #[arg(long, global = true, env = "WIT_REMOTE", default_value = ".wit-remote")]
    pub remote: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new repository
    Init(InitArgs),
    /// Show working tree, staging, and sync status
    Status(StatusArgs),
    /// Stage files
    Add(AddArgs),
    /// Commit the staged index
    Commit(CommitArgs),
    /// Show commit history
    Log(LogArgs),
    /// Show the remote tracking state
    Remote(RemoteArgs),
    /// Upload local history and advance the remote pointer
    Push(PushArgs),
    /// Download and validate remote state
    Fetch(FetchArgs),
    /// Fetch and fast-forward the working copy
    Pull(PullArgs),
    /// Clone a remote repository
    Clone(CloneArgs),
    /// Check out a commit into the working tree
    Checkout(CheckoutArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<String>,
    /// Repository name used when the remote repository is created
    #[arg(long, default_value = "repo")]
    pub name: String,
    #[arg(long, env = "WIT_AUTHOR", default_value = "anonymous")]
    pub author: String,
}

#[derive(Args)]
pub struct StatusArgs {}

#[derive(Args)]
pub struct AddArgs {
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct CommitArgs {
    #[arg(short, long)]
    pub message: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct RemoteArgs {}

#[derive(Args)]
pub struct PushArgs {}

#[derive(Args)]
pub struct FetchArgs {}

#[derive(Args)]
pub struct PullArgs {}

#[derive(Args)]
pub struct CloneArgs {
    /// Repository id in the remote ledger
    pub repo_id: String,
    /// Target directory (defaults to the repository id)
    pub dir: Option<String>,
    #[arg(long, env = "WIT_AUTHOR", default_value = "anonymous")]
    pub author: String,
}

#[derive(Args)]
pub struct CheckoutArgs {
    /// Commit id (full hash text)
    pub commit: String,
}

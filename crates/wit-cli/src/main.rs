use clap::Parser;
use colored::Colorize;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt::init();
    let cli = cli::Cli::parse();
    match commands::run_command(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", format!("{}:", e.category()).red().bold());
            eprintln!("  {} {}", "hint:".dimmed(), e.advice());
            std::process::ExitCode::FAILURE
        }
    }
}

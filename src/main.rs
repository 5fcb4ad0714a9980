//! unitver CLI entry point.
//!
//! Parses arguments, installs the tracing subscriber (respecting
//! `RUST_LOG`), and dispatches to [`unitver::cli`].

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;
use unitver::cli::Cli;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    if let Err(e) = cli.execute().await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

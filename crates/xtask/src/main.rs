//! Project automation tasks for analyst-rs

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Project automation tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all tests
    Test {
        /// Also run tests that call live APIs
        #[arg(long)]
        live: bool,
    },
    /// Run clippy lints
    Lint,
    /// Format the workspace, or only check formatting
    Fmt {
        #[arg(long)]
        check: bool,
    },
    /// Formatting check, lints, then tests
    Ci,
}

fn cargo(args: &[&str]) -> anyhow::Result<()> {
    println!("$ cargo {}", args.join(" "));
    let status = Command::new(std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()))
        .args(args)
        .status()
        .with_context(|| format!("failed to run cargo {}", args.join(" ")))?;
    if !status.success() {
        bail!("cargo {} failed with {status}", args.join(" "));
    }
    Ok(())
}

fn test(live: bool) -> anyhow::Result<()> {
    if live {
        cargo(&["test", "--workspace", "--", "--include-ignored"])
    } else {
        cargo(&["test", "--workspace"])
    }
}

fn lint() -> anyhow::Result<()> {
    cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
}

fn fmt(check: bool) -> anyhow::Result<()> {
    if check {
        cargo(&["fmt", "--all", "--", "--check"])
    } else {
        cargo(&["fmt", "--all"])
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test { live } => test(live),
        Commands::Lint => lint(),
        Commands::Fmt { check } => fmt(check),
        Commands::Ci => {
            fmt(true)?;
            lint()?;
            test(false)
        }
    }
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use edgepatch_core::Channel;

mod completion;
mod config;
mod dispatch;
mod flows;
mod logging;
mod render;

#[derive(Parser, Debug)]
#[command(name = "edgepatch")]
#[command(
    about = "Enable Copilot in Microsoft Edge by patching its local configuration",
    long_about = None
)]
struct Cli {
    /// Read settings from this TOML file instead of the default location.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Disable status badges, section headers and progress bars.
    #[arg(long, global = true)]
    plain: bool,
    /// Print debug diagnostics to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stop Edge, patch every installation, then restart Edge (default).
    Patch(PatchArgs),
    /// Show discovered installations without changing anything.
    Doctor,
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct PatchArgs {
    /// Only patch these channels (repeatable).
    #[arg(long = "channel", value_name = "CHANNEL")]
    channels: Vec<Channel>,
    /// Country code written to Local State.
    #[arg(long, value_name = "CODE")]
    country: Option<String>,
    /// Do not stop running Edge processes first.
    #[arg(long)]
    no_shutdown: bool,
    /// Do not start Edge again after patching.
    #[arg(long)]
    no_restart: bool,
    /// Report what would change without stopping Edge or writing files.
    #[arg(long)]
    dry_run: bool,
    /// Wait for Enter before exiting.
    #[arg(long, conflicts_with = "no_pause")]
    pause: bool,
    /// Exit without waiting for Enter.
    #[arg(long)]
    no_pause: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match dispatch::run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests;

use std::io::{self, IsTerminal};

use anyhow::Result;
use edgepatch_core::Platform;

use crate::completion::write_completions_script;
use crate::config::{load_config, PatchSettings};
use crate::flows::{run_doctor, run_patch};
use crate::render::{current_output_style, TerminalRenderer};
use crate::{Cli, Commands, PatchArgs};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let renderer = TerminalRenderer::from_style(current_output_style(cli.plain));

    match cli
        .command
        .unwrap_or_else(|| Commands::Patch(PatchArgs::default()))
    {
        Commands::Patch(args) => {
            let platform = Platform::current()?;
            let config = load_config(cli.config.as_deref(), platform)?;
            let settings =
                PatchSettings::resolve(&args, &config, platform, io::stdin().is_terminal())?;
            tracing::debug!(?settings, "resolved patch settings");
            run_patch(&settings, platform, renderer)
        }
        Commands::Doctor => {
            let platform = Platform::current()?;
            let config = load_config(cli.config.as_deref(), platform)?;
            let settings =
                PatchSettings::resolve(&PatchArgs::default(), &config, platform, false)?;
            run_doctor(&settings, platform)
        }
        Commands::Completions { shell } => {
            write_completions_script(shell, &mut io::stdout().lock())
        }
    }
}

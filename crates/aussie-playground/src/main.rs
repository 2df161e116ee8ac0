use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr, bail, eyre};

mod args;
mod catalog;
mod commands;
mod console;
mod trace;

use args::{Cli, Commands};
use commands::{examples::ExamplesCommand, flip::FlipCommand, run::RunCommand};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Load .env if it exists, then logging (level via RUST_LOG).
    let _ = dotenvy::dotenv();
    trace::init_tracing()?;

    let cli = Cli::parse();
    let timeout = cli.timeout.map(Duration::from_secs);

    match cli.command {
        Commands::Run { file, example } => {
            let command = RunCommand {
                source: load_source(file, example)?,
                runtime: require_runtime(cli.runtime)?,
                upside_down: cli.upside_down,
                timeout,
                json: cli.json,
            };
            command.execute().await
        }
        Commands::Flip { file } => {
            let command = FlipCommand {
                source: read_program(&file)?,
                runtime: require_runtime(cli.runtime)?,
                upside_down: cli.upside_down,
                timeout,
            };
            command.execute().await
        }
        Commands::Examples { name } => ExamplesCommand { name }.execute(),
    }
}

fn load_source(file: Option<PathBuf>, example: Option<String>) -> Result<String> {
    match (file, example) {
        (Some(path), None) => read_program(&path),
        (None, Some(name)) => catalog::find(&name)
            .map(|example| example.source.to_owned())
            .ok_or_else(|| eyre!("no example named `{name}`; try `aussie examples`")),
        (None, None) => bail!("provide a program file or --example <NAME>"),
        (Some(_), Some(_)) => bail!("provide either a program file or --example, not both"),
    }
}

fn read_program(path: &Path) -> Result<String> {
    fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn require_runtime(path: Option<PathBuf>) -> Result<PathBuf> {
    path.ok_or_else(|| {
        eyre!("no runtime library configured; pass --runtime or set AUSSIE_RUNTIME")
    })
}

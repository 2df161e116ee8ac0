use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "aussie",
    about = "Playground for Aussie++, the programming language from down under",
    version
)]
pub struct Cli {
    /// Path to the compiled Aussie++ runtime library
    #[arg(long, env = "AUSSIE_RUNTIME", global = true)]
    pub runtime: Option<PathBuf>,

    /// Treat the program text as upside-down
    #[arg(long, global = true)]
    pub upside_down: bool,

    /// Give up waiting after this many seconds (the runtime keeps running)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Emit raw event envelopes as JSON lines
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run a program and stream its output
    Run {
        /// Path to the program
        file: Option<PathBuf>,

        /// Run a bundled example instead of a file
        #[arg(long, conflicts_with = "file")]
        example: Option<String>,
    },
    /// Flip a program between right-side-up and upside-down
    Flip {
        /// Path to the program
        file: PathBuf,
    },
    /// List the bundled example programs, or print one
    Examples { name: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_an_example_flag() {
        let cli = Cli::parse_from(["aussie", "run", "--example", "dreamtime", "--upside-down"]);
        assert!(cli.upside_down);
        assert!(matches!(
            cli.command,
            Commands::Run {
                file: None,
                example: Some(name)
            } if name == "dreamtime"
        ));
    }
}

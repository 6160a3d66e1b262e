//! aifmt: AI-assisted code formatter.
//!
//! # Usage
//!
//! ```text
//! aifmt format -l <language> [-m <model>] [-w] [-c] [-r] [-s] [--jobs N] <files>...
//! aifmt set <key> <value>
//! aifmt settoken
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{format::FormatArgs, set::SetArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "aifmt",
    version,
    about = "Format and improve source files with an AI model",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite the given files through the model, concurrently.
    #[command(alias = "fmt")]
    Format(FormatArgs),

    /// Write one key of ~/.aifmt/config.yaml.
    Set(SetArgs),

    /// Read the API token from stdin and store it.
    #[command(name = "settoken")]
    SetToken,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Format(args) => args.run(),
        Commands::Set(args) => args.run(),
        Commands::SetToken => commands::set::run_set_token(),
    }
}

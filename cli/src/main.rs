//! Callflow CLI - Command-line interface for the call-flow engine
//!
//! # Commands
//! - `callflow serve [--config <file>]` - Run the webhook server
//! - `callflow check <catalog>` - Lint every flow in a catalog
//! - `callflow render <catalog> --to <number>` - Render one turn offline

mod check;
mod render;
mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Callflow CLI
#[derive(Parser)]
#[command(name = "callflow")]
#[command(author, version, about = "Interactive call-flow webhook engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        /// TOML config file; CALLFLOW_* environment variables override it
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Lint a flow catalog; exits non-zero on errors
    Check {
        /// Flow catalog JSON file
        catalog: PathBuf,

        /// Fail on warnings too
        #[arg(long)]
        strict: bool,
    },

    /// Render the markup for one webhook without a carrier
    Render {
        /// Flow catalog JSON file
        catalog: PathBuf,

        /// Dialed number (or line id)
        #[arg(long, visible_alias = "line")]
        to: String,

        /// Round-tripped step id; omit for the first webhook of a call
        #[arg(long)]
        step: Option<String>,

        /// Caller DTMF input
        #[arg(long)]
        digits: Option<String>,

        /// Base for continuation URLs
        #[arg(long, default_value = "http://localhost:3000")]
        base_url: String,

        /// Transfer number for transfer steps without one
        #[arg(long)]
        default_transfer_number: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve::run_serve_command(config.as_deref()),
        Commands::Check { catalog, strict } => check::run_check_command(&catalog, strict),
        Commands::Render {
            catalog,
            to,
            step,
            digits,
            base_url,
            default_transfer_number,
        } => render::run_render_command(render::RenderArgs {
            catalog,
            to,
            step,
            digits,
            base_url,
            default_transfer_number,
        }),
    }
}

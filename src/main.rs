//! `fileflow` - bulk file procedures (move, delete, clean).
//!
//! See `README.md` for user documentation and `DESIGN.md` for architecture.

use anyhow::Result;
use clap::Parser;
use tracing::Level;

use fileflow::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let exit_code = match cli.command {
        Command::Schema => {
            let schema = fileflow::model::generate_schema();
            println!("{}", schema);
            0
        }
        Command::Run(args) => fileflow::engine::run(args)?,
        Command::Clean(args) => fileflow::engine::clean(args)?,
    };
    std::process::exit(exit_code);
}

mod cli;
mod columns;
mod db;
mod error;
mod exporter;
mod importer;
mod models;
mod normalize;
mod receipt;
mod reconciler;
mod session;
mod settings;
mod sheet;
mod store;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG > --verbose > errors only; the preview already prints row warnings
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("error")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .init();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file, yes } => cli::import::run(&file, yes),
        Commands::Receipt { file, yes } => cli::receipt::run(&file, yes),
        Commands::Export { format, output } => cli::export::run(format.into(), output),
        Commands::Categories => cli::categories::list(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

mod api;
mod cli;
mod credentials;
mod error;
mod model;
mod operations;
mod storage;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,todo=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command.unwrap_or_default() {
        Commands::Serve { host, port, db } => tokio::runtime::Runtime::new()
            .map_err(error::TodoError::from)
            .and_then(|rt| rt.block_on(cli::serve::execute(host, port, db))),
        Commands::Init { force } => cli::init::execute(force),
        Commands::User { action, db } => cli::user::execute(action, db),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "todo exited with an error");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

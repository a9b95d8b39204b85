//! CLI module

pub mod init;
pub mod serve;
pub mod user;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "todo")]
#[command(version)]
#[command(about = "Personal task tracking API server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default)
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// SQLite database file (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Write a default config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: user::UserAction,
        /// SQLite database file (overrides config)
        #[arg(long, global = true)]
        db: Option<PathBuf>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            host: None,
            port: None,
            db: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["todo"]).unwrap();
        assert!(cli.command.is_none());
        assert!(matches!(
            cli.command.unwrap_or_default(),
            Commands::Serve { host: None, port: None, db: None }
        ));
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["todo", "serve", "--port", "9000", "--db", "/tmp/t.db"])
            .unwrap();
        match cli.command {
            Some(Commands::Serve { host, port, db }) => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
                assert_eq!(db, Some(PathBuf::from("/tmp/t.db")));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_user_subcommand() {
        let cli = Cli::try_parse_from(["todo", "user", "deactivate", "ada"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::User {
                action: user::UserAction::Deactivate { .. },
                db: None
            })
        ));
    }
}

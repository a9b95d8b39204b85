//! `todo user`: account administration from the server host.

use std::path::PathBuf;

use clap::Subcommand;

use crate::error::Result;
use crate::operations::accounts;
use crate::storage::{self, config};

#[derive(Subcommand)]
pub enum UserAction {
    /// Allow an account to log in again
    Activate { username: String },
    /// Block an account; its tokens stop working immediately
    Deactivate { username: String },
}

pub fn execute(action: UserAction, db: Option<PathBuf>) -> Result<()> {
    let db_path = match db {
        Some(path) => path,
        None => config::load_config()?.database.resolved_path(),
    };
    let db = storage::open_database(&db_path)?;
    let conn = storage::lock(&db)?;

    let (username, active) = match action {
        UserAction::Activate { username } => (username, true),
        UserAction::Deactivate { username } => (username, false),
    };
    let user = accounts::set_active(&conn, &username, active)?;
    println!(
        "{} is now {}",
        user.username,
        if user.is_active { "active" } else { "inactive" }
    );
    Ok(())
}

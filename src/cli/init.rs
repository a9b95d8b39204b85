//! `todo init`: write a default config and create the database schema.

use std::path::Path;

use crate::error::Result;
use crate::storage::{self, config, config::Config};

/// Outcome of an init run
#[derive(Debug, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Overwritten,
    KeptExisting,
}

/// Initialize against `config_path`, writing `defaults` unless a file
/// already exists (and `force` is not set).
pub fn execute_at(config_path: &Path, force: bool, defaults: &Config) -> Result<InitOutcome> {
    let exists = config_path.exists();
    let outcome = match (exists, force) {
        (true, false) => InitOutcome::KeptExisting,
        (true, true) => InitOutcome::Overwritten,
        (false, _) => InitOutcome::Created,
    };

    let config = if outcome == InitOutcome::KeptExisting {
        config::load_config_from(config_path)?
    } else {
        config::save_config_to(config_path, defaults)?;
        defaults.clone()
    };

    let db_path = config.database.resolved_path();
    storage::open_database(&db_path)?;
    tracing::info!(
        config = %config_path.display(),
        db = %db_path.display(),
        ?outcome,
        "initialized"
    );
    Ok(outcome)
}

pub fn execute(force: bool) -> Result<()> {
    let path = config::config_path();
    match execute_at(&path, force, &Config::default())? {
        InitOutcome::KeptExisting => println!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ),
        _ => println!("Wrote {}", path.display()),
    }
    Ok(())
}

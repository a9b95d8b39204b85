//! `todo serve`

use std::path::PathBuf;

use crate::api::{self, state::AppState};
use crate::error::Result;
use crate::storage::{self, config::Config, tokens};

/// Apply command-line overrides on top of the loaded config.
pub fn apply_overrides(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    db: Option<PathBuf>,
) -> Config {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if db.is_some() {
        config.database.path = db;
    }
    config
}

/// Run the API server until Ctrl+C.
pub async fn execute(host: Option<String>, port: Option<u16>, db: Option<PathBuf>) -> Result<()> {
    let config = apply_overrides(storage::config::load_config()?, host, port, db);
    let db_path = config.database.resolved_path();
    let db = storage::open_database(&db_path)?;

    {
        let conn = storage::lock(&db)?;
        let purged = tokens::purge_expired(&conn, chrono::Utc::now())?;
        if purged > 0 {
            tracing::info!(purged, "removed expired tokens");
        }
    }

    tracing::info!(db = %db_path.display(), "using database");
    let host = config.server.host.clone();
    let port = config.server.port;
    api::start_server(AppState::new(db, config), &host, port).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_config() {
        let config = apply_overrides(
            Config::default(),
            Some("0.0.0.0".to_string()),
            Some(9000),
            Some(PathBuf::from("/tmp/tasks.sqlite3")),
        );
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.database.resolved_path(),
            PathBuf::from("/tmp/tasks.sqlite3")
        );
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut base = Config::default();
        base.server.port = 8123;
        let config = apply_overrides(base.clone(), None, None, None);
        assert_eq!(config, base);
    }
}

//! Shared state handed to every handler.

use std::sync::Arc;

use chrono::{FixedOffset, Utc};

use crate::error::Result;
use crate::model::task::utc_offset;
use crate::operations::accounts::AccountPolicy;
use crate::storage::config::Config;
use crate::storage::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Db, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn account_policy(&self) -> AccountPolicy {
        AccountPolicy::from(&self.config.auth)
    }

    /// Offset used for "today" when the caller does not send `utc_offset`.
    pub fn default_offset(&self) -> Result<FixedOffset> {
        utc_offset(self.config.tasks.default_utc_offset_minutes)
    }

    /// Wall clock, as the caller sees it in `offset`.
    pub fn local_now(offset: FixedOffset) -> chrono::DateTime<FixedOffset> {
        Utc::now().with_timezone(&offset)
    }
}

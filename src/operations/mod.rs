//! Business logic layer
//!
//! Handlers translate HTTP into calls on these modules; these modules own
//! validation and call into `storage` with an explicit owner/user id.

pub mod accounts;
pub mod tasks;

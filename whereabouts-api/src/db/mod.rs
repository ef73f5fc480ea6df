//! Database access for whereabouts-api
//!
//! Pool creation and schema live in `whereabouts_common::db`; this module
//! holds the per-table queries.

pub mod attendances;
pub mod offender_events;

pub use whereabouts_common::db::{init_database_pool, init_tables};

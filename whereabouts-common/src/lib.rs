//! # Whereabouts Common Library
//!
//! Shared code for the whereabouts service:
//! - Attendance domain types (absence reasons, periods, event types)
//! - Attendance outcome mapping for the Prison API
//! - Bootstrap configuration loading
//! - Database pool and schema initialisation

pub mod attendance;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;

pub use attendance::{AbsentReason, AbsentSubReason, EventOutcome, EventType, TimePeriod};
pub use error::{Error, Result};

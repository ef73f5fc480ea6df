//! HTTP routes
//!
//! Each submodule owns one resource and exposes a `*_routes()` router that is
//! merged into the application router in `build_router`.

pub mod absence_reasons;
pub mod attendance;
pub mod health;
pub mod locations;
pub mod offender_events;
pub mod statistics;

pub use absence_reasons::absence_reason_routes;
pub use attendance::attendance_routes;
pub use health::health_routes;
pub use locations::location_routes;
pub use offender_events::offender_event_routes;
pub use statistics::statistics_routes;

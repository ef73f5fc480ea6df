//! Business logic between the HTTP handlers and the store/upstream clients

pub mod attendance;
pub mod location_groups;
pub mod statistics;

pub use attendance::AttendanceService;
pub use location_groups::{
    cells_for_group, LocationGroupFilter, LocationGroupService, PropertiesLocationGroupService,
    UpstreamLocationGroupService,
};
pub use statistics::attendance_stats;

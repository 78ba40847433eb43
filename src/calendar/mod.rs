pub mod types;
pub mod model;

pub use types::{
    BreakInterval, BusinessConfig, BusinessHours, DayHours, HolidaySet, Policies, SalonInfo,
    ServiceDefinition,
};
pub use model::{BusinessCalendar, ClosedReason, DayWindow};

pub mod types;
pub mod capacity;
pub mod engine;

pub use types::{new_id, Appointment, AppointmentStatus, BookingStamp, PendingRequest};
pub use engine::{AvailabilityEngine, BookingCandidate};

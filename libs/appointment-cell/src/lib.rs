pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::*;
pub use services::booking::AppointmentBookingService;
pub use services::conflict::{ConflictDetectionService, has_conflict, intervals_overlap};

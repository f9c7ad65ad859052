//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod dose_event_repo;
pub mod medication_repo;
pub mod user_repo;

pub use dose_event_repo::DoseEventRepo;
pub use medication_repo::MedicationRepo;
pub use user_repo::UserRepo;

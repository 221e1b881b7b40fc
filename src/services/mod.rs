//! Thin typed wrappers over the clinic REST backend, one module per
//! viewer role plus authentication. Stateless apart from the underlying
//! [`RestClient`](crate::backend::RestClient); no retries, no caching.
//! Errors propagate as [`FetchError`](crate::error::FetchError) and the
//! caller decides what to show.

pub mod admin;
pub mod auth;
pub mod doctor;
pub mod patient;

pub use admin::AdminService;
pub use auth::{AuthService, LoginCredentials};
pub use doctor::{AssignedPatient, DoctorService};
pub use patient::PatientService;

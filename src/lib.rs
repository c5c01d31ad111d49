pub mod clock;
pub mod config;
pub mod error;
pub mod openapi;
pub mod otp;
pub mod phone;
pub mod routes;
pub mod security;
pub mod sms; // SMS delivery for issued codes
pub mod store; // in-memory challenge store

// Re-export commonly used items for tests / external users
pub use otp::{Confirmation, OtpError, OtpService, VerificationOutcome};
pub use routes::{config, AppState};
pub use security::SecurityHeaders;

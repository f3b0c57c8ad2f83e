//! Throttling-aware retries for control-plane calls
//!
//! Remote listing and mutation APIs reject bursts with rate-limit errors.
//! The executor retries only those, with exponentially growing delays, and
//! lets every other failure through on the first attempt.

pub mod executor;
pub mod policy;

pub use executor::{BackoffError, BackoffExecutor, Throttling};
pub use policy::BackoffPolicy;

//! Common types used across the application.

pub mod days;
pub mod id;

pub use days::Days;
pub use id::*;

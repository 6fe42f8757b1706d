//! Admin login and session checks.

pub mod core;
pub mod handlers;

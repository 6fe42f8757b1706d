//! Static pages: landing, login and admin.

pub mod core;
pub mod handlers;

//! Contract uploads: naming, sidecar metadata, storage and the HTTP glue.

pub mod core;
pub mod handlers;
pub mod metadata;
pub mod naming;

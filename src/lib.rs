//! # contract_vault
//!
//! A small HTTP service for PDF contracts. Uploads are stored on local disk
//! next to a JSON sidecar holding partner details; contracts can be listed,
//! downloaded and deleted. A session login guards the admin page.
//!
//! - [`sys_fileapi`]: stored-name sanitizing, sidecar metadata, the contract
//!   repository and its HTTP handlers
//! - [`sys_auth`]: credential check, in-memory sessions, cookie handling
//! - [`sys_statichost`]: landing, login and admin pages
//! - [`sys_core`]: shared state, routing and the hyper server loop

pub mod config;
pub mod error;
pub mod sys_auth;
pub mod sys_core;
pub mod sys_fileapi;
pub mod sys_statichost;

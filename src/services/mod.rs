//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own queries, validation and access checks. Route handlers
//! stay focused on protocol translation and auth plumbing.

pub mod access;
pub mod auth;
pub mod call;
pub mod dashboard;
pub mod filter;
pub mod message;
pub mod module;
pub mod organization;
pub mod profile;
pub mod record;
pub mod session;
pub mod task;
pub mod ticket;

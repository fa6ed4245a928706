//! # warden_core
//!
//! Core domain logic for Warden: signed access tokens, role and permission
//! checks, cache-backed session revocation, and outbound client-credentials
//! token management.

pub mod auth;
pub mod cache;
pub mod models;
pub mod store;
pub mod upstream;

//! Central module for organizing the application's main API endpoints.
//!
//! This module acts as a top-level container for the API domains proxied to the
//! identity service (profile, dashboard feeds), the gated page contexts and the
//! backend status indicator, excluding core authentication routes which are
//! handled separately.

pub mod dashboard;
pub mod pages;
pub mod status;
pub mod user;

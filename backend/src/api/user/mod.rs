//! Module for user profile and management API endpoints.
//!
//! This module handles functionality related to user information that is distinct
//! from the core authentication process: reading and editing the profile and
//! changing the password.

pub mod handlers;
pub mod routes;

//! Module for background services.
//!
//! This module encapsulates long-running tasks that run alongside the HTTP server,
//! such as monitoring the reachability of the identity service.

pub mod status;

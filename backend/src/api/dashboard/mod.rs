//! Module for the dashboard data API.
//!
//! Dashboard feeds are chart data produced by the identity service; the gateway
//! only forwards them with the caller's token.

pub mod handlers;
pub mod routes;

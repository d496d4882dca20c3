//! Authentication module for managing sessions and access control.
//!
//! This module provides the public interface for authentication-related
//! functionality: the role and permission tables, token decoding, credential
//! storage, the session resolver, the edge gate middleware and the auth endpoints.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod routes;
pub mod service;
pub mod store;
pub mod token;

// Re-exports for convenience
pub use errors::*;
pub use middleware::{evaluate, route_gate, EdgeRole, GateDecision, ROLE_HEADER};
pub use models::*;
pub use routes::*;
pub use service::*;
pub use store::{CredentialStore, KeyValueStore, MemoryStore};

//! Module for the gated page contexts.
//!
//! Rendering happens in the front end. The gateway answers page paths with the
//! context a page needs after the edge gate has admitted the request: the role it
//! resolved and the navigation entries that role may see.

pub mod handlers;
pub mod routes;

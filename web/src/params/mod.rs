//! This module holds typed parameters for various endpoint inputs.
//!
//! By deserializing into typed parameters, inputs are validated (by type)
//! before they reach the domain layer.

pub(crate) mod admin;
pub(crate) mod sse;

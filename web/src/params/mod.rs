//! Typed parameters for endpoint inputs.
//!
//! Query strings are deserialized into these structs before a handler runs,
//! so malformed input is rejected by type instead of inside the handler.

pub(crate) mod event;

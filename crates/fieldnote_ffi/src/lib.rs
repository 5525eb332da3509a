//! Flutter-facing bindings for the fieldnote core.

pub mod api;

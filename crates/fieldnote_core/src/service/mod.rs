//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Maintain store invariants that span several writes: id uniqueness
//!   recovery and orphan tag cleanup.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod id_collision;
pub mod note_service;
pub mod sample_data;
pub mod tag_gc;

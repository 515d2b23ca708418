//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into the operations hosts call:
//!   single-record edits, batch imports and memorial assembly.
//! - Keep hosts (CLI, web layer) decoupled from storage details.

pub mod import_service;
pub mod memorial_service;
pub mod registry_service;

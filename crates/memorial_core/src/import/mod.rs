//! Batch payload handling shared by every import.
//!
//! # Responsibility
//! - Turn uploaded bytes into text (`decode`).
//! - Describe where each field sits on a line (`layout`).
//!
//! The reconciliation itself lives in `service::import_service`.

pub mod decode;
pub mod layout;

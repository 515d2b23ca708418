//! Registry lookups that span more than one table.
//!
//! # Responsibility
//! - Find projects by name, registration id or beneficiary document.
//! - Resolve a person by CPF/CNPJ across beneficiaries and confrontantes.

pub mod registry;

//! Survey domain model.
//!
//! # Responsibility
//! - Define the records the computation core reads: projects, the parties
//!   attached to them, and the boundary vertices.
//! - Own record-level validation run before any persistence write.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Each vertex, beneficiary and confrontante belongs to exactly one project.
//! - A vertex names its confronting party either by reference or as free
//!   text, never both.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod party;
pub mod project;
pub mod vertex;

/// Record-level validation failure, raised before any write.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is blank.
    EmptyField(&'static str),
    /// Tax id is neither `XXX.XXX.XXX-XX` (CPF) nor `XX.XXX.XXX/XXXX-XX` (CNPJ).
    InvalidTaxId(String),
    /// Direction text does not name one of the four parcel sides.
    InvalidDirection(String),
    /// Measured quantity is negative or not finite.
    InvalidMeasure { field: &'static str, value: f64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "field `{field}` cannot be empty"),
            Self::InvalidTaxId(value) => write!(
                f,
                "invalid tax id `{value}`; expected CPF (XXX.XXX.XXX-XX) or CNPJ (XX.XXX.XXX/XXXX-XX)"
            ),
            Self::InvalidDirection(value) => write!(
                f,
                "invalid direction `{value}`; expected Frente, Fundos, Direita or Esquerda"
            ),
            Self::InvalidMeasure { field, value } => {
                write!(f, "field `{field}` must be a non-negative number, got {value}")
            }
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn require_measure(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::InvalidMeasure { field, value });
    }
    Ok(())
}

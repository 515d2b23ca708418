//! Survey project record.
//!
//! # Invariants
//! - `area_m2` and `perimeter_m` are declared values entered by the surveyor;
//!   the core restates them and never overwrites them with computed ones.

use super::{require_measure, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable project identifier.
pub type ProjectId = Uuid;

/// One surveyed parcel and the metadata printed on its memorial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Municipal property registration (inscrição imobiliária).
    pub registration: Option<String>,
    pub address: String,
    /// Declared total area in square meters.
    pub area_m2: f64,
    /// Declared total perimeter in meters.
    pub perimeter_m: f64,
    /// Free-form measurement period, e.g. `Março de 2025`.
    pub measurement_epoch: String,
    /// Instrument used in the field, e.g. `GNSS ComNav T30`.
    pub instrument: String,
}

impl Project {
    /// Creates a project with a generated id and empty metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a project with a caller-provided id.
    pub fn with_id(id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            registration: None,
            address: String::new(),
            area_m2: 0.0,
            perimeter_m: 0.0,
            measurement_epoch: String::new(),
            instrument: String::new(),
        }
    }

    /// Returns the registration id when it carries any non-blank text.
    pub fn registration_text(&self) -> Option<&str> {
        self.registration
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")?;
        require_measure(self.area_m2, "area_m2")?;
        require_measure(self.perimeter_m, "perimeter_m")?;
        Ok(())
    }
}

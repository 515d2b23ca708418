//! Boundary vertex record.
//!
//! # Invariants
//! - A project's vertices form a ring ordered by `sequence`; the edge of
//!   vertex `i` runs to vertex `(i + 1) mod N`.
//! - UTM coordinates, when present, are authoritative for azimuths; the
//!   latitude/longitude text is descriptive.
//! - `confronting` is exactly one of reference or free text.

use super::party::ConfrontanteId;
use super::project::ProjectId;
use super::{require_measure, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable vertex identifier.
pub type VertexId = Uuid;

/// Text stored for vertices created by import before anyone names the
/// neighbor.
pub const PLACEHOLDER_PARTY_TEXT: &str = "A preencher";

/// Who borders the edge leaving a vertex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConfrontingParty {
    /// A registered confrontante of the same project.
    Reference(ConfrontanteId),
    /// A name that is not a registered party (a street, a river, "APP").
    FreeText(String),
}

impl Default for ConfrontingParty {
    fn default() -> Self {
        Self::FreeText(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub project_id: ProjectId,
    /// Ring position, assigned by storage on insert.
    pub sequence: i64,
    /// Label of this vertex, e.g. `V01`.
    pub from_label: String,
    /// Label of the next vertex as entered, e.g. `V02`.
    pub to_label: String,
    /// Latitude as entered (DMS such as `27°27'16.418" S` or decimal).
    pub latitude: Option<String>,
    /// Longitude as entered.
    pub longitude: Option<String>,
    pub utm_n: Option<f64>,
    pub utm_e: Option<f64>,
    /// Length in meters of the edge leaving this vertex.
    pub distance_m: f64,
    pub confronting: ConfrontingParty,
}

impl Vertex {
    /// Creates an unsequenced vertex with no coordinates.
    pub fn new(
        project_id: ProjectId,
        from_label: impl Into<String>,
        to_label: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            sequence: 0,
            from_label: from_label.into(),
            to_label: to_label.into(),
            latitude: None,
            longitude: None,
            utm_n: None,
            utm_e: None,
            distance_m: 0.0,
            confronting: ConfrontingParty::default(),
        }
    }

    /// Points the edge at a registered confrontante, clearing any free text.
    pub fn set_confrontante(&mut self, confrontante_id: ConfrontanteId) {
        self.confronting = ConfrontingParty::Reference(confrontante_id);
    }

    /// Names the edge's neighbor as free text, clearing any reference.
    pub fn set_confronting_text(&mut self, text: impl Into<String>) {
        self.confronting = ConfrontingParty::FreeText(text.into());
    }

    /// Planar position as `(easting, northing)` when both are known.
    pub fn utm(&self) -> Option<(f64, f64)> {
        match (self.utm_e, self.utm_n) {
            (Some(easting), Some(northing)) => Some((easting, northing)),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.from_label, "from_label")?;
        require_measure(self.distance_m, "distance_m")?;
        for (value, field) in [(self.utm_n, "utm_n"), (self.utm_e, "utm_e")] {
            if let Some(coordinate) = value {
                if !coordinate.is_finite() {
                    return Err(ValidationError::InvalidMeasure {
                        field,
                        value: coordinate,
                    });
                }
            }
        }
        Ok(())
    }
}

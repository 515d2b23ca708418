//! Parties attached to a project: beneficiaries and confrontantes.
//!
//! # Responsibility
//! - Define claimant (`Beneficiario`) and neighbor (`Confrontante`) records.
//! - Validate and classify Brazilian tax ids (CPF/CNPJ).
//!
//! # Invariants
//! - Persisted tax ids always match the masked CPF or CNPJ format.
//! - Classification only looks at digit count, so it also works on legacy
//!   rows that predate validation.

use super::project::ProjectId;
use super::{require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static MASKED_TAX_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{3}\.\d{3}\.\d{3}-\d{2}$|^\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}$")
        .expect("valid tax id regex")
});

const CPF_DIGITS: usize = 11;
const CNPJ_DIGITS: usize = 14;

pub type BeneficiarioId = Uuid;
pub type ConfrontanteId = Uuid;

/// Kind of a Brazilian tax id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxIdKind {
    /// Individual (11 digits).
    Cpf,
    /// Legal entity (14 digits).
    Cnpj,
}

impl TaxIdKind {
    /// Label printed before the id in documents.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpf => "CPF",
            Self::Cnpj => "CNPJ",
        }
    }
}

/// Strips every non-digit character.
pub fn tax_id_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Classifies a tax id by digit count alone: 11 is CPF, 14 is CNPJ.
pub fn classify_tax_id(raw: &str) -> Option<TaxIdKind> {
    match tax_id_digits(raw).len() {
        CPF_DIGITS => Some(TaxIdKind::Cpf),
        CNPJ_DIGITS => Some(TaxIdKind::Cnpj),
        _ => None,
    }
}

/// Checks the masked format and returns the id kind.
pub fn validate_tax_id(raw: &str) -> Result<TaxIdKind, ValidationError> {
    let trimmed = raw.trim();
    if !MASKED_TAX_ID_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidTaxId(trimmed.to_string()));
    }
    classify_tax_id(trimmed).ok_or_else(|| ValidationError::InvalidTaxId(trimmed.to_string()))
}

/// Side of the parcel a confrontante borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Right,
    Left,
    Front,
    Back,
}

impl Direction {
    /// Parses the Portuguese side names, case-insensitively.
    ///
    /// Both gendered forms are accepted (`Direita`/`Direito`,
    /// `Esquerda`/`Esquerdo`) since field spreadsheets use either.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        match text.trim().to_lowercase().as_str() {
            "direita" | "direito" => Ok(Self::Right),
            "esquerda" | "esquerdo" => Ok(Self::Left),
            "frente" => Ok(Self::Front),
            "fundos" | "fundo" => Ok(Self::Back),
            _ => Err(ValidationError::InvalidDirection(text.trim().to_string())),
        }
    }

    pub fn label_pt(self) -> &'static str {
        match self {
            Self::Right => "Direita",
            Self::Left => "Esquerda",
            Self::Front => "Frente",
            Self::Back => "Fundos",
        }
    }
}

/// Postal address shared by both party kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
}

/// Claimant on whose behalf the memorial is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beneficiario {
    pub id: BeneficiarioId,
    pub project_id: ProjectId,
    pub name: String,
    pub tax_id: String,
    pub address: Address,
}

impl Beneficiario {
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        tax_id: impl Into<String>,
        address: Address,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            tax_id: tax_id.into(),
            address,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")?;
        validate_tax_id(&self.tax_id)?;
        Ok(())
    }
}

/// Owner of a neighboring parcel along one or more boundary edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confrontante {
    pub id: ConfrontanteId,
    pub project_id: ProjectId,
    pub name: String,
    pub tax_id: String,
    pub direction: Direction,
    pub address: Address,
    /// Leaves this party out of the memorial's signature block.
    pub excluded_from_document: bool,
}

impl Confrontante {
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        tax_id: impl Into<String>,
        direction: Direction,
        address: Address,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            tax_id: tax_id.into(),
            direction,
            address,
            excluded_from_document: false,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")?;
        validate_tax_id(&self.tax_id)?;
        Ok(())
    }
}

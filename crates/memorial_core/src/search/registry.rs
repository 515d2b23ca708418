//! Project search and person-by-document lookup.
//!
//! # Invariants
//! - Document matching compares digits only; the mask never matters.
//! - Result ordering is deterministic by name, then id.

use crate::db::DbError;
use crate::model::party::Address;
use crate::model::project::ProjectId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// Document lookup got nothing but punctuation or blanks.
    EmptyDocument,
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDocument => write!(f, "document number is empty"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::EmptyDocument | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Options for [`search_projects`].
#[derive(Debug, Clone)]
pub struct ProjectSearchQuery {
    pub text: String,
    /// Maximum number of hits for non-blank queries.
    pub limit: u32,
}

impl ProjectSearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectHit {
    pub project_id: ProjectId,
    pub name: String,
    pub registration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyKind {
    Beneficiario,
    Confrontante,
}

/// Person found by [`find_party_by_tax_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyHit {
    pub kind: PartyKind,
    pub project_id: ProjectId,
    pub name: String,
    pub tax_id: String,
    pub address: Address,
}

/// Searches projects by name, registration id or beneficiary document.
///
/// A blank query lists projects by name. Otherwise a project matches when its
/// name contains the text (ASCII case-insensitive), its registration id
/// contains the text, or, when the text is a document number (digits once
/// `.`, `-` and `/` are removed), one of its beneficiaries has a tax id
/// containing that number. Both forms stop at `query.limit` hits.
pub fn search_projects(
    conn: &Connection,
    query: &ProjectSearchQuery,
) -> SearchResult<Vec<ProjectHit>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let text = query.text.trim();
    if text.is_empty() {
        let mut stmt = conn.prepare(
            "SELECT uuid, name, registration
             FROM projects
             ORDER BY name COLLATE NOCASE ASC, uuid ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([i64::from(query.limit)])?;
        let mut hits = Vec::new();
        while let Some(row) = rows.next()? {
            hits.push(parse_project_hit(row)?);
        }
        return Ok(hits);
    }

    let pattern = format!("%{}%", escape_like(text));
    let document = strip_document_mask(text);
    let digits = if is_document_number(&document) {
        document
    } else {
        String::new()
    };
    let digits_pattern = format!("%{digits}%");

    let mut stmt = conn.prepare(
        "SELECT DISTINCT p.uuid AS uuid, p.name AS name, p.registration AS registration
         FROM projects p
         WHERE p.name LIKE ?1 ESCAPE '\\'
            OR COALESCE(p.registration, '') LIKE ?1 ESCAPE '\\'
            OR (?2 <> '' AND EXISTS(
                SELECT 1
                FROM beneficiarios b
                WHERE b.project_uuid = p.uuid
                  AND b.tax_id_digits LIKE ?3
            ))
         ORDER BY p.name COLLATE NOCASE ASC, p.uuid ASC
         LIMIT ?4;",
    )?;
    let mut rows = stmt.query(params![
        pattern,
        digits,
        digits_pattern,
        i64::from(query.limit)
    ])?;
    let mut hits = Vec::new();
    while let Some(row) = rows.next()? {
        hits.push(parse_project_hit(row)?);
    }
    Ok(hits)
}

/// Finds a person by CPF/CNPJ, beneficiaries first, then confrontantes.
///
/// The mask is stripped and the rest matched as a substring of the stored
/// digits, so a partial number finds the first party containing it.
pub fn find_party_by_tax_id(conn: &Connection, document: &str) -> SearchResult<Option<PartyHit>> {
    let document = strip_document_mask(document);
    if document.is_empty() {
        return Err(SearchError::EmptyDocument);
    }
    let pattern = format!("%{}%", escape_like(&document));

    for (table, kind) in [
        ("beneficiarios", PartyKind::Beneficiario),
        ("confrontantes", PartyKind::Confrontante),
    ] {
        let hit = conn
            .query_row(
                &format!(
                    "SELECT project_uuid, name, tax_id, street, number, district, city
                     FROM {table}
                     WHERE tax_id_digits LIKE ?1 ESCAPE '\\'
                     ORDER BY rowid ASC
                     LIMIT 1;"
                ),
                [pattern.as_str()],
                |row| Ok(parse_party_hit(row, kind)),
            )
            .optional()?
            .transpose()?;
        if hit.is_some() {
            return Ok(hit);
        }
    }
    Ok(None)
}

fn parse_project_hit(row: &Row<'_>) -> SearchResult<ProjectHit> {
    let uuid_text: String = row.get("uuid")?;
    Ok(ProjectHit {
        project_id: parse_uuid(&uuid_text)?,
        name: row.get("name")?,
        registration: row.get("registration")?,
    })
}

fn parse_party_hit(row: &Row<'_>, kind: PartyKind) -> SearchResult<PartyHit> {
    let uuid_text: String = row.get("project_uuid")?;
    Ok(PartyHit {
        kind,
        project_id: parse_uuid(&uuid_text)?,
        name: row.get("name")?,
        tax_id: row.get("tax_id")?,
        address: Address {
            street: row.get("street")?,
            number: row.get("number")?,
            district: row.get("district")?,
            city: row.get("city")?,
        },
    })
}

fn parse_uuid(value: &str) -> SearchResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| SearchError::InvalidData(format!("invalid uuid `{value}`")))
}

/// Drops the CPF/CNPJ mask characters and surrounding blanks.
fn strip_document_mask(raw: &str) -> String {
    raw.trim().replace(['.', '-', '/'], "")
}

fn is_document_number(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

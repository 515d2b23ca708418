//! Batch import use-cases.
//!
//! # Responsibility
//! - Reconcile vertex files against stored vertices by `(project, label)`
//!   with create-or-update semantics.
//! - Import beneficiary and confrontante lists, and positional UTM lists.
//!
//! # Invariants
//! - One bad line never aborts a batch: it is counted as errored, recorded
//!   with its line number, and the next line is processed.
//! - For every counted line, exactly one of `updated`, `skipped`, `errored`
//!   is incremented. Blank lines and headers are not counted.
//! - Lines are processed in file order, one lookup and one write each.
//! - Only batch-level problems (missing project, positional line-count
//!   mismatch, failing list query) return `Err`.

use crate::config::ImportConfig;
use crate::geo::coord::{parse_dms_to_decimal, parse_locale_decimal, parse_utm_value, CoordParseError};
use crate::import::decode::{decode_payload, PayloadEncoding};
use crate::import::layout::{ImportLayout, ImportPreset};
use crate::model::party::{Address, Beneficiario, Confrontante, Direction};
use crate::model::project::ProjectId;
use crate::model::vertex::{ConfrontingParty, Vertex, PLACEHOLDER_PARTY_TEXT};
use crate::model::ValidationError;
use crate::repo::party_repo::PartyRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::vertex_repo::VertexRepository;
use crate::repo::{EntityKind, RepoError};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const BENEFICIARIO_COLUMNS: usize = 6;
const CONFRONTANTE_COLUMNS: usize = 7;

/// Create/update policy for one vertex import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub create_missing: bool,
    pub update_existing: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl From<&ImportConfig> for ImportOptions {
    fn from(value: &ImportConfig) -> Self {
        Self {
            create_missing: value.create_missing,
            update_existing: value.update_existing,
        }
    }
}

/// Why one line was counted as errored.
#[derive(Debug)]
pub enum ImportLineError {
    TooFewColumns { expected: usize, found: usize },
    WrongColumnCount { expected: usize, found: usize },
    MissingField(&'static str),
    Parse {
        field: &'static str,
        source: CoordParseError,
    },
    Validation(ValidationError),
    Repo(RepoError),
}

impl ImportLineError {
    /// Stable short code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TooFewColumns { .. } => "too_few_columns",
            Self::WrongColumnCount { .. } => "wrong_column_count",
            Self::MissingField(_) => "missing_field",
            Self::Parse { .. } => "parse",
            Self::Validation(_) => "validation",
            Self::Repo(_) => "repo",
        }
    }
}

impl Display for ImportLineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewColumns { expected, found } => {
                write!(f, "expected at least {expected} columns, found {found}")
            }
            Self::WrongColumnCount { expected, found } => {
                write!(f, "expected exactly {expected} columns, found {found}")
            }
            Self::MissingField(field) => write!(f, "field `{field}` is blank"),
            Self::Parse { field, source } => write!(f, "cannot parse `{field}`: {source}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportLineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ImportLineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ImportLineError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

#[derive(Debug)]
pub struct LineError {
    /// One-based line number in the decoded payload.
    pub line_number: usize,
    pub reason: ImportLineError,
}

/// Result of one batch.
#[derive(Debug)]
pub struct ImportOutcome {
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub line_errors: Vec<LineError>,
    pub encoding: PayloadEncoding,
}

impl ImportOutcome {
    fn new(encoding: PayloadEncoding) -> Self {
        Self {
            updated: 0,
            skipped: 0,
            errored: 0,
            line_errors: Vec::new(),
            encoding,
        }
    }

    /// Number of lines counted in any bucket.
    pub fn total(&self) -> usize {
        self.updated + self.skipped + self.errored
    }

    pub fn summary(&self) -> ImportSummary {
        ImportSummary {
            updated: self.updated,
            skipped: self.skipped,
            errored: self.errored,
        }
    }

    fn record(&mut self, line_number: usize, result: Result<LineAction, ImportLineError>) {
        match result {
            Ok(LineAction::Updated) => self.updated += 1,
            Ok(LineAction::Skipped) => self.skipped += 1,
            Err(reason) => {
                warn!(
                    "event=import_line module=import status=error line={line_number} code={}",
                    reason.code()
                );
                self.errored += 1;
                self.line_errors.push(LineError {
                    line_number,
                    reason,
                });
            }
        }
    }
}

/// The three counters, for user-facing summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl Display for ImportSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "updated={} skipped={} errored={}",
            self.updated, self.skipped, self.errored
        )
    }
}

/// Batch-level failure; nothing was written.
#[derive(Debug)]
pub enum ImportBatchError {
    /// Positional import needs exactly one line per stored vertex.
    LineCountMismatch { lines: usize, vertices: usize },
    Repo(RepoError),
}

impl Display for ImportBatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LineCountMismatch { lines, vertices } => write!(
                f,
                "file has {lines} lines but the project has {vertices} vertices"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportBatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LineCountMismatch { .. } => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ImportBatchError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineAction {
    Updated,
    Skipped,
}

/// Vertex fields read from one line. `None` on an outer `Option` means the
/// layout does not map the field.
#[derive(Debug, Default)]
struct VertexLine {
    from_label: String,
    to_label: Option<String>,
    distance_m: Option<f64>,
    utm_n: Option<Option<f64>>,
    utm_e: Option<Option<f64>>,
    latitude: Option<Option<String>>,
    longitude: Option<Option<String>>,
    confronting: Option<ConfrontingParty>,
}

impl VertexLine {
    fn apply_to(self, vertex: &mut Vertex) {
        if let Some(to_label) = self.to_label {
            vertex.to_label = to_label;
        }
        if let Some(distance) = self.distance_m {
            vertex.distance_m = distance;
        }
        if let Some(northing) = self.utm_n {
            vertex.utm_n = northing;
        }
        if let Some(easting) = self.utm_e {
            vertex.utm_e = easting;
        }
        if let Some(latitude) = self.latitude {
            vertex.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            vertex.longitude = longitude;
        }
        if let Some(confronting) = self.confronting {
            vertex.confronting = confronting;
        }
    }
}

/// Batch import facade over the repositories.
pub struct ImportService<P, Q, V>
where
    P: ProjectRepository,
    Q: PartyRepository,
    V: VertexRepository,
{
    projects: P,
    parties: Q,
    vertices: V,
}

impl<P, Q, V> ImportService<P, Q, V>
where
    P: ProjectRepository,
    Q: PartyRepository,
    V: VertexRepository,
{
    pub fn new(projects: P, parties: Q, vertices: V) -> Self {
        Self {
            projects,
            parties,
            vertices,
        }
    }

    /// Reconciles a vertex file against the project's stored vertices.
    pub fn import_vertices(
        &self,
        project_id: ProjectId,
        payload: &[u8],
        preset: ImportPreset,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ImportBatchError> {
        self.ensure_project(project_id)?;
        let started = Instant::now();
        let layout = preset.layout();
        let decoded = decode_payload(payload);
        info!(
            "event=import_batch module=import status=start kind=vertices preset={preset} encoding={}",
            decoded.encoding
        );

        let mut outcome = ImportOutcome::new(decoded.encoding);
        for (line_number, line) in data_lines(&decoded.text, layout.has_header) {
            let result = self.import_vertex_line(project_id, &layout, line, options);
            outcome.record(line_number, result);
        }

        log_batch_done("vertices", &outcome, started);
        Ok(outcome)
    }

    /// Creates one beneficiary per line: `name, tax_id, street, number,
    /// district, city`, tab-delimited, no header.
    pub fn import_beneficiarios(
        &self,
        project_id: ProjectId,
        payload: &[u8],
    ) -> Result<ImportOutcome, ImportBatchError> {
        self.ensure_project(project_id)?;
        let started = Instant::now();
        let decoded = decode_payload(payload);
        info!(
            "event=import_batch module=import status=start kind=beneficiarios encoding={}",
            decoded.encoding
        );

        let mut outcome = ImportOutcome::new(decoded.encoding);
        for (line_number, line) in data_lines(&decoded.text, false) {
            let result = exact_columns(line, BENEFICIARIO_COLUMNS).and_then(|fields| {
                let beneficiario = Beneficiario::new(
                    project_id,
                    fields[0],
                    fields[1],
                    address_from(&fields[2..6]),
                );
                self.parties.create_beneficiario(&beneficiario)?;
                Ok(LineAction::Updated)
            });
            outcome.record(line_number, result);
        }

        log_batch_done("beneficiarios", &outcome, started);
        Ok(outcome)
    }

    /// Creates one confrontante per line: `name, tax_id, direction, street,
    /// number, district, city`, tab-delimited, no header.
    pub fn import_confrontantes(
        &self,
        project_id: ProjectId,
        payload: &[u8],
    ) -> Result<ImportOutcome, ImportBatchError> {
        self.ensure_project(project_id)?;
        let started = Instant::now();
        let decoded = decode_payload(payload);
        info!(
            "event=import_batch module=import status=start kind=confrontantes encoding={}",
            decoded.encoding
        );

        let mut outcome = ImportOutcome::new(decoded.encoding);
        for (line_number, line) in data_lines(&decoded.text, false) {
            let result = exact_columns(line, CONFRONTANTE_COLUMNS).and_then(|fields| {
                let confrontante = Confrontante::new(
                    project_id,
                    fields[0],
                    fields[1],
                    Direction::parse(fields[2])?,
                    address_from(&fields[3..7]),
                );
                self.parties.create_confrontante(&confrontante)?;
                Ok(LineAction::Updated)
            });
            outcome.record(line_number, result);
        }

        log_batch_done("confrontantes", &outcome, started);
        Ok(outcome)
    }

    /// Fills missing UTM by position: line `i` belongs to the `i`-th vertex
    /// in ring order, and its last two tokens are northing and easting.
    ///
    /// Commas separate tokens like whitespace does. Vertices that already
    /// have both UTM values are skipped. A line count different from the
    /// vertex count rejects the file before any write.
    pub fn import_utm_by_position(
        &self,
        project_id: ProjectId,
        payload: &[u8],
    ) -> Result<ImportOutcome, ImportBatchError> {
        self.ensure_project(project_id)?;
        let started = Instant::now();
        let decoded = decode_payload(payload);
        let lines: Vec<(usize, &str)> = data_lines(&decoded.text, false).collect();
        let vertices = self.vertices.list_vertices(project_id)?;
        if lines.len() != vertices.len() {
            warn!(
                "event=import_batch module=import status=error kind=utm_positional lines={} vertices={}",
                lines.len(),
                vertices.len()
            );
            return Err(ImportBatchError::LineCountMismatch {
                lines: lines.len(),
                vertices: vertices.len(),
            });
        }
        info!(
            "event=import_batch module=import status=start kind=utm_positional encoding={}",
            decoded.encoding
        );

        let mut outcome = ImportOutcome::new(decoded.encoding);
        for ((line_number, line), vertex) in lines.into_iter().zip(vertices) {
            let result = self.import_positional_line(line, vertex);
            outcome.record(line_number, result);
        }

        log_batch_done("utm_positional", &outcome, started);
        Ok(outcome)
    }

    fn ensure_project(&self, project_id: ProjectId) -> Result<(), ImportBatchError> {
        match self.projects.get_project(project_id)? {
            Some(_) => Ok(()),
            None => Err(ImportBatchError::Repo(RepoError::NotFound(
                EntityKind::Project,
                project_id,
            ))),
        }
    }

    fn import_vertex_line(
        &self,
        project_id: ProjectId,
        layout: &ImportLayout,
        line: &str,
        options: ImportOptions,
    ) -> Result<LineAction, ImportLineError> {
        let parsed = self.parse_vertex_line(project_id, layout, line)?;

        match self
            .vertices
            .find_vertex_by_label(project_id, &parsed.from_label)?
        {
            Some(mut existing) => {
                if !options.update_existing {
                    return Ok(LineAction::Skipped);
                }
                parsed.apply_to(&mut existing);
                self.vertices.update_vertex(&existing)?;
                Ok(LineAction::Updated)
            }
            None => {
                if !(options.create_missing && layout.allows_create) {
                    return Ok(LineAction::Skipped);
                }
                let mut vertex = Vertex::new(project_id, parsed.from_label.as_str(), "");
                vertex.set_confronting_text(PLACEHOLDER_PARTY_TEXT);
                parsed.apply_to(&mut vertex);
                self.vertices.create_vertex(&vertex)?;
                Ok(LineAction::Updated)
            }
        }
    }

    /// Parses every mapped field before any lookup, so a malformed line is
    /// errored whether or not its vertex exists.
    fn parse_vertex_line(
        &self,
        project_id: ProjectId,
        layout: &ImportLayout,
        line: &str,
    ) -> Result<VertexLine, ImportLineError> {
        let fields = layout.split(line);
        if fields.len() < layout.min_columns {
            return Err(ImportLineError::TooFewColumns {
                expected: layout.min_columns,
                found: fields.len(),
            });
        }
        let columns = &layout.columns;
        let from_label = layout
            .field(&fields, Some(columns.from_label))
            .ok_or(ImportLineError::MissingField("from_label"))?;

        let mut parsed = VertexLine {
            from_label: from_label.to_string(),
            ..VertexLine::default()
        };
        if columns.to_label.is_some() {
            parsed.to_label = Some(
                layout
                    .field(&fields, columns.to_label)
                    .unwrap_or_default()
                    .to_string(),
            );
        }
        if columns.distance.is_some() {
            let raw = layout.field(&fields, columns.distance).unwrap_or_default();
            parsed.distance_m = Some(parse_locale_decimal(raw).map_err(|source| {
                ImportLineError::Parse {
                    field: "distance",
                    source,
                }
            })?);
        }
        if columns.utm_n.is_some() {
            parsed.utm_n = Some(utm_field(layout.field(&fields, columns.utm_n), "utm_n")?);
        }
        if columns.utm_e.is_some() {
            parsed.utm_e = Some(utm_field(layout.field(&fields, columns.utm_e), "utm_e")?);
        }
        if columns.latitude.is_some() {
            parsed.latitude = Some(geographic_field(
                layout.field(&fields, columns.latitude),
                "latitude",
            )?);
        }
        if columns.longitude.is_some() {
            parsed.longitude = Some(geographic_field(
                layout.field(&fields, columns.longitude),
                "longitude",
            )?);
        }
        if columns.confronting_text.is_some() {
            parsed.confronting = Some(self.resolve_confronting(
                project_id,
                layout.field(&fields, columns.confronting_text),
                layout.field(&fields, columns.tax_id),
            )?);
        }
        Ok(parsed)
    }

    /// A tax id naming a registered confrontante wins over the text.
    fn resolve_confronting(
        &self,
        project_id: ProjectId,
        text: Option<&str>,
        tax_id: Option<&str>,
    ) -> Result<ConfrontingParty, ImportLineError> {
        if let Some(tax_id) = tax_id {
            if let Some(confrontante) = self.parties.find_confrontante_by_tax_id(project_id, tax_id)? {
                return Ok(ConfrontingParty::Reference(confrontante.id));
            }
        }
        Ok(ConfrontingParty::FreeText(
            text.unwrap_or(PLACEHOLDER_PARTY_TEXT).to_string(),
        ))
    }

    fn import_positional_line(
        &self,
        line: &str,
        mut vertex: Vertex,
    ) -> Result<LineAction, ImportLineError> {
        let normalized = line.replace(',', " ");
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(ImportLineError::TooFewColumns {
                expected: 2,
                found: tokens.len(),
            });
        }
        let northing = utm_field(Some(tokens[tokens.len() - 2]), "utm_n")?;
        let easting = utm_field(Some(tokens[tokens.len() - 1]), "utm_e")?;

        if vertex.utm().is_some() {
            return Ok(LineAction::Skipped);
        }
        vertex.utm_n = northing;
        vertex.utm_e = easting;
        self.vertices.update_vertex(&vertex)?;
        Ok(LineAction::Updated)
    }
}

/// Yields `(line_number, trimmed_line)` for non-blank lines, skipping the
/// first non-blank line when the payload has a header.
fn data_lines(text: &str, has_header: bool) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
        .skip(usize::from(has_header))
}

fn exact_columns(line: &str, expected: usize) -> Result<Vec<&str>, ImportLineError> {
    let fields: Vec<&str> = line.trim().split('\t').map(str::trim).collect();
    if fields.len() != expected {
        return Err(ImportLineError::WrongColumnCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn address_from(fields: &[&str]) -> Address {
    Address {
        street: fields[0].to_string(),
        number: fields[1].to_string(),
        district: fields[2].to_string(),
        city: fields[3].to_string(),
    }
}

/// Blank clears the value; anything else must parse.
fn utm_field(raw: Option<&str>, field: &'static str) -> Result<Option<f64>, ImportLineError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    parse_utm_value(raw)
        .map(Some)
        .ok_or_else(|| ImportLineError::Parse {
            field,
            source: CoordParseError::InvalidNumber {
                input: raw.to_string(),
            },
        })
}

/// Keeps coordinate text as written once it is known to parse.
fn geographic_field(
    raw: Option<&str>,
    field: &'static str,
) -> Result<Option<String>, ImportLineError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    parse_dms_to_decimal(raw).map_err(|source| ImportLineError::Parse { field, source })?;
    Ok(Some(raw.to_string()))
}

fn log_batch_done(kind: &str, outcome: &ImportOutcome, started: Instant) {
    info!(
        "event=import_batch module=import status=ok kind={kind} updated={} skipped={} errored={} duration_ms={}",
        outcome.updated,
        outcome.skipped,
        outcome.errored,
        started.elapsed().as_millis()
    );
}

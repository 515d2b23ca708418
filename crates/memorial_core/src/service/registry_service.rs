//! Single-record registry use-cases.
//!
//! # Responsibility
//! - Turn raw form input into validated records and persist them.
//! - Report every failure as a `RegistryError` carrying a user-facing
//!   message.
//!
//! # Invariants
//! - Every call names its project explicitly; there is no selected-project
//!   state.
//! - Parsing and validation finish before any write, so a rejected edit
//!   leaves the stored record unchanged.
//! - On vertex edit, blank UTM fields keep the stored values.

use crate::geo::coord::{parse_dms_to_decimal, parse_locale_decimal, parse_utm_value, CoordParseError};
use crate::model::party::{
    Address, Beneficiario, BeneficiarioId, Confrontante, ConfrontanteId, Direction,
};
use crate::model::project::{Project, ProjectId};
use crate::model::vertex::{ConfrontingParty, Vertex, VertexId};
use crate::model::ValidationError;
use crate::repo::party_repo::PartyRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::vertex_repo::VertexRepository;
use crate::repo::{EntityKind, RepoError};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Failure of one single-record operation.
#[derive(Debug)]
pub enum RegistryError {
    /// A numeric or coordinate field could not be read.
    Parse {
        field: &'static str,
        source: CoordParseError,
    },
    Validation(ValidationError),
    NotFound(EntityKind, Uuid),
    Repo(RepoError),
}

impl RegistryError {
    /// Message suitable for showing to the person who filled the form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse { field, source } => {
                format!("Valor inválido no campo {field}: {source}.")
            }
            Self::Validation(ValidationError::EmptyField(field)) => {
                format!("O campo {field} é obrigatório.")
            }
            Self::Validation(ValidationError::InvalidTaxId(value)) => format!(
                "CPF/CNPJ inválido: {value}. Use XXX.XXX.XXX-XX ou XX.XXX.XXX/XXXX-XX."
            ),
            Self::Validation(ValidationError::InvalidDirection(value)) => format!(
                "Direção inválida: {value}. Use Frente, Fundos, Direita ou Esquerda."
            ),
            Self::Validation(ValidationError::InvalidMeasure { field, .. }) => {
                format!("O campo {field} deve ser um número não negativo.")
            }
            Self::NotFound(kind, _) => {
                let what = match kind {
                    EntityKind::Project => "Projeto",
                    EntityKind::Beneficiario => "Beneficiário",
                    EntityKind::Confrontante => "Confrontante",
                    EntityKind::Vertex => "Vértice",
                };
                format!("{what} não encontrado.")
            }
            Self::Repo(_) => "Não foi possível salvar as alterações.".to_string(),
        }
    }
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse { field, source } => write!(f, "cannot parse `{field}`: {source}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(kind, id) => write!(f, "{kind} not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse { source, .. } => Some(source),
            Self::Validation(err) => Some(err),
            Self::NotFound(..) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for RegistryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(kind, id) => Self::NotFound(kind, id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for RegistryError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Project form fields as typed.
#[derive(Debug, Clone, Default)]
pub struct ProjectInput {
    pub name: String,
    pub registration: String,
    pub address: String,
    /// Declared area, `1.234,56` or `1234.56`.
    pub area: String,
    pub perimeter: String,
    pub measurement_epoch: String,
    pub instrument: String,
}

/// Beneficiario form fields, also the shared part of a confrontante form.
#[derive(Debug, Clone, Default)]
pub struct PartyInput {
    pub name: String,
    pub tax_id: String,
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
}

impl PartyInput {
    fn address(&self) -> Address {
        Address {
            street: self.street.trim().to_string(),
            number: self.number.trim().to_string(),
            district: self.district.trim().to_string(),
            city: self.city.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfrontanteInput {
    pub party: PartyInput,
    /// `Frente`, `Fundos`, `Direita` or `Esquerda`.
    pub direction: String,
}

/// Vertex form fields as typed.
#[derive(Debug, Clone, Default)]
pub struct VertexInput {
    pub from_label: String,
    pub to_label: String,
    /// DMS (`27°27'16.418" S`) or decimal.
    pub latitude: String,
    pub longitude: String,
    pub utm_n: String,
    pub utm_e: String,
    pub distance: String,
    /// Registered neighbor; takes precedence over `confronting_text`.
    pub confrontante: Option<ConfrontanteId>,
    pub confronting_text: String,
}

/// Registry facade over the three repositories.
pub struct RegistryService<P, Q, V>
where
    P: ProjectRepository,
    Q: PartyRepository,
    V: VertexRepository,
{
    projects: P,
    parties: Q,
    vertices: V,
}

impl<P, Q, V> RegistryService<P, Q, V>
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

    pub fn add_project(&self, input: &ProjectInput) -> RegistryResult<Project> {
        let mut project = Project::new(input.name.trim());
        apply_project_input(&mut project, input)?;
        self.projects.create_project(&project)?;
        Ok(project)
    }

    pub fn edit_project(&self, id: ProjectId, input: &ProjectInput) -> RegistryResult<Project> {
        let mut project = self.get_project(id)?;
        project.name = input.name.trim().to_string();
        apply_project_input(&mut project, input)?;
        self.projects.update_project(&project)?;
        Ok(project)
    }

    /// Deletes a project with all of its parties and vertices.
    pub fn delete_project(&self, id: ProjectId) -> RegistryResult<()> {
        self.projects.delete_project(id)?;
        Ok(())
    }

    pub fn get_project(&self, id: ProjectId) -> RegistryResult<Project> {
        self.projects
            .get_project(id)?
            .ok_or(RegistryError::NotFound(EntityKind::Project, id))
    }

    pub fn list_projects(&self) -> RegistryResult<Vec<Project>> {
        Ok(self.projects.list_projects()?)
    }

    pub fn add_beneficiario(
        &self,
        project_id: ProjectId,
        input: &PartyInput,
    ) -> RegistryResult<Beneficiario> {
        let beneficiario = Beneficiario::new(
            project_id,
            input.name.trim(),
            input.tax_id.trim(),
            input.address(),
        );
        self.parties.create_beneficiario(&beneficiario)?;
        Ok(beneficiario)
    }

    pub fn edit_beneficiario(
        &self,
        id: BeneficiarioId,
        input: &PartyInput,
    ) -> RegistryResult<Beneficiario> {
        let mut beneficiario = self
            .parties
            .get_beneficiario(id)?
            .ok_or(RegistryError::NotFound(EntityKind::Beneficiario, id))?;
        beneficiario.name = input.name.trim().to_string();
        beneficiario.tax_id = input.tax_id.trim().to_string();
        beneficiario.address = input.address();
        self.parties.update_beneficiario(&beneficiario)?;
        Ok(beneficiario)
    }

    pub fn delete_beneficiario(&self, id: BeneficiarioId) -> RegistryResult<()> {
        self.parties.delete_beneficiario(id)?;
        Ok(())
    }

    pub fn list_beneficiarios(&self, project_id: ProjectId) -> RegistryResult<Vec<Beneficiario>> {
        Ok(self.parties.list_beneficiarios(project_id)?)
    }

    pub fn add_confrontante(
        &self,
        project_id: ProjectId,
        input: &ConfrontanteInput,
    ) -> RegistryResult<Confrontante> {
        let confrontante = Confrontante::new(
            project_id,
            input.party.name.trim(),
            input.party.tax_id.trim(),
            Direction::parse(&input.direction)?,
            input.party.address(),
        );
        self.parties.create_confrontante(&confrontante)?;
        Ok(confrontante)
    }

    /// Edits a confrontante; the document-exclusion flag is kept.
    pub fn edit_confrontante(
        &self,
        id: ConfrontanteId,
        input: &ConfrontanteInput,
    ) -> RegistryResult<Confrontante> {
        let mut confrontante = self
            .parties
            .get_confrontante(id)?
            .ok_or(RegistryError::NotFound(EntityKind::Confrontante, id))?;
        confrontante.direction = Direction::parse(&input.direction)?;
        confrontante.name = input.party.name.trim().to_string();
        confrontante.tax_id = input.party.tax_id.trim().to_string();
        confrontante.address = input.party.address();
        self.parties.update_confrontante(&confrontante)?;
        Ok(confrontante)
    }

    /// Deletes a confrontante; vertices that referenced it keep its name as
    /// free text. Returns how many vertices were rewritten.
    pub fn delete_confrontante(&self, id: ConfrontanteId) -> RegistryResult<usize> {
        let detached = self.parties.delete_confrontante(id)?;
        info!(
            "event=confrontante_delete module=registry status=ok detached_vertices={detached}"
        );
        Ok(detached)
    }

    pub fn list_confrontantes(&self, project_id: ProjectId) -> RegistryResult<Vec<Confrontante>> {
        Ok(self.parties.list_confrontantes(project_id)?)
    }

    /// Leaves exactly `excluded` out of the document for this project.
    pub fn set_document_exclusions(
        &self,
        project_id: ProjectId,
        excluded: &[ConfrontanteId],
    ) -> RegistryResult<()> {
        self.parties.set_document_exclusions(project_id, excluded)?;
        Ok(())
    }

    /// Appends a vertex to the end of the project's ring.
    pub fn add_vertex(&self, project_id: ProjectId, input: &VertexInput) -> RegistryResult<Vertex> {
        let mut vertex = Vertex::new(project_id, input.from_label.trim(), input.to_label.trim());
        apply_vertex_input(&mut vertex, input)?;
        Ok(self.vertices.create_vertex(&vertex)?)
    }

    pub fn edit_vertex(&self, id: VertexId, input: &VertexInput) -> RegistryResult<Vertex> {
        let mut vertex = self
            .vertices
            .get_vertex(id)?
            .ok_or(RegistryError::NotFound(EntityKind::Vertex, id))?;
        vertex.from_label = input.from_label.trim().to_string();
        vertex.to_label = input.to_label.trim().to_string();
        apply_vertex_input(&mut vertex, input)?;
        self.vertices.update_vertex(&vertex)?;
        Ok(vertex)
    }

    pub fn delete_vertex(&self, id: VertexId) -> RegistryResult<()> {
        self.vertices.delete_vertex(id)?;
        Ok(())
    }

    pub fn list_vertices(&self, project_id: ProjectId) -> RegistryResult<Vec<Vertex>> {
        Ok(self.vertices.list_vertices(project_id)?)
    }
}

fn apply_project_input(project: &mut Project, input: &ProjectInput) -> RegistryResult<()> {
    project.registration = Some(input.registration.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    project.address = input.address.trim().to_string();
    project.area_m2 = parse_field(&input.area, "area")?;
    project.perimeter_m = parse_field(&input.perimeter, "perimeter")?;
    project.measurement_epoch = input.measurement_epoch.trim().to_string();
    project.instrument = input.instrument.trim().to_string();
    project.validate()?;
    Ok(())
}

fn apply_vertex_input(vertex: &mut Vertex, input: &VertexInput) -> RegistryResult<()> {
    vertex.latitude = parse_geographic(&input.latitude, "latitude")?;
    vertex.longitude = parse_geographic(&input.longitude, "longitude")?;
    if let Some(northing) = parse_utm(&input.utm_n, "utm_n")? {
        vertex.utm_n = Some(northing);
    }
    if let Some(easting) = parse_utm(&input.utm_e, "utm_e")? {
        vertex.utm_e = Some(easting);
    }
    vertex.distance_m = parse_field(&input.distance, "distance")?;
    vertex.confronting = match input.confrontante {
        Some(id) => ConfrontingParty::Reference(id),
        None => ConfrontingParty::FreeText(input.confronting_text.trim().to_string()),
    };
    vertex.validate()?;
    Ok(())
}

fn parse_field(value: &str, field: &'static str) -> RegistryResult<f64> {
    parse_locale_decimal(value).map_err(|source| RegistryError::Parse { field, source })
}

/// Checks that geographic text parses and keeps it as entered.
fn parse_geographic(value: &str, field: &'static str) -> RegistryResult<Option<String>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    parse_dms_to_decimal(value).map_err(|source| RegistryError::Parse { field, source })?;
    Ok(Some(value.to_string()))
}

/// Blank means "no new value"; anything else must parse.
fn parse_utm(value: &str, field: &'static str) -> RegistryResult<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    parse_utm_value(value)
        .map(Some)
        .ok_or_else(|| RegistryError::Parse {
            field,
            source: CoordParseError::InvalidNumber {
                input: value.to_string(),
            },
        })
}

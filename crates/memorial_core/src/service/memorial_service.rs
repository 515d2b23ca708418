//! Boundary assembly and memorial document use-cases.
//!
//! # Responsibility
//! - Walk a project's vertex ring and derive one edge per vertex: azimuth,
//!   distance and the confronting party.
//! - Render the boundary table and the perimeter narrative in pt-BR
//!   conventions.
//! - Gather everything a memorial page shows into one serializable value;
//!   typesetting happens elsewhere.
//!
//! # Invariants
//! - The edge leaving vertex `i` arrives at vertex `(i + 1) mod N`; the last
//!   edge is flagged `closes_ring` and arrives at vertex 0.
//! - Fewer than three vertices is reported through `Narrative::Insufficient`,
//!   never as an error.
//! - The narrative restates the declared perimeter and area. `ClosureReport`
//!   compares them with computed values but never changes the text.

use crate::config::MemorialConfig;
use crate::geo::azimuth::{azimuth_geographic_text, azimuth_planar, format_azimuth_dms};
use crate::geo::locale::{format_br_coord, format_br_measure, format_long_date_pt};
use crate::model::party::{classify_tax_id, Beneficiario, Confrontante, TaxIdKind};
use crate::model::project::{Project, ProjectId};
use crate::model::vertex::{ConfrontingParty, Vertex, PLACEHOLDER_PARTY_TEXT};
use crate::repo::party_repo::PartyRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::vertex_repo::VertexRepository;
use crate::repo::{EntityKind, RepoError, RepoResult};
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

/// Minimum ring size that describes a polygon.
pub const MIN_RING_VERTICES: usize = 3;

pub const INSUFFICIENT_VERTICES_TEXT: &str =
    "Não há vértices suficientes para gerar a descrição perimétrica.";

pub const TABLE_HEADER: [&str; 5] = [
    "VÉRTICE",
    "LATITUDE",
    "LONGITUDE",
    "DIST.(m)",
    "CONFRONTANTE",
];

const DOCUMENT_TITLE: &str = "MEMORIAL DESCRITIVO";
const UNKNOWN_CITY: &str = "Cidade não especificada";
const PERIMETER_TOLERANCE_M: f64 = 0.05;
const AREA_TOLERANCE_M2: f64 = 1.0;

/// Datum and projection wording, plus the DMS rounding mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeOptions {
    pub datum: String,
    pub central_meridian: String,
    pub legacy_dms_rounding: bool,
}

impl Default for DescribeOptions {
    fn default() -> Self {
        Self::from(&MemorialConfig::default())
    }
}

impl From<&MemorialConfig> for DescribeOptions {
    fn from(value: &MemorialConfig) -> Self {
        Self {
            datum: value.datum.clone(),
            central_meridian: value.central_meridian.clone(),
            legacy_dms_rounding: value.legacy_dms_rounding,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundaryRow {
    pub vertex: String,
    pub latitude: String,
    pub longitude: String,
    pub distance: String,
    pub confrontante: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundaryTable {
    pub header: [&'static str; 5],
    pub rows: Vec<BoundaryRow>,
}

/// Where an edge's azimuth came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AzimuthSource {
    /// UTM coordinates of both endpoints.
    Planar,
    /// Spherical bearing; one endpoint lacks UTM.
    Geographic,
    /// Neither coordinate pair is usable at both endpoints.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedTaxId {
    pub kind: TaxIdKind,
    pub value: String,
}

/// One side of the boundary polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryEdge {
    pub from_label: String,
    /// From-label of the vertex the edge arrives at.
    pub to_label: String,
    pub azimuth_degrees: Option<f64>,
    pub azimuth_text: String,
    pub azimuth_source: AzimuthSource,
    pub distance_m: f64,
    pub party: String,
    pub tax_id: Option<ClassifiedTaxId>,
    pub closes_ring: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Narrative {
    Insufficient(String),
    Described(String),
}

impl Narrative {
    pub fn text(&self) -> &str {
        match self {
            Self::Insufficient(text) | Self::Described(text) => text,
        }
    }

    pub fn is_described(&self) -> bool {
        matches!(self, Self::Described(_))
    }
}

/// Declared versus computed perimeter and area.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosureReport {
    pub declared_perimeter_m: f64,
    /// Sum of the stored edge distances.
    pub computed_perimeter_m: f64,
    pub declared_area_m2: f64,
    /// Shoelace area over UTM; `None` when any vertex lacks UTM or the ring
    /// is too short.
    pub computed_area_m2: Option<f64>,
}

impl ClosureReport {
    pub fn perimeter_difference_m(&self) -> f64 {
        self.computed_perimeter_m - self.declared_perimeter_m
    }

    pub fn area_difference_m2(&self) -> Option<f64> {
        self.computed_area_m2
            .map(|computed| computed - self.declared_area_m2)
    }

    pub fn is_consistent(&self) -> bool {
        let perimeter_ok = self.perimeter_difference_m().abs() <= PERIMETER_TOLERANCE_M;
        let area_ok = self
            .area_difference_m2()
            .map_or(true, |difference| difference.abs() <= AREA_TOLERANCE_M2);
        perimeter_ok && area_ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryDescription {
    pub edges: Vec<BoundaryEdge>,
    pub narrative: Narrative,
    pub closure: ClosureReport,
}

/// One row per vertex, in ring order.
pub fn build_boundary_table(vertices: &[Vertex], confrontantes: &[Confrontante]) -> BoundaryTable {
    let rows = vertices
        .iter()
        .map(|vertex| BoundaryRow {
            vertex: vertex.from_label.clone(),
            latitude: vertex.latitude.clone().unwrap_or_default(),
            longitude: vertex
                .longitude
                .as_deref()
                .map(|value| value.replace('O', "W"))
                .unwrap_or_default(),
            distance: format_br_measure(vertex.distance_m),
            confrontante: resolve_party(&vertex.confronting, confrontantes).0,
        })
        .collect();

    BoundaryTable {
        header: TABLE_HEADER,
        rows,
    }
}

/// Derives the ring's edges, the narrative and the closure report.
///
/// `vertices` must already be in ring order.
pub fn describe_boundary(
    project: &Project,
    vertices: &[Vertex],
    confrontantes: &[Confrontante],
    options: &DescribeOptions,
) -> BoundaryDescription {
    let closure = closure_report(project, vertices);
    if vertices.len() < MIN_RING_VERTICES {
        return BoundaryDescription {
            edges: Vec::new(),
            narrative: Narrative::Insufficient(INSUFFICIENT_VERTICES_TEXT.to_string()),
            closure,
        };
    }

    let edges = build_edges(vertices, confrontantes, options.legacy_dms_rounding);
    let narrative = Narrative::Described(render_narrative(project, vertices, &edges, options));
    BoundaryDescription {
        edges,
        narrative,
        closure,
    }
}

fn build_edges(
    vertices: &[Vertex],
    confrontantes: &[Confrontante],
    legacy_rounding: bool,
) -> Vec<BoundaryEdge> {
    let count = vertices.len();
    (0..count)
        .map(|index| {
            let from = &vertices[index];
            let to = &vertices[(index + 1) % count];
            let (azimuth_degrees, azimuth_source) = edge_azimuth(from, to);
            let (party, tax_id) = resolve_party(&from.confronting, confrontantes);
            BoundaryEdge {
                from_label: from.from_label.clone(),
                to_label: to.from_label.clone(),
                azimuth_degrees,
                azimuth_text: azimuth_degrees
                    .map(|azimuth| format_azimuth_dms(azimuth, legacy_rounding))
                    .unwrap_or_default(),
                azimuth_source,
                distance_m: from.distance_m,
                party,
                tax_id,
                closes_ring: index + 1 == count,
            }
        })
        .collect()
}

fn edge_azimuth(from: &Vertex, to: &Vertex) -> (Option<f64>, AzimuthSource) {
    if let (Some((e1, n1)), Some((e2, n2))) = (from.utm(), to.utm()) {
        return (Some(azimuth_planar(e1, n1, e2, n2)), AzimuthSource::Planar);
    }

    let geographic = match (
        from.latitude.as_deref(),
        from.longitude.as_deref(),
        to.latitude.as_deref(),
        to.longitude.as_deref(),
    ) {
        (Some(lat1), Some(lon1), Some(lat2), Some(lon2)) => {
            azimuth_geographic_text(lat1, lon1, lat2, lon2).ok()
        }
        _ => None,
    };
    match geographic {
        Some(azimuth) => (Some(azimuth), AzimuthSource::Geographic),
        None => (None, AzimuthSource::Unavailable),
    }
}

fn resolve_party(
    party: &ConfrontingParty,
    confrontantes: &[Confrontante],
) -> (String, Option<ClassifiedTaxId>) {
    match party {
        ConfrontingParty::Reference(id) => {
            match confrontantes.iter().find(|candidate| candidate.id == *id) {
                Some(confrontante) => {
                    let tax_id = classify_tax_id(&confrontante.tax_id).map(|kind| ClassifiedTaxId {
                        kind,
                        value: confrontante.tax_id.trim().to_string(),
                    });
                    (confrontante.name.clone(), tax_id)
                }
                None => (PLACEHOLDER_PARTY_TEXT.to_string(), None),
            }
        }
        ConfrontingParty::FreeText(text) if text.trim().is_empty() => {
            (PLACEHOLDER_PARTY_TEXT.to_string(), None)
        }
        ConfrontingParty::FreeText(text) => (text.trim().to_string(), None),
    }
}

fn render_narrative(
    project: &Project,
    vertices: &[Vertex],
    edges: &[BoundaryEdge],
    options: &DescribeOptions,
) -> String {
    let start = &vertices[0];
    let mut text = format!(
        "Inicia-se a descrição deste perímetro no vértice {}, de coordenadas N {}m e E {}m; ",
        start.from_label,
        format_br_coord(start.utm_n),
        format_br_coord(start.utm_e),
    );

    for (index, edge) in edges.iter().enumerate() {
        text.push_str("deste segue confrontando com ");
        text.push_str(&edge.party);
        if let Some(tax_id) = &edge.tax_id {
            text.push_str(&format!(", {}: {}", tax_id.kind.label(), tax_id.value));
        }
        match edge.azimuth_degrees {
            Some(_) => text.push_str(&format!(", com azimute de {}", edge.azimuth_text)),
            None => text.push_str(", com azimute não calculado"),
        }
        text.push_str(&format!(
            " e distância de {}m, ",
            format_br_measure(edge.distance_m)
        ));

        if edge.closes_ring {
            text.push_str(&format!(
                "até o vértice {}, de coordenadas N {}m e E {}m, ponto inicial da descrição deste perímetro. ",
                start.from_label,
                format_br_coord(start.utm_n),
                format_br_coord(start.utm_e),
            ));
        } else {
            let arrival = &vertices[index + 1];
            text.push_str(&format!(
                "até o vértice {}, de coordenadas N {}m e E {}m; ",
                arrival.from_label,
                format_br_coord(arrival.utm_n),
                format_br_coord(arrival.utm_e),
            ));
        }
    }

    text.push_str(&format!(
        "Todas as coordenadas aqui descritas estão georreferenciadas ao Sistema Geodésico \
         Brasileiro e encontram-se representadas no Sistema UTM, referenciadas ao Meridiano \
         Central {}, tendo como Datum o {}. Todos os azimutes e distâncias, área e perímetro \
         foram calculados no plano de projeção UTM. Encerrado o perímetro total de {} m e \
         área de {} m².",
        options.central_meridian,
        options.datum,
        format_br_measure(project.perimeter_m),
        format_br_measure(project.area_m2),
    ));
    text
}

fn closure_report(project: &Project, vertices: &[Vertex]) -> ClosureReport {
    ClosureReport {
        declared_perimeter_m: project.perimeter_m,
        computed_perimeter_m: vertices.iter().map(|vertex| vertex.distance_m).sum(),
        declared_area_m2: project.area_m2,
        computed_area_m2: shoelace_area(vertices),
    }
}

fn shoelace_area(vertices: &[Vertex]) -> Option<f64> {
    if vertices.len() < MIN_RING_VERTICES {
        return None;
    }
    let points = vertices
        .iter()
        .map(Vertex::utm)
        .collect::<Option<Vec<_>>>()?;
    let twice_area: f64 = (0..points.len())
        .map(|index| {
            let (e1, n1) = points[index];
            let (e2, n2) = points[(index + 1) % points.len()];
            e1 * n2 - e2 * n1
        })
        .sum();
    Some(twice_area.abs() / 2.0)
}

/// Name and document of a person listed on the memorial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentParty {
    pub name: String,
    pub tax_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureRole {
    Requerente,
    Confrontante,
}

impl SignatureRole {
    pub fn label(self) -> &'static str {
        match self {
            Self::Requerente => "Requerente",
            Self::Confrontante => "Confrontante",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub role: SignatureRole,
    pub party: DocumentParty,
}

/// Everything a memorial page shows, pre-formatted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemorialDocument {
    pub title: String,
    pub project_name: String,
    pub beneficiaries: Vec<DocumentParty>,
    pub location: String,
    pub area: String,
    pub perimeter: String,
    pub measurement_epoch: String,
    pub instrument: String,
    pub geodetic_system: String,
    pub projection: String,
    pub table: BoundaryTable,
    pub edges: Vec<BoundaryEdge>,
    pub narrative: Narrative,
    pub closure: ClosureReport,
    pub place_and_date: String,
    pub signatures: Vec<Signature>,
}

/// Memorial assembly facade over the repositories.
pub struct MemorialService<P, Q, V>
where
    P: ProjectRepository,
    Q: PartyRepository,
    V: VertexRepository,
{
    projects: P,
    parties: Q,
    vertices: V,
    options: DescribeOptions,
}

impl<P, Q, V> MemorialService<P, Q, V>
where
    P: ProjectRepository,
    Q: PartyRepository,
    V: VertexRepository,
{
    pub fn new(projects: P, parties: Q, vertices: V, options: DescribeOptions) -> Self {
        Self {
            projects,
            parties,
            vertices,
            options,
        }
    }

    /// Describes a stored project's boundary.
    pub fn describe(&self, project_id: ProjectId) -> RepoResult<BoundaryDescription> {
        let project = self.load_project(project_id)?;
        let vertices = self.vertices.list_vertices(project_id)?;
        let confrontantes = self.parties.list_confrontantes(project_id)?;
        Ok(describe_boundary(
            &project,
            &vertices,
            &confrontantes,
            &self.options,
        ))
    }

    /// Assembles the full memorial for `project_id`, dated `date`.
    pub fn assemble(&self, project_id: ProjectId, date: NaiveDate) -> RepoResult<MemorialDocument> {
        info!("event=memorial_assemble module=memorial status=start");
        let project = self.load_project(project_id)?;
        let vertices = self.vertices.list_vertices(project_id)?;
        let beneficiarios = self.parties.list_beneficiarios(project_id)?;
        let confrontantes = self.parties.list_confrontantes(project_id)?;

        let table = build_boundary_table(&vertices, &confrontantes);
        let description = describe_boundary(&project, &vertices, &confrontantes, &self.options);
        if !description.closure.is_consistent() {
            warn!(
                "event=closure_check module=memorial status=mismatch perimeter_diff_m={:.3} area_diff_m2={}",
                description.closure.perimeter_difference_m(),
                description
                    .closure
                    .area_difference_m2()
                    .map_or_else(|| "n/a".to_string(), |value| format!("{value:.3}")),
            );
        }

        let document = MemorialDocument {
            title: DOCUMENT_TITLE.to_string(),
            project_name: project.name.clone(),
            beneficiaries: beneficiarios.iter().map(document_party).collect(),
            location: location_text(&project),
            area: format!("{} m²", format_br_measure(project.area_m2)),
            perimeter: format!("{} m", format_br_measure(project.perimeter_m)),
            measurement_epoch: project.measurement_epoch.clone(),
            instrument: project.instrument.clone(),
            geodetic_system: self.options.datum.clone(),
            projection: format!(
                "UTM - Meridiano Central {}",
                self.options.central_meridian
            ),
            table,
            edges: description.edges,
            narrative: description.narrative,
            closure: description.closure,
            place_and_date: place_and_date(&beneficiarios, date),
            signatures: signatures(&beneficiarios, &confrontantes),
        };

        info!(
            "event=memorial_assemble module=memorial status=ok vertices={} described={}",
            vertices.len(),
            document.narrative.is_described()
        );
        Ok(document)
    }

    fn load_project(&self, project_id: ProjectId) -> RepoResult<Project> {
        self.projects
            .get_project(project_id)?
            .ok_or(RepoError::NotFound(EntityKind::Project, project_id))
    }
}

fn document_party(beneficiario: &Beneficiario) -> DocumentParty {
    DocumentParty {
        name: beneficiario.name.clone(),
        tax_id: beneficiario.tax_id.clone(),
    }
}

fn location_text(project: &Project) -> String {
    match project.registration_text() {
        Some(registration) => format!(
            "{}, Inscrição Imobiliária: {registration}",
            project.address.trim()
        ),
        None => project.address.trim().to_string(),
    }
}

fn place_and_date(beneficiarios: &[Beneficiario], date: NaiveDate) -> String {
    let city = beneficiarios
        .first()
        .map(|beneficiario| beneficiario.address.city.trim())
        .filter(|city| !city.is_empty())
        .unwrap_or(UNKNOWN_CITY);
    format!("{city}, {}", format_long_date_pt(date))
}

fn signatures(beneficiarios: &[Beneficiario], confrontantes: &[Confrontante]) -> Vec<Signature> {
    let requerentes = beneficiarios.iter().map(|beneficiario| Signature {
        role: SignatureRole::Requerente,
        party: document_party(beneficiario),
    });
    let vizinhos = confrontantes
        .iter()
        .filter(|confrontante| !confrontante.excluded_from_document)
        .map(|confrontante| Signature {
            role: SignatureRole::Confrontante,
            party: DocumentParty {
                name: confrontante.name.clone(),
                tax_id: confrontante.tax_id.clone(),
            },
        });
    requerentes.chain(vizinhos).collect()
}

#[cfg(test)]
mod tests {
    use super::{
        build_boundary_table, describe_boundary, AzimuthSource, DescribeOptions, Narrative,
        INSUFFICIENT_VERTICES_TEXT,
    };
    use crate::model::project::Project;
    use crate::model::vertex::Vertex;
    use uuid::Uuid;

    fn vertex(project: &Project, label: &str, utm: Option<(f64, f64)>, distance: f64) -> Vertex {
        let mut vertex = Vertex::new(project.id, label, "");
        if let Some((easting, northing)) = utm {
            vertex.utm_e = Some(easting);
            vertex.utm_n = Some(northing);
        }
        vertex.distance_m = distance;
        vertex.set_confronting_text("Rua Projetada");
        vertex
    }

    #[test]
    fn two_vertices_are_insufficient() {
        let project = Project::with_id(Uuid::new_v4(), "Lote 1");
        let vertices = vec![
            vertex(&project, "V01", Some((0.0, 0.0)), 10.0),
            vertex(&project, "V02", Some((0.0, 10.0)), 10.0),
        ];
        let description = describe_boundary(&project, &vertices, &[], &DescribeOptions::default());
        assert_eq!(
            description.narrative,
            Narrative::Insufficient(INSUFFICIENT_VERTICES_TEXT.to_string())
        );
        assert!(description.edges.is_empty());
        assert_eq!(description.closure.computed_perimeter_m, 20.0);
        assert_eq!(description.closure.computed_area_m2, None);
    }

    #[test]
    fn missing_utm_without_geographic_is_unavailable() {
        let project = Project::with_id(Uuid::new_v4(), "Lote 2");
        let vertices = vec![
            vertex(&project, "V01", Some((0.0, 0.0)), 10.0),
            vertex(&project, "V02", None, 10.0),
            vertex(&project, "V03", Some((10.0, 0.0)), 10.0),
        ];
        let description = describe_boundary(&project, &vertices, &[], &DescribeOptions::default());
        assert_eq!(description.edges[0].azimuth_source, AzimuthSource::Unavailable);
        assert_eq!(description.edges[1].azimuth_source, AzimuthSource::Unavailable);
        assert_eq!(description.edges[2].azimuth_source, AzimuthSource::Planar);
        assert!(description
            .narrative
            .text()
            .contains("com azimute não calculado"));
        assert!(description.narrative.text().contains("N 0,000m e E 0,000m"));
    }

    #[test]
    fn missing_utm_falls_back_to_geographic_bearing() {
        let project = Project::with_id(Uuid::new_v4(), "Lote 3");
        let mut first = vertex(&project, "V01", None, 10.0);
        first.latitude = Some("27°00'00\" S".into());
        first.longitude = Some("48°00'00\" O".into());
        let mut second = vertex(&project, "V02", None, 10.0);
        second.latitude = Some("26°59'00\" S".into());
        second.longitude = Some("48°00'00\" O".into());
        let third = vertex(&project, "V03", None, 10.0);

        let description = describe_boundary(
            &project,
            &[first, second, third],
            &[],
            &DescribeOptions::default(),
        );
        let edge = &description.edges[0];
        assert_eq!(edge.azimuth_source, AzimuthSource::Geographic);
        assert_eq!(edge.azimuth_text, "0°00'00.00\"");
    }

    #[test]
    fn table_renders_west_longitude_and_comma_distance() {
        let project = Project::with_id(Uuid::new_v4(), "Lote 4");
        let mut only = vertex(&project, "V01", None, 12.5);
        only.longitude = Some("48°36'12.345\" O".into());
        let table = build_boundary_table(&[only], &[]);
        assert_eq!(table.rows[0].longitude, "48°36'12.345\" W");
        assert_eq!(table.rows[0].distance, "12,50");
        assert_eq!(table.rows[0].confrontante, "Rua Projetada");
        assert_eq!(table.header[3], "DIST.(m)");
    }
}

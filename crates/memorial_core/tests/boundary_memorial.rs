use chrono::NaiveDate;
use memorial_core::service::memorial_service::{
    AzimuthSource, Narrative, SignatureRole, INSUFFICIENT_VERTICES_TEXT, TABLE_HEADER,
};
use memorial_core::service::registry_service::{
    ConfrontanteInput, PartyInput, ProjectInput, VertexInput,
};
use memorial_core::{
    azimuth_planar, describe_boundary, open_db_in_memory, DescribeOptions, EntityKind,
    MemorialService, Project, RegistryService, RepoError, SqlitePartyRepository,
    SqliteProjectRepository, SqliteVertexRepository, Vertex,
};
use rusqlite::Connection;
use uuid::Uuid;

type Memorial<'conn> = MemorialService<
    SqliteProjectRepository<'conn>,
    SqlitePartyRepository<'conn>,
    SqliteVertexRepository<'conn>,
>;

fn registry(
    conn: &Connection,
) -> RegistryService<SqliteProjectRepository<'_>, SqlitePartyRepository<'_>, SqliteVertexRepository<'_>>
{
    RegistryService::new(
        SqliteProjectRepository::try_new(conn).unwrap(),
        SqlitePartyRepository::try_new(conn).unwrap(),
        SqliteVertexRepository::try_new(conn).unwrap(),
    )
}

fn memorial(conn: &Connection) -> Memorial<'_> {
    MemorialService::new(
        SqliteProjectRepository::try_new(conn).unwrap(),
        SqlitePartyRepository::try_new(conn).unwrap(),
        SqliteVertexRepository::try_new(conn).unwrap(),
        DescribeOptions::default(),
    )
}

fn party(name: &str, tax_id: &str, city: &str) -> PartyInput {
    PartyInput {
        name: name.to_string(),
        tax_id: tax_id.to_string(),
        street: "Rua B".to_string(),
        number: "20".to_string(),
        district: "Centro".to_string(),
        city: city.to_string(),
    }
}

fn utm_vertex(from: &str, to: &str, easting: &str, northing: &str, distance: &str) -> VertexInput {
    VertexInput {
        from_label: from.to_string(),
        to_label: to.to_string(),
        utm_e: easting.to_string(),
        utm_n: northing.to_string(),
        distance: distance.to_string(),
        confronting_text: "Rua Projetada".to_string(),
        ..VertexInput::default()
    }
}

/// Right triangle V01(100,100) -> V02(100,200) -> V03(200,200).
fn seed_triangle(conn: &Connection) -> Uuid {
    let registry = registry(conn);
    let project = registry
        .add_project(&ProjectInput {
            name: "Lote Triângulo".to_string(),
            registration: "55.66.777.0001".to_string(),
            address: "Rua das Palmeiras, s/n".to_string(),
            area: "5000".to_string(),
            perimeter: "341,42".to_string(),
            measurement_epoch: "Março de 2025".to_string(),
            instrument: "GNSS RTK".to_string(),
        })
        .unwrap();

    let neighbor = registry
        .add_confrontante(
            project.id,
            &ConfrontanteInput {
                party: party("Maria Lopes", "123.456.789-01", "Biguaçu"),
                direction: "Direita".to_string(),
            },
        )
        .unwrap();

    registry
        .add_vertex(project.id, &utm_vertex("V01", "V02", "100", "100", "100"))
        .unwrap();
    let mut second = utm_vertex("V02", "V03", "100", "200", "100");
    second.confrontante = Some(neighbor.id);
    registry.add_vertex(project.id, &second).unwrap();
    registry
        .add_vertex(project.id, &utm_vertex("V03", "V01", "200", "200", "141,42"))
        .unwrap();
    project.id
}

#[test]
fn triangle_edges_follow_the_ring() {
    let conn = open_db_in_memory().unwrap();
    let project_id = seed_triangle(&conn);

    let description = memorial(&conn).describe(project_id).unwrap();
    let edges = &description.edges;
    assert_eq!(edges.len(), 3);

    assert_eq!(edges[0].from_label, "V01");
    assert_eq!(edges[0].to_label, "V02");
    assert_eq!(edges[0].azimuth_text, "0°00'00.00\"");
    assert_eq!(edges[0].azimuth_source, AzimuthSource::Planar);

    assert_eq!(edges[1].azimuth_text, "90°00'00.00\"");
    assert_eq!(edges[1].party, "Maria Lopes");
    assert_eq!(edges[1].tax_id.as_ref().unwrap().kind.label(), "CPF");

    assert_eq!(edges[2].from_label, "V03");
    assert_eq!(edges[2].to_label, "V01");
    assert_eq!(edges[2].azimuth_text, "225°00'00.00\"");
    assert!(edges[2].closes_ring);
    assert!(edges[..2].iter().all(|edge| !edge.closes_ring));

    let mut departures: Vec<_> = edges.iter().map(|edge| edge.from_label.as_str()).collect();
    let mut arrivals: Vec<_> = edges.iter().map(|edge| edge.to_label.as_str()).collect();
    departures.sort_unstable();
    arrivals.sort_unstable();
    assert_eq!(departures, vec!["V01", "V02", "V03"]);
    assert_eq!(arrivals, departures);
}

#[test]
fn narrative_opens_at_first_vertex_and_closes_on_it() {
    let conn = open_db_in_memory().unwrap();
    let project_id = seed_triangle(&conn);

    let description = memorial(&conn).describe(project_id).unwrap();
    assert!(description.narrative.is_described());
    let text = description.narrative.text();

    assert!(text.starts_with(
        "Inicia-se a descrição deste perímetro no vértice V01, de coordenadas N 100,000m e E 100,000m; "
    ));
    assert!(text.contains(
        "deste segue confrontando com Rua Projetada, com azimute de 0°00'00.00\" e distância de 100,00m, até o vértice V02, de coordenadas N 200,000m e E 100,000m; "
    ));
    assert!(text.contains("confrontando com Maria Lopes, CPF: 123.456.789-01, com azimute de 90°00'00.00\""));
    assert!(text.contains(
        "e distância de 141,42m, até o vértice V01, de coordenadas N 100,000m e E 100,000m, ponto inicial da descrição deste perímetro. "
    ));
    assert!(text.contains("Meridiano Central 51º WGr, tendo como Datum o SIRGAS2000"));
    assert!(text.ends_with("Encerrado o perímetro total de 341,42 m e área de 5000,00 m²."));
}

#[test]
fn closure_report_compares_declared_and_computed() {
    let conn = open_db_in_memory().unwrap();
    let project_id = seed_triangle(&conn);

    let closure = memorial(&conn).describe(project_id).unwrap().closure;
    assert!((closure.computed_perimeter_m - 341.42).abs() < 1e-9);
    assert!((closure.computed_area_m2.unwrap() - 5000.0).abs() < 1e-9);
    assert!(closure.is_consistent());
}

#[test]
fn two_vertices_report_insufficient_ring() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry
        .add_project(&ProjectInput {
            name: "Lote curto".to_string(),
            area: "0".to_string(),
            perimeter: "0".to_string(),
            ..ProjectInput::default()
        })
        .unwrap();
    registry
        .add_vertex(project.id, &utm_vertex("A", "B", "0", "0", "10"))
        .unwrap();
    registry
        .add_vertex(project.id, &utm_vertex("B", "A", "0", "10", "10"))
        .unwrap();

    let description = memorial(&conn).describe(project.id).unwrap();
    assert_eq!(
        description.narrative,
        Narrative::Insufficient(INSUFFICIENT_VERTICES_TEXT.to_string())
    );
    assert!(description.edges.is_empty());
}

#[test]
fn reversed_ring_turns_every_azimuth_by_half_a_circle() {
    let project = Project::new("Quadrado");
    let corners = [(0.0, 0.0), (0.0, 50.0), (30.0, 50.0), (30.0, 0.0)];
    let ring: Vec<Vertex> = corners
        .iter()
        .enumerate()
        .map(|(index, (easting, northing))| {
            let mut vertex = Vertex::new(project.id, format!("P{index}"), "");
            vertex.utm_e = Some(*easting);
            vertex.utm_n = Some(*northing);
            vertex
        })
        .collect();
    let reversed: Vec<Vertex> = ring.iter().rev().cloned().collect();

    let options = DescribeOptions::default();
    let forward = describe_boundary(&project, &ring, &[], &options);
    let backward = describe_boundary(&project, &reversed, &[], &options);

    for edge in &forward.edges {
        let opposite = backward
            .edges
            .iter()
            .find(|candidate| {
                candidate.from_label == edge.to_label && candidate.to_label == edge.from_label
            })
            .unwrap();
        let turn = (opposite.azimuth_degrees.unwrap() - edge.azimuth_degrees.unwrap())
            .rem_euclid(360.0);
        assert!((turn - 180.0).abs() < 1e-9, "edge {} turned {turn}", edge.from_label);
    }
}

#[test]
fn planar_azimuth_stays_in_range() {
    let points = [
        (0.0, 0.0),
        (10.0, -3.0),
        (-7.5, 2.25),
        (730_000.25, 6_943_000.5),
        (-0.000001, 0.0),
    ];
    for (e1, n1) in points {
        for (e2, n2) in points {
            let azimuth = azimuth_planar(e1, n1, e2, n2);
            assert!((0.0..360.0).contains(&azimuth), "{azimuth} out of range");
        }
    }
}

#[test]
fn assembled_document_lists_parties_and_place() {
    let conn = open_db_in_memory().unwrap();
    let project_id = seed_triangle(&conn);
    let registry = registry(&conn);
    registry
        .add_beneficiario(project_id, &party("João Silva", "987.654.321-00", "Palhoça"))
        .unwrap();
    let excluded = registry
        .add_confrontante(
            project_id,
            &ConfrontanteInput {
                party: party("Prefeitura", "12.345.678/0001-90", "Palhoça"),
                direction: "Frente".to_string(),
            },
        )
        .unwrap();
    registry
        .set_document_exclusions(project_id, &[excluded.id])
        .unwrap();

    let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    let document = memorial(&conn).assemble(project_id, date).unwrap();

    assert_eq!(document.title, "MEMORIAL DESCRITIVO");
    assert_eq!(document.project_name, "Lote Triângulo");
    assert_eq!(
        document.location,
        "Rua das Palmeiras, s/n, Inscrição Imobiliária: 55.66.777.0001"
    );
    assert_eq!(document.area, "5000,00 m²");
    assert_eq!(document.perimeter, "341,42 m");
    assert_eq!(document.place_and_date, "Palhoça, 5 de Março de 2025");

    assert_eq!(document.table.header, TABLE_HEADER);
    let rows: Vec<_> = document
        .table
        .rows
        .iter()
        .map(|row| (row.vertex.as_str(), row.distance.as_str(), row.confrontante.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("V01", "100,00", "Rua Projetada"),
            ("V02", "100,00", "Maria Lopes"),
            ("V03", "141,42", "Rua Projetada"),
        ]
    );

    let signatures: Vec<_> = document
        .signatures
        .iter()
        .map(|signature| (signature.role, signature.party.name.as_str()))
        .collect();
    assert_eq!(
        signatures,
        vec![
            (SignatureRole::Requerente, "João Silva"),
            (SignatureRole::Confrontante, "Maria Lopes"),
        ]
    );
}

#[test]
fn document_without_beneficiaries_names_no_city() {
    let conn = open_db_in_memory().unwrap();
    let project_id = seed_triangle(&conn);

    let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let document = memorial(&conn).assemble(project_id, date).unwrap();
    assert_eq!(
        document.place_and_date,
        "Cidade não especificada, 31 de Dezembro de 2024"
    );
}

#[test]
fn describing_a_missing_project_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let missing = Uuid::new_v4();
    assert!(matches!(
        memorial(&conn).describe(missing),
        Err(RepoError::NotFound(EntityKind::Project, id)) if id == missing
    ));
}

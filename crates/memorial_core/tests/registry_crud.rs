use memorial_core::db::open_db_in_memory;
use memorial_core::model::party::Direction;
use memorial_core::service::registry_service::{
    ConfrontanteInput, PartyInput, ProjectInput, VertexInput,
};
use memorial_core::{
    ConfrontingParty, EntityKind, PartyRepository, ProjectRepository, RegistryError,
    RegistryService, SqlitePartyRepository, SqliteProjectRepository, SqliteVertexRepository,
    ValidationError, VertexRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

type Registry<'conn> = RegistryService<
    SqliteProjectRepository<'conn>,
    SqlitePartyRepository<'conn>,
    SqliteVertexRepository<'conn>,
>;

fn registry(conn: &Connection) -> Registry<'_> {
    RegistryService::new(
        SqliteProjectRepository::try_new(conn).unwrap(),
        SqlitePartyRepository::try_new(conn).unwrap(),
        SqliteVertexRepository::try_new(conn).unwrap(),
    )
}

fn project_input(name: &str) -> ProjectInput {
    ProjectInput {
        name: name.to_string(),
        registration: "01.02.003.0456".to_string(),
        address: "Rua das Flores, 100".to_string(),
        area: "1.234,56".to_string(),
        perimeter: "150,25".to_string(),
        measurement_epoch: "Março de 2025".to_string(),
        instrument: "GNSS RTK".to_string(),
    }
}

fn party_input(name: &str, tax_id: &str) -> PartyInput {
    PartyInput {
        name: name.to_string(),
        tax_id: tax_id.to_string(),
        street: "Rua A".to_string(),
        number: "10".to_string(),
        district: "Centro".to_string(),
        city: "Palhoça".to_string(),
    }
}

fn vertex_input(from: &str, to: &str) -> VertexInput {
    VertexInput {
        from_label: from.to_string(),
        to_label: to.to_string(),
        latitude: "27°38'40.123\" S".to_string(),
        longitude: "48°40'12.456\" O".to_string(),
        utm_n: "6943000,5".to_string(),
        utm_e: "730000,25".to_string(),
        distance: "12,34".to_string(),
        confrontante: None,
        confronting_text: "Rua Projetada".to_string(),
    }
}

#[test]
fn project_form_values_are_parsed_with_locale_rules() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);

    let project = registry.add_project(&project_input("Lote 12")).unwrap();
    let loaded = registry.get_project(project.id).unwrap();
    assert_eq!(loaded.area_m2, 1234.56);
    assert_eq!(loaded.perimeter_m, 150.25);
    assert_eq!(loaded.registration.as_deref(), Some("01.02.003.0456"));
}

#[test]
fn invalid_project_edit_leaves_stored_record_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 12")).unwrap();

    let mut bad = project_input("Lote 12 renomeado");
    bad.area = "muito".to_string();
    let err = registry.edit_project(project.id, &bad).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { field: "area", .. }));
    assert!(err.user_message().contains("area"));

    assert_eq!(registry.get_project(project.id).unwrap().name, "Lote 12");
}

#[test]
fn missing_records_surface_as_not_found() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let missing = Uuid::new_v4();

    let err = registry.get_project(missing).unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(EntityKind::Project, id) if id == missing));
    assert_eq!(err.user_message(), "Projeto não encontrado.");

    assert!(matches!(
        registry.delete_vertex(missing),
        Err(RegistryError::NotFound(EntityKind::Vertex, _))
    ));
    assert!(matches!(
        registry.add_beneficiario(missing, &party_input("Ana", "123.456.789-01")),
        Err(RegistryError::NotFound(EntityKind::Project, _))
    ));
}

#[test]
fn malformed_tax_id_is_rejected_before_write() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();

    let err = registry
        .add_beneficiario(project.id, &party_input("Ana", "12345678901"))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::InvalidTaxId(_))
    ));
    assert!(registry.list_beneficiarios(project.id).unwrap().is_empty());
}

#[test]
fn confrontante_direction_must_be_known() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();

    let input = ConfrontanteInput {
        party: party_input("Bruno", "987.654.321-00"),
        direction: "Norte".to_string(),
    };
    assert!(matches!(
        registry.add_confrontante(project.id, &input),
        Err(RegistryError::Validation(ValidationError::InvalidDirection(_)))
    ));

    let input = ConfrontanteInput {
        direction: "Esquerdo".to_string(),
        ..input
    };
    let created = registry.add_confrontante(project.id, &input).unwrap();
    assert_eq!(created.direction, Direction::Left);
}

#[test]
fn vertices_keep_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();

    for (from, to) in [("V01", "V02"), ("V02", "V03"), ("V03", "V01")] {
        registry.add_vertex(project.id, &vertex_input(from, to)).unwrap();
    }

    let vertices = registry.list_vertices(project.id).unwrap();
    let labels: Vec<_> = vertices.iter().map(|v| v.from_label.as_str()).collect();
    assert_eq!(labels, vec!["V01", "V02", "V03"]);
    let sequences: Vec<_> = vertices.iter().map(|v| v.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(vertices[0].utm_n, Some(6_943_000.5));
    assert_eq!(vertices[0].utm_e, Some(730_000.25));
    assert_eq!(vertices[0].distance_m, 12.34);
}

#[test]
fn edit_vertex_keeps_utm_when_left_blank() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();
    let vertex = registry.add_vertex(project.id, &vertex_input("V01", "V02")).unwrap();

    let mut edit = vertex_input("V01", "V02");
    edit.utm_n = String::new();
    edit.utm_e = "  ".to_string();
    edit.distance = "20".to_string();
    let edited = registry.edit_vertex(vertex.id, &edit).unwrap();

    assert_eq!(edited.utm_n, Some(6_943_000.5));
    assert_eq!(edited.utm_e, Some(730_000.25));
    assert_eq!(edited.distance_m, 20.0);
}

#[test]
fn malformed_latitude_is_a_parse_error() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();

    let mut input = vertex_input("V01", "V02");
    input.latitude = "27°38 S".to_string();
    let err = registry.add_vertex(project.id, &input).unwrap_err();
    assert!(matches!(err, RegistryError::Parse { field: "latitude", .. }));
    assert!(registry.list_vertices(project.id).unwrap().is_empty());
}

#[test]
fn vertex_reference_must_belong_to_the_same_project() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let here = registry.add_project(&project_input("Lote 1")).unwrap();
    let elsewhere = registry.add_project(&project_input("Lote 2")).unwrap();
    let stranger = registry
        .add_confrontante(
            elsewhere.id,
            &ConfrontanteInput {
                party: party_input("Carla", "111.222.333-44"),
                direction: "Frente".to_string(),
            },
        )
        .unwrap();

    let mut input = vertex_input("V01", "V02");
    input.confrontante = Some(stranger.id);
    assert!(matches!(
        registry.add_vertex(here.id, &input),
        Err(RegistryError::NotFound(EntityKind::Confrontante, _))
    ));
}

#[test]
fn deleting_confrontante_falls_back_to_free_text() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();
    let neighbor = registry
        .add_confrontante(
            project.id,
            &ConfrontanteInput {
                party: party_input("Daniel Souza", "222.333.444-55"),
                direction: "Fundos".to_string(),
            },
        )
        .unwrap();

    let mut input = vertex_input("V01", "V02");
    input.confrontante = Some(neighbor.id);
    let vertex = registry.add_vertex(project.id, &input).unwrap();
    assert_eq!(vertex.confronting, ConfrontingParty::Reference(neighbor.id));

    assert_eq!(registry.delete_confrontante(neighbor.id).unwrap(), 1);

    let vertices = registry.list_vertices(project.id).unwrap();
    assert_eq!(
        vertices[0].confronting,
        ConfrontingParty::FreeText("Daniel Souza".to_string())
    );
    assert!(registry.list_confrontantes(project.id).unwrap().is_empty());
}

#[test]
fn document_exclusions_replace_the_previous_set() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();
    let mut ids = Vec::new();
    for (name, tax_id) in [
        ("Eva", "333.444.555-66"),
        ("Fábio", "444.555.666-77"),
        ("Gil", "12.345.678/0001-90"),
    ] {
        let input = ConfrontanteInput {
            party: party_input(name, tax_id),
            direction: "Direita".to_string(),
        };
        ids.push(registry.add_confrontante(project.id, &input).unwrap().id);
    }

    registry
        .set_document_exclusions(project.id, &[ids[0], ids[2]])
        .unwrap();
    registry.set_document_exclusions(project.id, &[ids[1]]).unwrap();

    let flags: Vec<_> = registry
        .list_confrontantes(project.id)
        .unwrap()
        .into_iter()
        .map(|c| c.excluded_from_document)
        .collect();
    assert_eq!(flags, vec![false, true, false]);
}

#[test]
fn edit_confrontante_keeps_exclusion_flag() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();
    let input = ConfrontanteInput {
        party: party_input("Hugo", "555.666.777-88"),
        direction: "Frente".to_string(),
    };
    let created = registry.add_confrontante(project.id, &input).unwrap();
    registry
        .set_document_exclusions(project.id, &[created.id])
        .unwrap();

    let edit = ConfrontanteInput {
        direction: "Fundos".to_string(),
        ..input
    };
    let edited = registry.edit_confrontante(created.id, &edit).unwrap();
    assert!(edited.excluded_from_document);
    assert_eq!(edited.direction, Direction::Back);
}

#[test]
fn deleting_project_removes_its_records() {
    let conn = open_db_in_memory().unwrap();
    let registry = registry(&conn);
    let project = registry.add_project(&project_input("Lote 1")).unwrap();
    let neighbor = registry
        .add_confrontante(
            project.id,
            &ConfrontanteInput {
                party: party_input("Íris", "666.777.888-99"),
                direction: "Frente".to_string(),
            },
        )
        .unwrap();
    let mut input = vertex_input("V01", "V02");
    input.confrontante = Some(neighbor.id);
    registry.add_vertex(project.id, &input).unwrap();
    registry
        .add_beneficiario(project.id, &party_input("Júlia", "777.888.999-00"))
        .unwrap();

    registry.delete_project(project.id).unwrap();

    let projects = SqliteProjectRepository::try_new(&conn).unwrap();
    let parties = SqlitePartyRepository::try_new(&conn).unwrap();
    let vertices = SqliteVertexRepository::try_new(&conn).unwrap();
    assert!(projects.get_project(project.id).unwrap().is_none());
    assert!(parties.list_confrontantes(project.id).unwrap().is_empty());
    assert!(parties.list_beneficiarios(project.id).unwrap().is_empty());
    assert!(vertices.list_vertices(project.id).unwrap().is_empty());
}

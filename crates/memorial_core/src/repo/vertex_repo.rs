//! Vertex repository contract and SQLite implementation.
//!
//! # Invariants
//! - `sequence` is assigned on insert as one past the project's current
//!   maximum, so list order is insertion order.
//! - A referenced confrontante must belong to the vertex's project.

use super::{
    ensure_connection_ready, ensure_project_exists, parse_uuid, EntityKind, RepoError, RepoResult,
};
use crate::model::party::ConfrontanteId;
use crate::model::project::ProjectId;
use crate::model::vertex::{ConfrontingParty, Vertex, VertexId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const VERTEX_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    sequence,
    from_label,
    to_label,
    latitude,
    longitude,
    utm_n,
    utm_e,
    distance_m,
    confrontante_uuid,
    confrontante_text
FROM vertices";

/// Repository interface for boundary vertices.
pub trait VertexRepository {
    /// Inserts a vertex at the end of its project's ring and returns it with
    /// the assigned sequence.
    fn create_vertex(&self, vertex: &Vertex) -> RepoResult<Vertex>;
    /// Overwrites every stored field except `sequence`.
    fn update_vertex(&self, vertex: &Vertex) -> RepoResult<()>;
    fn get_vertex(&self, id: VertexId) -> RepoResult<Option<Vertex>>;
    /// Lists one project's vertices in ring order.
    fn list_vertices(&self, project_id: ProjectId) -> RepoResult<Vec<Vertex>>;
    /// Finds the first vertex of a project whose from-label matches exactly.
    fn find_vertex_by_label(
        &self,
        project_id: ProjectId,
        from_label: &str,
    ) -> RepoResult<Option<Vertex>>;
    fn delete_vertex(&self, id: VertexId) -> RepoResult<()>;
}

/// SQLite-backed vertex repository.
pub struct SqliteVertexRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteVertexRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn ensure_reference_in_project(
        &self,
        project_id: ProjectId,
        confronting: &ConfrontingParty,
    ) -> RepoResult<()> {
        let ConfrontingParty::Reference(confrontante_id) = confronting else {
            return Ok(());
        };
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM confrontantes
                WHERE uuid = ?1 AND project_uuid = ?2
            );",
            params![confrontante_id.to_string(), project_id.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::NotFound(
                EntityKind::Confrontante,
                *confrontante_id,
            ));
        }
        Ok(())
    }
}

impl VertexRepository for SqliteVertexRepository<'_> {
    fn create_vertex(&self, vertex: &Vertex) -> RepoResult<Vertex> {
        vertex.validate()?;
        ensure_project_exists(self.conn, vertex.project_id)?;
        self.ensure_reference_in_project(vertex.project_id, &vertex.confronting)?;

        let (reference, text) = party_columns(&vertex.confronting);
        self.conn.execute(
            "INSERT INTO vertices (
                uuid,
                project_uuid,
                sequence,
                from_label,
                to_label,
                latitude,
                longitude,
                utm_n,
                utm_e,
                distance_m,
                confrontante_uuid,
                confrontante_text
            )
            SELECT ?1, ?2, COALESCE(MAX(sequence), 0) + 1, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
            FROM vertices
            WHERE project_uuid = ?2;",
            params![
                vertex.id.to_string(),
                vertex.project_id.to_string(),
                vertex.from_label.trim(),
                vertex.to_label.trim(),
                vertex.latitude.as_deref(),
                vertex.longitude.as_deref(),
                vertex.utm_n,
                vertex.utm_e,
                vertex.distance_m,
                reference,
                text,
            ],
        )?;

        self.get_vertex(vertex.id)?
            .ok_or(RepoError::NotFound(EntityKind::Vertex, vertex.id))
    }

    fn update_vertex(&self, vertex: &Vertex) -> RepoResult<()> {
        vertex.validate()?;
        self.ensure_reference_in_project(vertex.project_id, &vertex.confronting)?;

        let (reference, text) = party_columns(&vertex.confronting);
        let changed = self.conn.execute(
            "UPDATE vertices
             SET
                from_label = ?1,
                to_label = ?2,
                latitude = ?3,
                longitude = ?4,
                utm_n = ?5,
                utm_e = ?6,
                distance_m = ?7,
                confrontante_uuid = ?8,
                confrontante_text = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?10
               AND project_uuid = ?11;",
            params![
                vertex.from_label.trim(),
                vertex.to_label.trim(),
                vertex.latitude.as_deref(),
                vertex.longitude.as_deref(),
                vertex.utm_n,
                vertex.utm_e,
                vertex.distance_m,
                reference,
                text,
                vertex.id.to_string(),
                vertex.project_id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Vertex, vertex.id));
        }
        Ok(())
    }

    fn get_vertex(&self, id: VertexId) -> RepoResult<Option<Vertex>> {
        self.conn
            .query_row(
                &format!("{VERTEX_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_vertex_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_vertices(&self, project_id: ProjectId) -> RepoResult<Vec<Vertex>> {
        let mut stmt = self.conn.prepare(&format!(
            "{VERTEX_SELECT_SQL} WHERE project_uuid = ?1 ORDER BY sequence ASC;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut vertices = Vec::new();
        while let Some(row) = rows.next()? {
            vertices.push(parse_vertex_row(row)?);
        }
        Ok(vertices)
    }

    fn find_vertex_by_label(
        &self,
        project_id: ProjectId,
        from_label: &str,
    ) -> RepoResult<Option<Vertex>> {
        self.conn
            .query_row(
                &format!(
                    "{VERTEX_SELECT_SQL}
                     WHERE project_uuid = ?1
                       AND from_label = ?2
                     ORDER BY sequence ASC
                     LIMIT 1;"
                ),
                params![project_id.to_string(), from_label.trim()],
                |row| Ok(parse_vertex_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn delete_vertex(&self, id: VertexId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM vertices WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Vertex, id));
        }
        Ok(())
    }
}

fn party_columns(party: &ConfrontingParty) -> (Option<String>, Option<&str>) {
    match party {
        ConfrontingParty::Reference(id) => (Some(id.to_string()), None),
        ConfrontingParty::FreeText(text) => (None, Some(text.as_str())),
    }
}

fn parse_party(
    reference: Option<String>,
    text: Option<String>,
) -> RepoResult<ConfrontingParty> {
    match (reference, text) {
        (Some(value), None) => {
            let id: ConfrontanteId = parse_uuid(&value, "vertices.confrontante_uuid")?;
            Ok(ConfrontingParty::Reference(id))
        }
        (None, Some(text)) => Ok(ConfrontingParty::FreeText(text)),
        _ => Err(RepoError::InvalidData(
            "vertex must carry exactly one of confrontante_uuid/confrontante_text".to_string(),
        )),
    }
}

fn parse_vertex_row(row: &Row<'_>) -> RepoResult<Vertex> {
    let uuid_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let vertex = Vertex {
        id: parse_uuid(&uuid_text, "vertices.uuid")?,
        project_id: parse_uuid(&project_text, "vertices.project_uuid")?,
        sequence: row.get("sequence")?,
        from_label: row.get("from_label")?,
        to_label: row.get("to_label")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        utm_n: row.get("utm_n")?,
        utm_e: row.get("utm_e")?,
        distance_m: row.get("distance_m")?,
        confronting: parse_party(
            row.get("confrontante_uuid")?,
            row.get("confrontante_text")?,
        )?,
    };
    vertex.validate()?;
    Ok(vertex)
}

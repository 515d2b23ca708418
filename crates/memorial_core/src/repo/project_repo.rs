//! Project repository contract and SQLite implementation.

use super::{ensure_connection_ready, parse_uuid, EntityKind, RepoError, RepoResult};
use crate::model::project::{Project, ProjectId};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const PROJECT_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    registration,
    address,
    area_m2,
    perimeter_m,
    measurement_epoch,
    instrument
FROM projects";

/// Repository interface for project CRUD.
pub trait ProjectRepository {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId>;
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    /// Lists all projects ordered by name.
    fn list_projects(&self) -> RepoResult<Vec<Project>>;
    /// Deletes a project together with its vertices and parties.
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &Project) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                uuid,
                name,
                registration,
                address,
                area_m2,
                perimeter_m,
                measurement_epoch,
                instrument
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                project.id.to_string(),
                project.name.trim(),
                project.registration.as_deref(),
                project.address.as_str(),
                project.area_m2,
                project.perimeter_m,
                project.measurement_epoch.as_str(),
                project.instrument.as_str(),
            ],
        )?;

        Ok(project.id)
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let changed = self.conn.execute(
            "UPDATE projects
             SET
                name = ?1,
                registration = ?2,
                address = ?3,
                area_m2 = ?4,
                perimeter_m = ?5,
                measurement_epoch = ?6,
                instrument = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?8;",
            params![
                project.name.trim(),
                project.registration.as_deref(),
                project.address.as_str(),
                project.area_m2,
                project.perimeter_m,
                project.measurement_epoch.as_str(),
                project.instrument.as_str(),
                project.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Project, project.id));
        }
        Ok(())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let project = self
            .conn
            .query_row(
                &format!("{PROJECT_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_project_row(row)),
            )
            .optional()?;
        project.transpose()
    }

    fn list_projects(&self) -> RepoResult<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROJECT_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        // Vertices go first: they reference confrontantes of the same project.
        tx.execute(
            "DELETE FROM vertices WHERE project_uuid = ?1;",
            [id.to_string()],
        )?;
        let changed = tx.execute("DELETE FROM projects WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Project, id));
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let uuid_text: String = row.get("uuid")?;
    let project = Project {
        id: parse_uuid(&uuid_text, "projects.uuid")?,
        name: row.get("name")?,
        registration: row.get("registration")?,
        address: row.get("address")?,
        area_m2: row.get("area_m2")?,
        perimeter_m: row.get("perimeter_m")?,
        measurement_epoch: row.get("measurement_epoch")?,
        instrument: row.get("instrument")?,
    };
    project.validate()?;
    Ok(project)
}

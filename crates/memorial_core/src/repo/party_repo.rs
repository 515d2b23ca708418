//! Beneficiario/confrontante repository contract and SQLite implementation.
//!
//! # Invariants
//! - `tax_id_digits` mirrors `tax_id` with the mask removed, for lookups.
//! - Deleting a confrontante rewrites every vertex that referenced it to
//!   free text carrying the confrontante's name, in the same transaction.

use super::{
    bool_to_int, ensure_connection_ready, ensure_project_exists, int_to_bool, parse_uuid,
    EntityKind, RepoError, RepoResult,
};
use crate::model::party::{
    tax_id_digits, Address, Beneficiario, BeneficiarioId, Confrontante, ConfrontanteId,
    Direction,
};
use crate::model::project::ProjectId;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const BENEFICIARIO_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    name,
    tax_id,
    street,
    number,
    district,
    city
FROM beneficiarios";

const CONFRONTANTE_SELECT_SQL: &str = "SELECT
    uuid,
    project_uuid,
    name,
    tax_id,
    direction,
    street,
    number,
    district,
    city,
    excluded_from_document
FROM confrontantes";

/// Repository interface for the parties attached to a project.
pub trait PartyRepository {
    fn create_beneficiario(&self, beneficiario: &Beneficiario) -> RepoResult<BeneficiarioId>;
    fn update_beneficiario(&self, beneficiario: &Beneficiario) -> RepoResult<()>;
    fn get_beneficiario(&self, id: BeneficiarioId) -> RepoResult<Option<Beneficiario>>;
    /// Lists beneficiaries of one project in insertion order.
    fn list_beneficiarios(&self, project_id: ProjectId) -> RepoResult<Vec<Beneficiario>>;
    fn delete_beneficiario(&self, id: BeneficiarioId) -> RepoResult<()>;

    fn create_confrontante(&self, confrontante: &Confrontante) -> RepoResult<ConfrontanteId>;
    fn update_confrontante(&self, confrontante: &Confrontante) -> RepoResult<()>;
    fn get_confrontante(&self, id: ConfrontanteId) -> RepoResult<Option<Confrontante>>;
    /// Lists confrontantes of one project in insertion order.
    fn list_confrontantes(&self, project_id: ProjectId) -> RepoResult<Vec<Confrontante>>;
    /// Finds a project's confrontante by tax id, ignoring the mask.
    fn find_confrontante_by_tax_id(
        &self,
        project_id: ProjectId,
        tax_id: &str,
    ) -> RepoResult<Option<Confrontante>>;
    /// Deletes a confrontante and returns how many vertices fell back to
    /// free text.
    fn delete_confrontante(&self, id: ConfrontanteId) -> RepoResult<usize>;
    /// Marks exactly the listed confrontantes of a project as excluded from
    /// the document; every other confrontante of the project is included.
    fn set_document_exclusions(
        &self,
        project_id: ProjectId,
        excluded: &[ConfrontanteId],
    ) -> RepoResult<()>;
}

/// SQLite-backed party repository.
pub struct SqlitePartyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePartyRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PartyRepository for SqlitePartyRepository<'_> {
    fn create_beneficiario(&self, beneficiario: &Beneficiario) -> RepoResult<BeneficiarioId> {
        beneficiario.validate()?;
        ensure_project_exists(self.conn, beneficiario.project_id)?;

        self.conn.execute(
            "INSERT INTO beneficiarios (
                uuid,
                project_uuid,
                name,
                tax_id,
                tax_id_digits,
                street,
                number,
                district,
                city
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                beneficiario.id.to_string(),
                beneficiario.project_id.to_string(),
                beneficiario.name.trim(),
                beneficiario.tax_id.trim(),
                tax_id_digits(&beneficiario.tax_id),
                beneficiario.address.street.as_str(),
                beneficiario.address.number.as_str(),
                beneficiario.address.district.as_str(),
                beneficiario.address.city.as_str(),
            ],
        )?;

        Ok(beneficiario.id)
    }

    fn update_beneficiario(&self, beneficiario: &Beneficiario) -> RepoResult<()> {
        beneficiario.validate()?;

        let changed = self.conn.execute(
            "UPDATE beneficiarios
             SET
                name = ?1,
                tax_id = ?2,
                tax_id_digits = ?3,
                street = ?4,
                number = ?5,
                district = ?6,
                city = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?8;",
            params![
                beneficiario.name.trim(),
                beneficiario.tax_id.trim(),
                tax_id_digits(&beneficiario.tax_id),
                beneficiario.address.street.as_str(),
                beneficiario.address.number.as_str(),
                beneficiario.address.district.as_str(),
                beneficiario.address.city.as_str(),
                beneficiario.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(
                EntityKind::Beneficiario,
                beneficiario.id,
            ));
        }
        Ok(())
    }

    fn get_beneficiario(&self, id: BeneficiarioId) -> RepoResult<Option<Beneficiario>> {
        self.conn
            .query_row(
                &format!("{BENEFICIARIO_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_beneficiario_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_beneficiarios(&self, project_id: ProjectId) -> RepoResult<Vec<Beneficiario>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BENEFICIARIO_SELECT_SQL} WHERE project_uuid = ?1 ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_beneficiario_row(row)?);
        }
        Ok(items)
    }

    fn delete_beneficiario(&self, id: BeneficiarioId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM beneficiarios WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(EntityKind::Beneficiario, id));
        }
        Ok(())
    }

    fn create_confrontante(&self, confrontante: &Confrontante) -> RepoResult<ConfrontanteId> {
        confrontante.validate()?;
        ensure_project_exists(self.conn, confrontante.project_id)?;

        self.conn.execute(
            "INSERT INTO confrontantes (
                uuid,
                project_uuid,
                name,
                tax_id,
                tax_id_digits,
                direction,
                street,
                number,
                district,
                city,
                excluded_from_document
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                confrontante.id.to_string(),
                confrontante.project_id.to_string(),
                confrontante.name.trim(),
                confrontante.tax_id.trim(),
                tax_id_digits(&confrontante.tax_id),
                direction_to_db(confrontante.direction),
                confrontante.address.street.as_str(),
                confrontante.address.number.as_str(),
                confrontante.address.district.as_str(),
                confrontante.address.city.as_str(),
                bool_to_int(confrontante.excluded_from_document),
            ],
        )?;

        Ok(confrontante.id)
    }

    fn update_confrontante(&self, confrontante: &Confrontante) -> RepoResult<()> {
        confrontante.validate()?;

        let changed = self.conn.execute(
            "UPDATE confrontantes
             SET
                name = ?1,
                tax_id = ?2,
                tax_id_digits = ?3,
                direction = ?4,
                street = ?5,
                number = ?6,
                district = ?7,
                city = ?8,
                excluded_from_document = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?10;",
            params![
                confrontante.name.trim(),
                confrontante.tax_id.trim(),
                tax_id_digits(&confrontante.tax_id),
                direction_to_db(confrontante.direction),
                confrontante.address.street.as_str(),
                confrontante.address.number.as_str(),
                confrontante.address.district.as_str(),
                confrontante.address.city.as_str(),
                bool_to_int(confrontante.excluded_from_document),
                confrontante.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(
                EntityKind::Confrontante,
                confrontante.id,
            ));
        }
        Ok(())
    }

    fn get_confrontante(&self, id: ConfrontanteId) -> RepoResult<Option<Confrontante>> {
        self.conn
            .query_row(
                &format!("{CONFRONTANTE_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_confrontante_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_confrontantes(&self, project_id: ProjectId) -> RepoResult<Vec<Confrontante>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CONFRONTANTE_SELECT_SQL} WHERE project_uuid = ?1 ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_confrontante_row(row)?);
        }
        Ok(items)
    }

    fn find_confrontante_by_tax_id(
        &self,
        project_id: ProjectId,
        tax_id: &str,
    ) -> RepoResult<Option<Confrontante>> {
        let digits = tax_id_digits(tax_id);
        if digits.is_empty() {
            return Ok(None);
        }

        self.conn
            .query_row(
                &format!(
                    "{CONFRONTANTE_SELECT_SQL}
                     WHERE project_uuid = ?1
                       AND tax_id_digits = ?2
                     ORDER BY rowid ASC
                     LIMIT 1;"
                ),
                params![project_id.to_string(), digits],
                |row| Ok(parse_confrontante_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn delete_confrontante(&self, id: ConfrontanteId) -> RepoResult<usize> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let name: Option<String> = tx
            .query_row(
                "SELECT name FROM confrontantes WHERE uuid = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(name) = name else {
            return Err(RepoError::NotFound(EntityKind::Confrontante, id));
        };

        let detached = tx.execute(
            "UPDATE vertices
             SET
                confrontante_uuid = NULL,
                confrontante_text = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE confrontante_uuid = ?1;",
            params![id.to_string(), name],
        )?;
        tx.execute("DELETE FROM confrontantes WHERE uuid = ?1;", [id.to_string()])?;
        tx.commit()?;

        Ok(detached)
    }

    fn set_document_exclusions(
        &self,
        project_id: ProjectId,
        excluded: &[ConfrontanteId],
    ) -> RepoResult<()> {
        ensure_project_exists(self.conn, project_id)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "UPDATE confrontantes
             SET
                excluded_from_document = 0,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE project_uuid = ?1;",
            [project_id.to_string()],
        )?;
        for confrontante_id in excluded {
            tx.execute(
                "UPDATE confrontantes
                 SET excluded_from_document = 1
                 WHERE uuid = ?1
                   AND project_uuid = ?2;",
                params![confrontante_id.to_string(), project_id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn parse_address(row: &Row<'_>) -> RepoResult<Address> {
    Ok(Address {
        street: row.get("street")?,
        number: row.get("number")?,
        district: row.get("district")?,
        city: row.get("city")?,
    })
}

fn parse_beneficiario_row(row: &Row<'_>) -> RepoResult<Beneficiario> {
    let uuid_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    Ok(Beneficiario {
        id: parse_uuid(&uuid_text, "beneficiarios.uuid")?,
        project_id: parse_uuid(&project_text, "beneficiarios.project_uuid")?,
        name: row.get("name")?,
        tax_id: row.get("tax_id")?,
        address: parse_address(row)?,
    })
}

fn parse_confrontante_row(row: &Row<'_>) -> RepoResult<Confrontante> {
    let uuid_text: String = row.get("uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let direction_text: String = row.get("direction")?;
    let direction = parse_direction(&direction_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid direction `{direction_text}` in confrontantes.direction"
        ))
    })?;

    Ok(Confrontante {
        id: parse_uuid(&uuid_text, "confrontantes.uuid")?,
        project_id: parse_uuid(&project_text, "confrontantes.project_uuid")?,
        name: row.get("name")?,
        tax_id: row.get("tax_id")?,
        direction,
        address: parse_address(row)?,
        excluded_from_document: int_to_bool(
            row.get("excluded_from_document")?,
            "confrontantes.excluded_from_document",
        )?,
    })
}

fn direction_to_db(direction: Direction) -> &'static str {
    match direction {
        Direction::Right => "right",
        Direction::Left => "left",
        Direction::Front => "front",
        Direction::Back => "back",
    }
}

fn parse_direction(value: &str) -> Option<Direction> {
    match value {
        "right" => Some(Direction::Right),
        "left" => Some(Direction::Left),
        "front" => Some(Direction::Front),
        "back" => Some(Direction::Back),
        _ => None,
    }
}

//! Survey core for memorial descritivo documents.
//! This crate is the single source of truth for survey invariants: coordinate
//! parsing, azimuths, boundary assembly and batch import.

pub mod config;
pub mod db;
pub mod geo;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use geo::azimuth::{azimuth_geographic, azimuth_planar, format_angle_dms};
pub use geo::coord::{parse_dms_to_decimal, parse_locale_decimal, parse_utm_value, CoordParseError};
pub use import::layout::ImportPreset;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::party::{Beneficiario, Confrontante, Direction, TaxIdKind};
pub use model::project::{Project, ProjectId};
pub use model::vertex::{ConfrontingParty, Vertex, VertexId};
pub use model::ValidationError;
pub use repo::party_repo::{PartyRepository, SqlitePartyRepository};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::vertex_repo::{SqliteVertexRepository, VertexRepository};
pub use repo::{EntityKind, RepoError, RepoResult};
pub use search::registry::{find_party_by_tax_id, search_projects, ProjectSearchQuery};
pub use service::import_service::{ImportOptions, ImportOutcome, ImportService};
pub use service::memorial_service::{describe_boundary, DescribeOptions, MemorialService};
pub use service::registry_service::{RegistryError, RegistryService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

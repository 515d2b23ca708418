//! Command-line host for the survey core.
//!
//! # Responsibility
//! - Load config, start logging, open the survey store.
//! - Map subcommands onto core services and print their results.

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::error;
use memorial_core::import::layout::ImportPreset;
use memorial_core::service::import_service::{ImportOptions, ImportOutcome};
use memorial_core::service::memorial_service::{DescribeOptions, MemorialDocument};
use memorial_core::service::registry_service::ProjectInput;
use memorial_core::{
    find_party_by_tax_id, init_logging, open_db, search_projects, AppConfig, ImportService,
    MemorialService, ProjectSearchQuery, RegistryService, SqlitePartyRepository,
    SqliteProjectRepository, SqliteVertexRepository,
};
use rusqlite::Connection;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "memorial")]
#[command(about = "Survey registry and memorial descritivo tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to $MEMORIAL_CONFIG or ./config/memorial.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding `[database] path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct ProjectArgs {
    name: String,
    /// Municipal registration (inscrição imobiliária)
    #[arg(long, default_value = "")]
    registration: String,
    #[arg(long, default_value = "")]
    address: String,
    /// Declared area in m², `1.234,56` or `1234.56`
    #[arg(long, default_value = "0")]
    area: String,
    /// Declared perimeter in m
    #[arg(long, default_value = "0")]
    perimeter: String,
    #[arg(long, default_value = "")]
    epoch: String,
    #[arg(long, default_value = "")]
    instrument: String,
}

impl From<ProjectArgs> for ProjectInput {
    fn from(args: ProjectArgs) -> Self {
        Self {
            name: args.name,
            registration: args.registration,
            address: args.address,
            area: args.area,
            perimeter: args.perimeter,
            measurement_epoch: args.epoch,
            instrument: args.instrument,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new project and print its id
    AddProject(ProjectArgs),

    /// Reconcile a vertex file against a project's vertices
    ImportVertices {
        #[arg(long)]
        project: Uuid,
        /// utm, full, lisp or records
        #[arg(long)]
        preset: ImportPreset,
        file: PathBuf,
        /// Skip labels with no stored vertex instead of creating them
        #[arg(long)]
        no_create: bool,
        /// Skip labels that already have a stored vertex
        #[arg(long)]
        no_update: bool,
    },

    /// Create beneficiaries from a tab-delimited file
    ImportBeneficiarios {
        #[arg(long)]
        project: Uuid,
        file: PathBuf,
    },

    /// Create confrontantes from a tab-delimited file
    ImportConfrontantes {
        #[arg(long)]
        project: Uuid,
        file: PathBuf,
    },

    /// Fill missing UTM coordinates line by line, in vertex order
    ImportUtmPositional {
        #[arg(long)]
        project: Uuid,
        file: PathBuf,
    },

    /// Print a project's memorial
    Memorial {
        #[arg(long)]
        project: Uuid,
        /// Document date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Search projects by name, registration or beneficiary document
    Search { text: String },

    /// Find a beneficiary or confrontante by CPF/CNPJ
    FindPerson { document: String },

    /// Print the core version
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if let Commands::Version = cli.command {
        println!("memorial_core version={}", memorial_core::core_version());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::discover()?,
    };
    init_logging(&config.logging)?;
    let db_path = cli.db.clone().unwrap_or_else(|| config.database.path.clone());
    let conn = open_db(&db_path)?;

    match cli.command {
        Commands::AddProject(args) => {
            println!("{}", add_project(&conn, args)?);
        }
        Commands::ImportVertices {
            project,
            preset,
            file,
            no_create,
            no_update,
        } => {
            let defaults = ImportOptions::from(&config.import);
            let options = ImportOptions {
                create_missing: defaults.create_missing && !no_create,
                update_existing: defaults.update_existing && !no_update,
            };
            let payload = std::fs::read(&file)?;
            let outcome = import_service(&conn)?.import_vertices(project, &payload, preset, options)?;
            print_outcome(&outcome);
        }
        Commands::ImportBeneficiarios { project, file } => {
            let payload = std::fs::read(&file)?;
            print_outcome(&import_service(&conn)?.import_beneficiarios(project, &payload)?);
        }
        Commands::ImportConfrontantes { project, file } => {
            let payload = std::fs::read(&file)?;
            print_outcome(&import_service(&conn)?.import_confrontantes(project, &payload)?);
        }
        Commands::ImportUtmPositional { project, file } => {
            let payload = std::fs::read(&file)?;
            print_outcome(&import_service(&conn)?.import_utm_by_position(project, &payload)?);
        }
        Commands::Memorial {
            project,
            date,
            format,
        } => {
            let service = MemorialService::new(
                SqliteProjectRepository::try_new(&conn)?,
                SqlitePartyRepository::try_new(&conn)?,
                SqliteVertexRepository::try_new(&conn)?,
                DescribeOptions::from(&config.memorial),
            );
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let document = service.assemble(project, date)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
                OutputFormat::Text => print!("{}", render_text(&document)),
            }
        }
        Commands::Search { text } => {
            for hit in search_projects(&conn, &ProjectSearchQuery::new(text))? {
                println!(
                    "{}\t{}\t{}",
                    hit.project_id,
                    hit.name,
                    hit.registration.unwrap_or_default()
                );
            }
        }
        Commands::FindPerson { document } => match find_party_by_tax_id(&conn, &document)? {
            Some(hit) => println!("{}", serde_json::to_string_pretty(&hit)?),
            None => println!("not found"),
        },
        Commands::Version => {}
    }
    Ok(())
}

fn import_service(
    conn: &Connection,
) -> Result<
    ImportService<SqliteProjectRepository<'_>, SqlitePartyRepository<'_>, SqliteVertexRepository<'_>>,
    Box<dyn Error>,
> {
    Ok(ImportService::new(
        SqliteProjectRepository::try_new(conn)?,
        SqlitePartyRepository::try_new(conn)?,
        SqliteVertexRepository::try_new(conn)?,
    ))
}

fn add_project(conn: &Connection, args: ProjectArgs) -> Result<Uuid, Box<dyn Error>> {
    let registry = RegistryService::new(
        SqliteProjectRepository::try_new(conn)?,
        SqlitePartyRepository::try_new(conn)?,
        SqliteVertexRepository::try_new(conn)?,
    );
    Ok(registry.add_project(&ProjectInput::from(args))?.id)
}

fn print_outcome(outcome: &ImportOutcome) {
    println!("{} encoding={}", outcome.summary(), outcome.encoding);
    for line_error in &outcome.line_errors {
        println!("  line {}: {}", line_error.line_number, line_error.reason);
    }
}

fn render_text(document: &MemorialDocument) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", document.title));
    for beneficiary in &document.beneficiaries {
        out.push_str(&format!(
            "Beneficiário: {} ({})\n",
            beneficiary.name, beneficiary.tax_id
        ));
    }
    out.push_str(&format!("Localização: {}\n", document.location));
    out.push_str(&format!("Área: {}\n", document.area));
    out.push_str(&format!("Perímetro: {}\n", document.perimeter));
    out.push_str(&format!("Época da medição: {}\n", document.measurement_epoch));
    out.push_str(&format!("Instrumento: {}\n", document.instrument));
    out.push_str(&format!("Sistema geodésico: {}\n", document.geodetic_system));
    out.push_str(&format!("Projeção: {}\n\n", document.projection));

    out.push_str(&document.table.header.join(" | "));
    out.push('\n');
    for row in &document.table.rows {
        out.push_str(&format!(
            "{} | {} | {} | {} | {}\n",
            row.vertex, row.latitude, row.longitude, row.distance, row.confrontante
        ));
    }

    out.push_str(&format!("\n{}\n\n{}\n\n", document.narrative.text(), document.place_and_date));
    for signature in &document.signatures {
        out.push_str(&format!(
            "______________________________\n{}\n{}\n{}\n\n",
            signature.party.name,
            signature.party.tax_id,
            signature.role.label()
        ));
    }
    out
}

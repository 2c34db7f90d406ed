use afpa_portfolio::cli;
use afpa_portfolio::config::AppConfig;
use afpa_portfolio::error::PortfolioResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portfolio")]
#[command(about = "Afpa procurement portfolio: Excel import, export and procedure numbering.")]
#[command(long_about = "Portfolio - Afpa procurement project portfolio

Imports the purchasing tracking workbook (one row per procedure, projects
repeated by ID), keeps projects in a local JSON store and exports every
procedure to a flat Excel sheet.

COMMANDS:
  import         - Excel workbook → project store
  export         - Project store → \"Procédures Afpa\" workbook
  projects       - List and filter projects (closed ones need --all)
  procedures     - List and filter procedures
  summary        - Portfolio totals and breakdowns
  number         - Regenerate an Afpa procedure number
  add-procedure  - Append a new procedure to a project
  attach         - Upload an attachment (NO or RP)
  detach         - Delete an attachment
  clear          - Remove every stored project

EXAMPLES:
  portfolio import Suivi_Achats.xlsx --replace
  portfolio projects --status \"En cours\" --buyer \"Alice Martin\"
  portfolio projects --all
  portfolio number 42 42-P1
  portfolio export -o Portefeuille.xlsx

CONFIGURATION:
  --config portfolio.yaml, then PORTFOLIO_STORE, PORTFOLIO_ATTACHMENTS,
  PORTFOLIO_BUCKET, PORTFOLIO_PUBLIC_URL, PORTFOLIO_BUYERS")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "PORTFOLIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Import an Excel tracking workbook into the project store.

Only the first worksheet is read. Rows sharing the same ID are grouped into
one project; each row contributes one procedure. Rows without ID are skipped.
Dates are normalized to YYYY-MM-DD.

FALLBACKS:
  Montant TTC        ← Montant HT when the TTC column is absent
  NO - Nom des valideurs ← Nom des valideurs
  NO - Commentaire   ← Commentaire général sur le projet
  Procedure buyer    ← Proc_Acheteur, else Acheteur

Use --replace to clear the store before saving.")]
    /// Import an Excel workbook into the store
    Import {
        /// Path to .xlsx / .xls / .ods file
        input: PathBuf,

        /// Clear the store before importing
        #[arg(long)]
        replace: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Export every procedure to an Excel workbook
    Export {
        /// Output file (default: Portefeuille_Procedures_Afpa.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List projects
    Projects {
        /// Case-insensitive search on title or ID
        #[arg(short, long)]
        search: Option<String>,

        /// Keep only these statuses (repeatable)
        #[arg(long = "status")]
        statuses: Vec<String>,

        /// Keep only this buyer
        #[arg(short, long)]
        buyer: Option<String>,

        /// Include finished and abandoned projects
        #[arg(long, conflicts_with = "statuses")]
        all: bool,
    },

    /// List procedures
    Procedures {
        /// Case-insensitive search on id, Afpa number, project title or subject
        #[arg(short, long)]
        search: Option<String>,

        /// Keep only this procedure type
        #[arg(short = 't', long = "type")]
        procedure_type: Option<String>,

        /// Keep only this buyer
        #[arg(short, long)]
        buyer: Option<String>,
    },

    /// Show portfolio totals and breakdowns
    Summary,

    #[command(long_about = "Regenerate the Afpa number of a procedure.

Format: {yy}{seq} - {subject} - {trigram}
  yy      - two-digit year
  seq     - highest sequence used this year + 1 (starts at 500)
  subject - the procedure's short subject
  trigram - buyer code from the buyer reference (ZZZ when unknown)")]
    /// Regenerate a procedure's Afpa number
    Number {
        /// Project ID
        project: String,

        /// Procedure id (e.g. 42-P1)
        procedure: String,

        /// Year to number for (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Append a new procedure to a project
    AddProcedure {
        /// Project ID
        project: String,

        /// Year to number for (default: current year)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Upload an attachment to a project (NO) or procedure (RP)
    Attach {
        /// Project ID
        project: String,

        /// File to upload
        file: PathBuf,

        /// Attach to this procedure's presentation report instead
        #[arg(short, long)]
        procedure: Option<String>,
    },

    /// Delete an attachment
    Detach {
        /// Project ID
        project: String,

        /// Bucket path of the attachment
        path: String,

        /// Attachment belongs to this procedure
        #[arg(short, long)]
        procedure: Option<String>,
    },

    /// Remove every stored project
    Clear,
}

fn main() -> PortfolioResult<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "afpa_portfolio=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Import {
            input,
            replace,
            verbose,
        } => cli::import(&config, input, replace, verbose),

        Commands::Export { output, verbose } => cli::export(&config, output, verbose),

        Commands::Projects {
            search,
            statuses,
            buyer,
            all,
        } => cli::projects(&config, search, statuses, buyer, all),

        Commands::Procedures {
            search,
            procedure_type,
            buyer,
        } => cli::procedures(&config, search, procedure_type, buyer),

        Commands::Summary => cli::summary(&config),

        Commands::Number {
            project,
            procedure,
            year,
        } => cli::number(&config, project, procedure, year),

        Commands::AddProcedure { project, year } => cli::add_procedure(&config, project, year),

        Commands::Attach {
            project,
            file,
            procedure,
        } => cli::attach(&config, project, file, procedure),

        Commands::Detach {
            project,
            path,
            procedure,
        } => cli::detach(&config, project, path, procedure),

        Commands::Clear => cli::clear(&config),
    }
}

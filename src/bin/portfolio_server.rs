//! Portfolio API Server binary
//!
//! HTTP REST API over the Afpa project store.
//! Provides projects, procedures, import, export and summary endpoints.

use afpa_portfolio::api::{run_api_server, ApiConfig};
use afpa_portfolio::config::AppConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "portfolio-server")]
#[command(version)]
#[command(about = "Portfolio API Server - HTTP REST API for the Afpa procurement portfolio")]
#[command(long_about = r#"
Portfolio API Server - HTTP REST API

Provides RESTful endpoints over the project store:
  - GET  /api/v1/projects       - List projects (?search=&status=&buyer=)
  - GET  /api/v1/projects/:id   - Get one project
  - PUT  /api/v1/projects/:id   - Create or replace a project
  - GET  /api/v1/procedures     - List procedures (?search=&type=&buyer=)
  - POST /api/v1/import         - Import an Excel workbook
  - GET  /api/v1/export         - Download Portefeuille_Procedures_Afpa.xlsx
  - GET  /api/v1/summary        - Portfolio totals and breakdowns

Additional endpoints:
  - GET  /health           - Health check
  - GET  /version          - Server version info
  - GET  /                 - API documentation

Example usage:
  portfolio-server                           # Start on localhost:8080
  portfolio-server --host 0.0.0.0 --port 3000 --config portfolio.yaml

  curl -X POST http://localhost:8080/api/v1/import \
    -H "Content-Type: application/json" \
    -d '{"excel_path": "Suivi_Achats.xlsx", "replace": true}'
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "PORTFOLIO_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "PORTFOLIO_PORT")]
    port: u16,

    /// YAML configuration file
    #[arg(short, long, env = "PORTFOLIO_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app_config = AppConfig::load(args.config.as_deref())?;
    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config, app_config).await
}

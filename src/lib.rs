//! Afpa Portfolio - procurement project portfolio importer and exporter
//!
//! Reads the purchasing team's Excel tracking workbook (one row per
//! procedure, projects repeated by `ID`), rebuilds the project → procedures
//! hierarchy, and writes it back out as a flat procedures workbook.
//!
//! # Features
//!
//! - Excel import (xlsx/xls/ods) with date normalization and column fallbacks
//! - Excel export of every procedure with its parent project
//! - Afpa procedure numbering (`{yy}{seq} - {subject} - {trigram}`)
//! - Filters and statistics over projects and procedures
//! - JSON document store and local attachment bucket
//!
//! # Example
//!
//! ```no_run
//! use afpa_portfolio::excel::{ProcedureExporter, ProjectImporter};
//! use std::path::Path;
//!
//! let projects = ProjectImporter::new("Suivi_Achats.xlsx").import()?;
//! println!("Projects: {}", projects.len());
//!
//! ProcedureExporter::new(&projects).export(Path::new("Portefeuille_Procedures_Afpa.xlsx"))?;
//! # Ok::<(), afpa_portfolio::error::PortfolioError>(())
//! ```

pub mod amounts;
pub mod api;
pub mod attachments;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod excel;
pub mod numbering;
pub mod portfolio;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{PortfolioError, PortfolioResult};
pub use types::{Attachment, Procedure, Project};

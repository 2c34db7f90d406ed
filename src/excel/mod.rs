//! Excel import/export for the procurement portfolio
//!
//! - Import: first worksheet of a workbook → projects with nested procedures
//! - Export: projects → one flat "Procédures Afpa" sheet, one row per procedure

mod exporter;
mod importer;

pub use exporter::{
    flatten, ProcedureExporter, ProcedureRow, DEFAULT_EXPORT_FILE, EXPORT_COLUMNS,
    EXPORT_SHEET_NAME,
};
pub use importer::{cell_text, group_rows, rows_from_range, ProjectImporter, SheetRow};

//! Procedure report exporter - projects → flat Excel sheet (one row per procedure)

use crate::error::{PortfolioError, PortfolioResult};
use crate::types::{Procedure, Project};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// File name used when the caller does not supply one
pub const DEFAULT_EXPORT_FILE: &str = "Portefeuille_Procedures_Afpa.xlsx";

/// Name of the single worksheet of the report
pub const EXPORT_SHEET_NAME: &str = "Procédures Afpa";

/// Report columns, in sheet order
pub const EXPORT_COLUMNS: [&str; 14] = [
    "Numéro de procédure (Afpa)",
    "ID Procédure",
    "Objet de la procédure",
    "Acheteur Procédure",
    "Type de procédure",
    "Montant Procédure (€ HT)",
    "Date Lancement",
    "Date des Rejets",
    "Avis d'attribution",
    "Données essentielles",
    "Statut de la consultation",
    "ID Projet",
    "Projet",
    "Statut Projet",
];

/// One report row: a procedure with its parent project's id, title and status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcedureRow {
    pub afpa_number: String,
    pub procedure_id: String,
    pub subject: String,
    pub buyer: String,
    pub procedure_type: String,
    pub amount_ht: String,
    pub launch_date: String,
    pub rejection_date: String,
    pub award_notice: String,
    pub essential_data: String,
    pub consultation_status: String,
    pub project_id: String,
    pub project_title: String,
    pub project_status: String,
}

impl ProcedureRow {
    /// Cell values in [`EXPORT_COLUMNS`] order
    pub fn cells(&self) -> [&str; 14] {
        [
            self.afpa_number.as_str(),
            self.procedure_id.as_str(),
            self.subject.as_str(),
            self.buyer.as_str(),
            self.procedure_type.as_str(),
            self.amount_ht.as_str(),
            self.launch_date.as_str(),
            self.rejection_date.as_str(),
            self.award_notice.as_str(),
            self.essential_data.as_str(),
            self.consultation_status.as_str(),
            self.project_id.as_str(),
            self.project_title.as_str(),
            self.project_status.as_str(),
        ]
    }
}

impl ProcedureRow {
    /// Row for one procedure of `project`
    pub fn new(project: &Project, procedure: &Procedure) -> Self {
        Self {
            afpa_number: procedure.afpa_number.clone(),
            procedure_id: procedure.id.clone(),
            subject: procedure.short_subject.clone(),
            buyer: procedure.buyer.clone(),
            procedure_type: procedure.procedure_type.clone(),
            amount_ht: procedure.amount_ht.clone(),
            launch_date: procedure.launch_date.clone(),
            rejection_date: procedure.rejection_date.clone(),
            award_notice: procedure.award_notice.clone(),
            essential_data: procedure.essential_data.clone(),
            consultation_status: procedure.consultation_status.clone(),
            project_id: project.id.clone(),
            project_title: project.title.clone(),
            project_status: project.status.clone(),
        }
    }
}

/// Flatten projects into report rows.
///
/// Project order then procedure order is kept as-is; projects without
/// procedures produce no row.
pub fn flatten(projects: &[Project]) -> Vec<ProcedureRow> {
    projects
        .iter()
        .flat_map(|project| {
            project
                .procedures
                .iter()
                .map(move |procedure| ProcedureRow::new(project, procedure))
        })
        .collect()
}

/// Excel exporter for the consolidated procedures report
pub struct ProcedureExporter {
    rows: Vec<ProcedureRow>,
}

impl ProcedureExporter {
    /// Create a new exporter; the projects are flattened immediately
    pub fn new(projects: &[Project]) -> Self {
        Self {
            rows: flatten(projects),
        }
    }

    pub fn rows(&self) -> &[ProcedureRow] {
        &self.rows
    }

    /// Export the report to an Excel .xlsx file
    pub fn export(&self, output_path: &Path) -> PortfolioResult<()> {
        let mut workbook = self.build_workbook()?;
        workbook
            .save(output_path)
            .map_err(|e| PortfolioError::Export(format!("Failed to save Excel file: {}", e)))?;

        info!(
            file = %output_path.display(),
            rows = self.rows.len(),
            "procedures report written"
        );
        Ok(())
    }

    /// Serialize the report to xlsx bytes
    pub fn to_buffer(&self) -> PortfolioResult<Vec<u8>> {
        let mut workbook = self.build_workbook()?;
        workbook
            .save_to_buffer()
            .map_err(|e| PortfolioError::Export(format!("Failed to serialize workbook: {}", e)))
    }

    fn build_workbook(&self) -> PortfolioResult<Workbook> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(EXPORT_SHEET_NAME)
            .map_err(|e| PortfolioError::Export(format!("Failed to set worksheet name: {}", e)))?;

        self.write_header(worksheet)?;

        for (row_idx, row) in self.rows.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32; // +1 for header row
            for (col_idx, value) in row.cells().iter().enumerate() {
                worksheet
                    .write_string(excel_row, col_idx as u16, *value)
                    .map_err(|e| PortfolioError::Export(format!("Failed to write cell: {}", e)))?;
            }
        }

        Ok(workbook)
    }

    fn write_header(&self, worksheet: &mut Worksheet) -> PortfolioResult<()> {
        let bold = Format::new().set_bold();
        for (col_idx, name) in EXPORT_COLUMNS.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col_idx as u16, *name, &bold)
                .map_err(|e| PortfolioError::Export(format!("Failed to write header: {}", e)))?;
            worksheet
                .set_column_width(col_idx as u16, (name.chars().count() + 4) as f64)
                .map_err(|e| {
                    PortfolioError::Export(format!("Failed to set column width: {}", e))
                })?;
        }
        worksheet
            .set_freeze_panes(1, 0)
            .map_err(|e| PortfolioError::Export(format!("Failed to freeze header: {}", e)))?;
        Ok(())
    }
}

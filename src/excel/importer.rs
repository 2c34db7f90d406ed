//! Project importer - Excel workbook → projects with nested procedures

use crate::dates::normalize_date;
use crate::error::{PortfolioError, PortfolioResult};
use crate::types::{columns, Procedure, Project};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One data row of the first worksheet, keyed by verbatim header names
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    cells: HashMap<String, Data>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy when assembling rows by hand
    pub fn with(mut self, column: impl Into<String>, value: Data) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert a cell; the first value for a repeated header is kept
    pub fn insert(&mut self, column: impl Into<String>, value: Data) {
        self.cells.entry(column.into()).or_insert(value);
    }

    pub fn get(&self, column: &str) -> Option<&Data> {
        self.cells.get(column)
    }

    /// Cell rendered as text, `""` when the column is absent
    pub fn text(&self, column: &str) -> String {
        self.get(column).map(cell_text).unwrap_or_default()
    }

    /// Text of `column`, or of `fallback` when the first one is blank
    pub fn text_or(&self, column: &str, fallback: &str) -> String {
        let value = self.text(column);
        if value.is_empty() {
            self.text(fallback)
        } else {
            value
        }
    }

    /// Cell normalized to an ISO date, `""` when absent or not a date
    pub fn date(&self, column: &str) -> String {
        self.get(column).map(normalize_date).unwrap_or_default()
    }

    /// Comma-separated cell split into trimmed, non-empty items
    pub fn list(&self, column: &str) -> Vec<String> {
        self.text(column)
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Render a cell the way it reads in the sheet.
///
/// Whole floats lose their `.0`, native dates become ISO dates, error and
/// empty cells become `""`.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            let date = normalize_date(cell);
            if date.is_empty() {
                format_float(dt.as_f64())
            } else {
                date
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Split a worksheet range into header-keyed rows.
///
/// The first row is the header. Columns with a blank header are ignored.
pub fn rows_from_range(range: &Range<Data>) -> Vec<SheetRow> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => return Vec::new(),
    };

    rows.map(|cells| {
        let mut row = SheetRow::new();
        for (header, cell) in headers.iter().zip(cells) {
            if header.trim().is_empty() {
                continue;
            }
            row.insert(header.clone(), cell.clone());
        }
        row
    })
    .collect()
}

/// Group rows into projects.
///
/// Rows sharing an `ID` become procedures of a single project, in row
/// order; the first row of an `ID` supplies the project-level fields. Rows
/// whose `ID` is blank are skipped. Procedures left without an id get
/// `{ID}-P{n}` from their final position.
pub fn group_rows(rows: &[SheetRow]) -> Vec<Project> {
    let mut projects: Vec<Project> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for (row_idx, row) in rows.iter().enumerate() {
        let id = row.text(columns::ID).trim().to_string();
        if id.is_empty() {
            // +2: header row and 1-based sheet numbering
            debug!(sheet_row = row_idx + 2, "skipping row without ID");
            skipped += 1;
            continue;
        }

        let procedure = procedure_from_row(row);
        match index.get(&id) {
            Some(&position) => projects[position].procedures.push(procedure),
            None => {
                let mut project = project_from_row(&id, row);
                project.procedures.push(procedure);
                index.insert(id, projects.len());
                projects.push(project);
            }
        }
    }

    for project in &mut projects {
        project.assign_missing_procedure_ids();
    }

    if skipped > 0 {
        debug!(skipped, "rows without ID ignored");
    }
    projects
}

/// Project-scoped columns of a row (the first row seen for this `ID`)
fn project_from_row(id: &str, row: &SheetRow) -> Project {
    Project {
        id: id.to_string(),
        buyer: row.text(columns::BUYER),
        main_family: row.text(columns::MAIN_FAMILY),
        title: row.text(columns::TITLE),
        amount_ttc: row.text_or(columns::AMOUNT_TTC, columns::AMOUNT_HT),
        prescriber: row.text(columns::PRESCRIBER),
        internal_client: row.text(columns::INTERNAL_CLIENT),
        status: row.text(columns::PROJECT_STATUS),
        programme: row.text(columns::PROGRAMME),
        operation: row.text(columns::OPERATION),
        strategy_deadline: row.date(columns::STRATEGY_DEADLINE),
        purchase_lever: row.text(columns::PURCHASE_LEVER),
        renewal: row.text(columns::RENEWAL),
        expected_performance: row.text(columns::EXPECTED_PERFORMANCE),
        savings_basis: row.text(columns::SAVINGS_BASIS),
        priority: row.text(columns::PRIORITY),
        purchase_committee: row.text(columns::PURCHASE_COMMITTEE),
        no_planned_date: row.date(columns::NO_PLANNED_DATE),
        no_codir_date: row.date(columns::NO_CODIR_DATE),
        no_signature_sent: row.date(columns::NO_SIGNATURE_SENT),
        no_validation_date: row.date(columns::NO_VALIDATION_DATE),
        no_validators: row.text_or(columns::NO_VALIDATORS, columns::VALIDATORS),
        no_status: row.text(columns::NO_STATUS),
        no_comment: row.text_or(columns::NO_COMMENT, columns::GENERAL_COMMENT),
        no_attachments: Vec::new(),
        validators: row.text(columns::VALIDATORS),
        general_comment: row.text(columns::GENERAL_COMMENT),
        procedures: Vec::new(),
    }
}

/// Procedure-scoped columns of a row
fn procedure_from_row(row: &SheetRow) -> Procedure {
    Procedure {
        id: row.text(columns::PROCEDURE_INTERNAL_ID).trim().to_string(),
        afpa_number: row.text(columns::AFPA_NUMBER),
        buyer: row.text_or(columns::PROCEDURE_BUYER, columns::BUYER),
        procedure_type: row.text(columns::PROCEDURE_TYPE),
        cpv_code: row.text(columns::CPV_CODE),
        amount_ht: row.text(columns::AMOUNT_HT),
        annual_savings: row.text(columns::ANNUAL_SAVINGS),
        contract_form: row.text(columns::CONTRACT_FORM),
        short_subject: row.text(columns::SHORT_SUBJECT),
        launch_date: row.date(columns::LAUNCH_DATE),
        applications_due: row.date(columns::APPLICATIONS_DUE),
        offers_due: row.date(columns::OFFERS_DUE),
        execution_start: row.date(columns::EXECUTION_START),
        execution_end: row.date(columns::EXECUTION_END),
        notification_date: row.date(columns::NOTIFICATION_DATE),
        duration_months: row.text(columns::DURATION_MONTHS),
        sub_families: row.list(columns::SUB_FAMILIES),
        withdrawals: row.text(columns::WITHDRAWALS),
        bidders: row.text(columns::BIDDERS),
        questions: row.text(columns::QUESTIONS),
        social_clauses: row.text(columns::SOCIAL_CLAUSES),
        environmental_clauses: row.text(columns::ENVIRONMENTAL_CLAUSES),
        open_to_innovation: row.text(columns::OPEN_TO_INNOVATION),
        sme_access: row.text(columns::SME_ACCESS),
        dce_written: row.date(columns::DCE_WRITTEN),
        offers_opened: row.date(columns::OFFERS_OPENED),
        rp_msa_date: row.date(columns::RP_MSA_DATE),
        rp_signature_sent: row.date(columns::RP_SIGNATURE_SENT),
        rp_validation_date: row.date(columns::RP_VALIDATION_DATE),
        rp_codir_date: row.date(columns::RP_CODIR_DATE),
        rp_comment: row.text(columns::RP_COMMENT),
        rp_attachments: Vec::new(),
        rejection_date: row.date(columns::REJECTION_DATE),
        award_notice: row.date(columns::AWARD_NOTICE),
        essential_data: row.date(columns::ESSENTIAL_DATA),
        purpose: row.text(columns::PURPOSE),
        consultation_status: row.text(columns::CONSULTATION_STATUS),
    }
}

/// Importer for project portfolio workbooks (.xlsx, .xls, .ods)
pub struct ProjectImporter {
    path: PathBuf,
}

impl ProjectImporter {
    /// Create a new importer for the workbook at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the header-keyed rows of the first worksheet only
    pub fn read_rows(&self) -> PortfolioResult<Vec<SheetRow>> {
        let mut workbook = open_workbook_auto(&self.path).map_err(|e| {
            PortfolioError::Import(format!(
                "Failed to open workbook {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PortfolioError::Import("Workbook has no worksheet".to_string()))?
            .map_err(|e| PortfolioError::Import(format!("Failed to read first worksheet: {}", e)))?;

        Ok(rows_from_range(&range))
    }

    /// Import the workbook into projects.
    ///
    /// Fails when the file cannot be read or when no row carries an `ID`.
    pub fn import(&self) -> PortfolioResult<Vec<Project>> {
        let rows = self.read_rows()?;
        let projects = group_rows(&rows);

        if projects.is_empty() {
            return Err(PortfolioError::EmptyImport);
        }

        info!(
            file = %self.path.display(),
            rows = rows.len(),
            projects = projects.len(),
            procedures = crate::types::procedure_count(&projects),
            "workbook imported"
        );
        Ok(projects)
    }
}

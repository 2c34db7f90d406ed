//! Afpa procedure numbers
//!
//! A procedure number reads `{yy}{seq} - {subject} - {trigram}`, e.g.
//! `24503 - Nettoyage des locaux - AMA`. The sequence restarts every year
//! at 500; the trigram comes from the buyer directory.

use crate::error::{PortfolioError, PortfolioResult};
use crate::excel::cell_text;
use crate::types::{Procedure, Project};
use calamine::{open_workbook_auto, Reader};
use chrono::Datelike;
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Trigram used when a buyer cannot be resolved
pub const UNKNOWN_TRIGRAM: &str = "ZZZ";

/// Highest sequence considered "used" before any procedure is numbered
const SEQUENCE_FLOOR: u64 = 499;

/// Resolves buyer names to three-letter codes
pub trait BuyerDirectory {
    /// Trigram for `name`, or [`UNKNOWN_TRIGRAM`]. Never fails.
    fn trigram_for(&self, name: &str) -> String;

    /// Known buyer names, unique and sorted
    fn buyers(&self) -> Vec<String>;
}

/// In-memory buyer directory (person → trigram)
#[derive(Debug, Clone, Default)]
pub struct BuyerRegistry {
    entries: Vec<(String, String)>,
}

impl BuyerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buyer(mut self, name: impl Into<String>, trigram: impl Into<String>) -> Self {
        self.add(name, trigram);
        self
    }

    pub fn add(&mut self, name: impl Into<String>, trigram: impl Into<String>) {
        self.entries.push((name.into(), trigram.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the buyer reference sheet (first worksheet).
    ///
    /// The person column is the header named `Personne` (any case), else the
    /// first column; the code column is the header named `Trigramme`.
    pub fn from_workbook<P: AsRef<Path>>(path: P) -> PortfolioResult<Self> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            PortfolioError::Import(format!(
                "Failed to open buyer reference {}: {}",
                path.display(),
                e
            ))
        })?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PortfolioError::Import("Buyer reference has no worksheet".to_string()))?
            .map_err(|e| PortfolioError::Import(format!("Failed to read buyer reference: {}", e)))?;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header) => header.iter().map(|c| cell_text(c).trim().to_lowercase()).collect(),
            None => return Ok(Self::new()),
        };
        let person_col = headers.iter().position(|h| h == "personne").unwrap_or(0);
        let trigram_col = headers.iter().position(|h| h == "trigramme");

        let mut registry = Self::new();
        for row in rows {
            let name = row.get(person_col).map(cell_text).unwrap_or_default();
            if name.trim().is_empty() {
                continue;
            }
            let trigram = trigram_col
                .and_then(|col| row.get(col))
                .map(cell_text)
                .unwrap_or_default();
            registry.add(name.trim(), trigram.trim());
        }

        debug!(buyers = registry.len(), "buyer reference loaded");
        Ok(registry)
    }
}

impl BuyerDirectory for BuyerRegistry {
    fn trigram_for(&self, name: &str) -> String {
        let wanted = name.trim().to_lowercase();
        if wanted.is_empty() {
            return UNKNOWN_TRIGRAM.to_string();
        }
        self.entries
            .iter()
            .find(|(person, _)| person.trim().to_lowercase() == wanted)
            .map(|(_, trigram)| trigram.trim().to_uppercase())
            .filter(|trigram| !trigram.is_empty())
            .unwrap_or_else(|| UNKNOWN_TRIGRAM.to_string())
    }

    fn buyers(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .map(|(person, _)| person.trim().to_string())
            .filter(|person| !person.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Current calendar year (local time)
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Next free number prefix for `year`: `{yy}{max sequence + 1}`.
///
/// Every procedure number starting with the two-digit year followed by at
/// least three digits counts; sequences start after 499.
pub fn next_procedure_prefix(projects: &[Project], year: i32) -> String {
    let yy = format!("{:02}", year.rem_euclid(100));
    let pattern = Regex::new(&format!(r"^{}(\d{{3,}})", yy)).expect("valid prefix regex");

    let max_seq = projects
        .iter()
        .flat_map(|p| p.procedures.iter())
        .filter_map(|proc| pattern.captures(&proc.afpa_number))
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .fold(SEQUENCE_FLOOR, u64::max);

    format!("{}{}", yy, max_seq + 1)
}

/// Display number `{prefix} - {subject} - {trigram}` (prefix cut to 5 chars)
pub fn build_procedure_number(prefix: &str, subject: &str, trigram: &str) -> String {
    let prefix: String = prefix.chars().take(5).collect();
    format!("{} - {} - {}", prefix, subject.trim(), trigram)
}

/// Regenerate the number of one procedure.
///
/// The procedure's own buyer is used for the trigram, else the project's.
pub fn assign_procedure_number(
    projects: &mut [Project],
    project_id: &str,
    procedure_id: &str,
    directory: &dyn BuyerDirectory,
    year: i32,
) -> PortfolioResult<String> {
    let prefix = next_procedure_prefix(projects, year);

    let project = find_project_mut(projects, project_id)?;
    let project_buyer = project.buyer.clone();
    let procedure = project.procedure_mut(procedure_id).ok_or_else(|| {
        PortfolioError::Validation(format!(
            "Procedure '{}' not found in project '{}'",
            procedure_id, project_id
        ))
    })?;

    let buyer = if procedure.buyer.trim().is_empty() {
        project_buyer
    } else {
        procedure.buyer.clone()
    };
    let number = build_procedure_number(
        &prefix,
        &procedure.short_subject,
        &directory.trigram_for(&buyer),
    );
    procedure.afpa_number = number.clone();
    Ok(number)
}

/// Append a blank procedure to a project and return its id.
///
/// The id is `{ID}-P{n}` with `n` one past the current count (bumped while
/// taken); buyer is inherited from the project and a number is generated.
pub fn add_procedure(
    projects: &mut [Project],
    project_id: &str,
    directory: &dyn BuyerDirectory,
    year: i32,
) -> PortfolioResult<String> {
    let prefix = next_procedure_prefix(projects, year);
    let project = find_project_mut(projects, project_id)?;

    let mut n = project.procedures.len() + 1;
    let mut id = format!("{}-P{}", project.id, n);
    while project.procedure(&id).is_some() {
        n += 1;
        id = format!("{}-P{}", project.id, n);
    }

    let trigram = directory.trigram_for(&project.buyer);
    project.procedures.push(Procedure {
        id: id.clone(),
        afpa_number: build_procedure_number(&prefix, "", &trigram),
        buyer: project.buyer.clone(),
        ..Default::default()
    });
    Ok(id)
}

fn find_project_mut<'a>(
    projects: &'a mut [Project],
    project_id: &str,
) -> PortfolioResult<&'a mut Project> {
    projects
        .iter_mut()
        .find(|p| p.id == project_id)
        .ok_or_else(|| PortfolioError::Validation(format!("Project '{}' not found", project_id)))
}

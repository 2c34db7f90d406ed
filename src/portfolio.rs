//! Portfolio listing: filters, ordering and summary statistics
//!
//! Project and procedure lists are ordered by identifier, descending, with
//! numbers inside identifiers compared by value (`10` after `9`).

use crate::amounts::sum_amounts;
use crate::types::{Procedure, Project};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

/// Label for projects or procedures with a blank status/priority/type
pub const UNDEFINED_LABEL: &str = "Non défini";
/// Label for procedures without a buyer
pub const UNASSIGNED_LABEL: &str = "Non assigné";

const TOP_STATUSES: usize = 6;
const TOP_BUYERS: usize = 8;

//==============================================================================
// Ordering
//==============================================================================

/// Numeric-aware, case-insensitive string ordering
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ord = compare_digit_runs(&take_digits(&mut left), &take_digits(&mut right));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                left.next();
                right.next();
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Non-empty values, deduplicated and sorted
pub fn unique_values<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut unique: Vec<String> = values
        .into_iter()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    unique.sort();
    unique.dedup();
    unique
}

//==============================================================================
// Projects
//==============================================================================

/// Project list filter; empty fields do not filter
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-insensitive match on title or ID
    pub search: String,
    /// Accepted statuses (empty = any)
    pub statuses: Vec<String>,
    pub buyer: Option<String>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        let search = self.search.trim().to_lowercase();
        let matches_search = search.is_empty()
            || project.title.to_lowercase().contains(&search)
            || project.id.to_lowercase().contains(&search);
        let matches_status = self.statuses.is_empty() || self.statuses.contains(&project.status);
        let matches_buyer = self.buyer.as_ref().map_or(true, |b| &project.buyer == b);

        matches_search && matches_status && matches_buyer
    }
}

/// Matching projects, highest ID first
pub fn filter_projects<'a>(projects: &'a [Project], filter: &ProjectFilter) -> Vec<&'a Project> {
    let mut selected: Vec<&Project> = projects.iter().filter(|p| filter.matches(p)).collect();
    selected.sort_by(|a, b| natural_cmp(&b.id, &a.id));
    selected
}

/// Statuses selected by default: every status except finished or abandoned ones
pub fn default_statuses(projects: &[Project]) -> Vec<String> {
    unique_values(projects.iter().map(|p| p.status.as_str()))
        .into_iter()
        .filter(|status| {
            let lower = status.to_lowercase();
            !lower.contains("terminé") && !lower.contains("abandonné")
        })
        .collect()
}

/// Statuses a project listing keeps: the requested ones, any status when
/// `show_all`, otherwise [`default_statuses`]
pub fn status_selection(projects: &[Project], requested: Vec<String>, show_all: bool) -> Vec<String> {
    if !requested.is_empty() {
        requested
    } else if show_all {
        Vec::new()
    } else {
        default_statuses(projects)
    }
}

/// Sum of the procedure HT amounts of a project
pub fn procedures_total_ht(project: &Project) -> f64 {
    sum_amounts(project.procedures.iter().map(|p| p.amount_ht.as_str()))
}

/// Count per label, highest count first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub name: String,
    pub value: usize,
}

fn breakdown<'a, I>(labels: I, fallback: &str, limit: Option<usize>) -> Vec<Breakdown>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        let key = if label.is_empty() { fallback } else { label };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }

    let mut entries: Vec<Breakdown> = counts
        .into_iter()
        .map(|(name, value)| Breakdown { name, value })
        .collect();
    entries.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}

/// Headline figures of a set of projects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub project_count: usize,
    pub procedure_count: usize,
    /// Sum of the projects' TTC amounts
    pub total_ttc: f64,
    /// Sum of every procedure HT amount
    pub total_procedures_ht: f64,
    /// Projects whose priority mentions P1
    pub p1_count: usize,
    /// Projects whose status mentions "terminé"
    pub finished_count: usize,
    /// Top statuses
    pub by_status: Vec<Breakdown>,
    pub by_priority: Vec<Breakdown>,
}

pub fn summarize<'a, I>(projects: I) -> PortfolioSummary
where
    I: IntoIterator<Item = &'a Project>,
{
    let projects: Vec<&Project> = projects.into_iter().collect();

    PortfolioSummary {
        project_count: projects.len(),
        procedure_count: projects.iter().map(|p| p.procedures.len()).sum(),
        total_ttc: sum_amounts(projects.iter().map(|p| p.amount_ttc.as_str())),
        total_procedures_ht: projects.iter().map(|p| procedures_total_ht(p)).sum(),
        p1_count: projects.iter().filter(|p| p.priority.contains("P1")).count(),
        finished_count: projects
            .iter()
            .filter(|p| p.status.to_lowercase().contains("terminé"))
            .count(),
        by_status: breakdown(
            projects.iter().map(|p| p.status.as_str()),
            UNDEFINED_LABEL,
            Some(TOP_STATUSES),
        ),
        by_priority: breakdown(
            projects.iter().map(|p| p.priority.as_str()),
            UNDEFINED_LABEL,
            None,
        ),
    }
}

//==============================================================================
// Procedures
//==============================================================================

/// A procedure together with its owning project
#[derive(Debug, Clone, Copy)]
pub struct ProcedureEntry<'a> {
    pub project: &'a Project,
    pub procedure: &'a Procedure,
}

/// Every procedure of every project, in portfolio order
pub fn procedure_entries(projects: &[Project]) -> Vec<ProcedureEntry<'_>> {
    projects
        .iter()
        .flat_map(|project| {
            project
                .procedures
                .iter()
                .map(move |procedure| ProcedureEntry { project, procedure })
        })
        .collect()
}

/// Procedure list filter; empty fields do not filter
#[derive(Debug, Clone, Default)]
pub struct ProcedureFilter {
    /// Case-insensitive match on id, Afpa number, project title or subject
    pub search: String,
    pub procedure_type: Option<String>,
    pub buyer: Option<String>,
}

impl ProcedureFilter {
    pub fn matches(&self, entry: &ProcedureEntry<'_>) -> bool {
        let search = self.search.trim().to_lowercase();
        let procedure = entry.procedure;
        let matches_search = procedure.id.to_lowercase().contains(&search)
            || procedure.afpa_number.to_lowercase().contains(&search)
            || entry.project.title.to_lowercase().contains(&search)
            || procedure.short_subject.to_lowercase().contains(&search);
        let matches_type = self
            .procedure_type
            .as_ref()
            .map_or(true, |t| &procedure.procedure_type == t);
        let matches_buyer = self.buyer.as_ref().map_or(true, |b| &procedure.buyer == b);

        matches_search && matches_type && matches_buyer
    }
}

/// Matching procedures, highest procedure id first
pub fn filter_procedures<'a>(
    projects: &'a [Project],
    filter: &ProcedureFilter,
) -> Vec<ProcedureEntry<'a>> {
    let mut selected: Vec<ProcedureEntry<'a>> = procedure_entries(projects)
        .into_iter()
        .filter(|entry| filter.matches(entry))
        .collect();
    selected.sort_by(|a, b| natural_cmp(&b.procedure.id, &a.procedure.id));
    selected
}

/// Figures of a procedure list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureStats {
    pub count: usize,
    pub total_ht: f64,
    pub average_ht: f64,
    pub by_type: Vec<Breakdown>,
    /// Top buyers
    pub by_buyer: Vec<Breakdown>,
}

pub fn procedure_stats(entries: &[ProcedureEntry<'_>]) -> ProcedureStats {
    let count = entries.len();
    let total_ht = sum_amounts(entries.iter().map(|e| e.procedure.amount_ht.as_str()));

    ProcedureStats {
        count,
        total_ht,
        average_ht: if count > 0 { total_ht / count as f64 } else { 0.0 },
        by_type: breakdown(
            entries.iter().map(|e| e.procedure.procedure_type.as_str()),
            UNDEFINED_LABEL,
            None,
        ),
        by_buyer: breakdown(
            entries.iter().map(|e| e.procedure.buyer.as_str()),
            UNASSIGNED_LABEL,
            Some(TOP_BUYERS),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn project(id: &str, title: &str, status: &str) -> Project {
        Project {
            id: id.to_string(),
            title: title.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn procedure(id: &str, kind: &str, buyer: &str, amount: &str) -> Procedure {
        Procedure {
            id: id.to_string(),
            procedure_type: kind.to_string(),
            buyer: buyer.to_string(),
            amount_ht: amount.to_string(),
            ..Default::default()
        }
    }

    fn sample() -> Vec<Project> {
        let mut a = project("9", "Nettoyage", "En cours");
        a.amount_ttc = "120 000 €".to_string();
        a.priority = "P1 - Urgent".to_string();
        a.buyer = "Alice Martin".to_string();
        a.procedures = vec![
            procedure("9-P1", "AOO", "Alice Martin", "50 000"),
            procedure("9-P2", "MAPA", "", "10 000,50"),
        ];

        let mut b = project("10", "Gardiennage", "Terminé");
        b.amount_ttc = "abc".to_string();
        b.priority = "P2".to_string();
        b.procedures = vec![procedure("10-P1", "AOO", "Bruno Petit", "")];

        let c = project("2", "Flotte automobile", "");
        vec![a, b, c]
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("9", "10"), Ordering::Less);
        assert_eq!(natural_cmp("P10", "P9"), Ordering::Greater);
        assert_eq!(natural_cmp("42-P2", "42-P10"), Ordering::Less);
        assert_eq!(natural_cmp("abc", "ABD"), Ordering::Less);
        assert_eq!(natural_cmp("007", "7"), Ordering::Less);
        assert_eq!(natural_cmp("a", "a"), Ordering::Equal);
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
    }

    #[test]
    fn test_filter_projects_sorted_desc() {
        let projects = sample();
        let ids: Vec<&str> = filter_projects(&projects, &ProjectFilter::default())
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["10", "9", "2"]);
    }

    #[test]
    fn test_filter_projects_by_search_status_buyer() {
        let projects = sample();

        let filter = ProjectFilter {
            search: " NETTO ".to_string(),
            ..Default::default()
        };
        assert_eq!(filter_projects(&projects, &filter).len(), 1);

        let filter = ProjectFilter {
            statuses: vec!["Terminé".to_string(), "".to_string()],
            ..Default::default()
        };
        let ids: Vec<&str> = filter_projects(&projects, &filter)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["10", "2"]);

        let filter = ProjectFilter {
            buyer: Some("Alice Martin".to_string()),
            ..Default::default()
        };
        assert_eq!(filter_projects(&projects, &filter)[0].id, "9");
    }

    #[test]
    fn test_default_statuses_exclude_closed() {
        let mut projects = sample();
        projects.push(project("3", "", "Abandonné"));
        projects.push(project("4", "", "En attente"));
        assert_eq!(default_statuses(&projects), vec!["En attente", "En cours"]);
    }

    #[test]
    fn test_status_selection_hides_closed_by_default() {
        let projects = sample();

        let filter = ProjectFilter {
            statuses: status_selection(&projects, vec![], false),
            ..Default::default()
        };
        let ids: Vec<&str> = filter_projects(&projects, &filter)
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["9"]);

        assert!(status_selection(&projects, vec![], true).is_empty());
        assert_eq!(
            status_selection(&projects, vec!["Terminé".to_string()], false),
            vec!["Terminé"]
        );
    }

    #[test]
    fn test_status_selection_only_closed_projects_keeps_all() {
        let projects = vec![project("1", "", "Terminé"), project("2", "", "Abandonné")];
        let filter = ProjectFilter {
            statuses: status_selection(&projects, vec![], false),
            ..Default::default()
        };
        assert_eq!(filter_projects(&projects, &filter).len(), 2);
    }

    #[test]
    fn test_summary() {
        let projects = sample();
        let summary = summarize(&projects);

        assert_eq!(summary.project_count, 3);
        assert_eq!(summary.procedure_count, 3);
        assert_eq!(summary.total_ttc, 120_000.0);
        assert_eq!(summary.total_procedures_ht, 60_000.5);
        assert_eq!(summary.p1_count, 1);
        assert_eq!(summary.finished_count, 1);
        assert_eq!(summary.by_status.len(), 3);
        assert!(summary
            .by_status
            .contains(&Breakdown { name: UNDEFINED_LABEL.to_string(), value: 1 }));
        assert_eq!(summary.by_priority[0].value, 1);
    }

    #[test]
    fn test_filter_procedures() {
        let projects = sample();

        let all = filter_procedures(&projects, &ProcedureFilter::default());
        let ids: Vec<&str> = all.iter().map(|e| e.procedure.id.as_str()).collect();
        assert_eq!(ids, vec!["10-P1", "9-P2", "9-P1"]);

        let aoo = filter_procedures(
            &projects,
            &ProcedureFilter {
                procedure_type: Some("AOO".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(aoo.len(), 2);

        let by_title = filter_procedures(
            &projects,
            &ProcedureFilter {
                search: "garDIEN".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].project.id, "10");

        let padded = filter_procedures(
            &projects,
            &ProcedureFilter {
                search: "  9-p2 ".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(padded.len(), 1);
        assert_eq!(padded[0].procedure.id, "9-P2");
    }

    #[test]
    fn test_procedure_stats() {
        let projects = sample();
        let entries = procedure_entries(&projects);
        let stats = procedure_stats(&entries);

        assert_eq!(stats.count, 3);
        assert_eq!(stats.total_ht, 60_000.5);
        assert!((stats.average_ht - 20_000.1666).abs() < 0.001);
        assert_eq!(
            stats.by_type,
            vec![
                Breakdown { name: "AOO".to_string(), value: 2 },
                Breakdown { name: "MAPA".to_string(), value: 1 },
            ]
        );
        assert!(stats
            .by_buyer
            .contains(&Breakdown { name: UNASSIGNED_LABEL.to_string(), value: 1 }));
    }

    #[test]
    fn test_procedure_stats_empty() {
        let stats = procedure_stats(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average_ht, 0.0);
    }

    #[test]
    fn test_unique_values() {
        assert_eq!(unique_values(["b", "", "a", "b"]), vec!["a", "b"]);
    }
}

use crate::amounts::{format_currency, format_size, parse_amount};
use crate::attachments::{attachment_path, AttachmentStore};
use crate::config::AppConfig;
use crate::dates::format_date_fr;
use crate::error::{PortfolioError, PortfolioResult};
use crate::excel::{ProcedureExporter, ProjectImporter};
use crate::numbering::{self, BuyerDirectory};
use crate::portfolio::{
    filter_procedures, filter_projects, procedure_entries, procedure_stats, status_selection,
    summarize, Breakdown, ProcedureFilter, ProjectFilter,
};
use crate::store::ProjectStore;
use crate::types::{procedure_count, Attachment, Project};
use chrono::Utc;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Cut `text` to `width` characters, marking the cut with `…`
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// `-` for blank values
fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

fn print_breakdown(title: &str, entries: &[Breakdown]) {
    if entries.is_empty() {
        return;
    }
    println!("   {}", title.bold().cyan());
    for entry in entries {
        println!("      {:<32} {}", entry.name, entry.value.to_string().bold());
    }
}

/// Index of the project `id` in `projects`
fn project_index(projects: &[Project], id: &str) -> PortfolioResult<usize> {
    projects
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| PortfolioError::Validation(format!("Project '{}' not found", id)))
}

/// Execute the import command
pub fn import(config: &AppConfig, input: PathBuf, replace: bool, verbose: bool) -> PortfolioResult<()> {
    println!("{}", "📥 Portfolio - Excel Import".bold().green());
    println!("   Input: {}", input.display());
    println!("   Store: {}\n", config.store_path.display());

    if verbose {
        println!("{}", "📖 Reading first worksheet...".cyan());
    }

    let projects = ProjectImporter::new(&input).import()?;
    let procedures = procedure_count(&projects);

    if verbose {
        println!(
            "   Found {} projects, {} procedures\n",
            projects.len(),
            procedures
        );
    }

    let mut store = config.store();
    if replace {
        if verbose {
            println!("{}", "🧹 Clearing existing projects...".cyan());
        }
        store.clear()?;
    }
    let saved = store.bulk_upsert(&projects)?;

    println!("{}", "✅ Import Complete!".bold().green());
    println!("   Projects saved:   {}", saved.to_string().bold());
    println!("   Procedures:       {}\n", procedures.to_string().bold());

    Ok(())
}

/// Execute the export command
pub fn export(config: &AppConfig, output: Option<PathBuf>, verbose: bool) -> PortfolioResult<()> {
    let output = output.unwrap_or_else(|| PathBuf::from(&config.export_file_name));

    println!("{}", "📤 Portfolio - Excel Export".bold().green());
    println!("   Store:  {}", config.store_path.display());
    println!("   Output: {}\n", output.display());

    let projects = config.store().fetch_all()?;
    let exporter = ProcedureExporter::new(&projects);

    if verbose {
        println!(
            "   {} projects → {} procedure rows\n",
            projects.len(),
            exporter.rows().len()
        );
    }

    exporter.export(&output)?;

    println!("{}", "✅ Export Complete!".bold().green());
    println!("   Excel file: {}", output.display());
    println!("   Rows:       {}\n", exporter.rows().len().to_string().bold());

    Ok(())
}

/// Project filter of the projects command; closed statuses are hidden
/// unless requested or `show_all`
fn project_filter(
    all: &[Project],
    search: Option<String>,
    statuses: Vec<String>,
    buyer: Option<String>,
    show_all: bool,
) -> ProjectFilter {
    ProjectFilter {
        search: search.unwrap_or_default(),
        statuses: status_selection(all, statuses, show_all),
        buyer,
    }
}

/// Execute the projects command - list projects
pub fn projects(
    config: &AppConfig,
    search: Option<String>,
    statuses: Vec<String>,
    buyer: Option<String>,
    show_all: bool,
) -> PortfolioResult<()> {
    let all = config.store().fetch_all()?;
    let filter = project_filter(&all, search, statuses, buyer, show_all);
    let selected = filter_projects(&all, &filter);

    println!("{}", "📁 Portfolio - Projects".bold().green());
    println!("   {} of {} projects\n", selected.len(), all.len());

    if selected.is_empty() {
        println!("{}", "   No project matches.".yellow());
        return Ok(());
    }

    for project in &selected {
        println!(
            "   {} {}",
            format!("#{}", project.id).bright_blue().bold(),
            truncate(or_dash(&project.title), 60)
        );
        println!(
            "      {} · {} · {} · {} procedure(s)",
            or_dash(&project.status).cyan(),
            or_dash(&project.buyer),
            format_currency(parse_amount(&project.amount_ttc)).bold(),
            project.procedures.len()
        );
    }

    let summary = summarize(selected.iter().copied());
    println!();
    println!(
        "   Total TTC: {}",
        format_currency(summary.total_ttc).bold().green()
    );

    Ok(())
}

/// Execute the procedures command - list procedures
pub fn procedures(
    config: &AppConfig,
    search: Option<String>,
    procedure_type: Option<String>,
    buyer: Option<String>,
) -> PortfolioResult<()> {
    let all = config.store().fetch_all()?;
    let filter = ProcedureFilter {
        search: search.unwrap_or_default(),
        procedure_type,
        buyer,
    };
    let selected = filter_procedures(&all, &filter);

    println!("{}", "📋 Portfolio - Procedures".bold().green());
    println!("   {} of {} procedures\n", selected.len(), procedure_count(&all));

    if selected.is_empty() {
        println!("{}", "   No procedure matches.".yellow());
        return Ok(());
    }

    for entry in &selected {
        let procedure = entry.procedure;
        println!(
            "   {} {}",
            procedure.id.bright_blue().bold(),
            or_dash(&procedure.afpa_number)
        );
        println!(
            "      {} · {} · {} · launched {} · project: {}",
            or_dash(&procedure.procedure_type).cyan(),
            or_dash(&procedure.buyer),
            format_currency(parse_amount(&procedure.amount_ht)).bold(),
            format_date_fr(&procedure.launch_date),
            truncate(or_dash(&entry.project.title), 40)
        );
    }

    let stats = procedure_stats(&selected);
    println!();
    println!("   Total HT:   {}", format_currency(stats.total_ht).bold().green());
    println!("   Average HT: {}", format_currency(stats.average_ht).bold());

    Ok(())
}

/// Execute the summary command
pub fn summary(config: &AppConfig) -> PortfolioResult<()> {
    let all = config.store().fetch_all()?;
    let summary = summarize(&all);
    let entries = procedure_entries(&all);
    let stats = procedure_stats(&entries);

    println!("{}", "📊 Portfolio - Summary".bold().green());
    println!("   Store: {}\n", config.store_path.display());

    println!("   Projects:          {}", summary.project_count.to_string().bold());
    println!("   Procedures:        {}", summary.procedure_count.to_string().bold());
    println!("   P1 projects:       {}", summary.p1_count.to_string().bold());
    println!("   Finished projects: {}", summary.finished_count.to_string().bold());
    println!(
        "   Total TTC:         {}",
        format_currency(summary.total_ttc).bold().green()
    );
    println!(
        "   Procedures HT:     {}\n",
        format_currency(summary.total_procedures_ht).bold().green()
    );

    print_breakdown("By status", &summary.by_status);
    print_breakdown("By priority", &summary.by_priority);
    print_breakdown("By procedure type", &stats.by_type);
    print_breakdown("By buyer", &stats.by_buyer);
    println!();

    Ok(())
}

/// Execute the number command - regenerate an Afpa procedure number
pub fn number(
    config: &AppConfig,
    project_id: String,
    procedure_id: String,
    year: Option<i32>,
) -> PortfolioResult<()> {
    let mut store = config.store();
    let mut all = store.fetch_all()?;
    let directory = config.buyers();
    let year = year.unwrap_or_else(numbering::current_year);

    let number =
        numbering::assign_procedure_number(&mut all, &project_id, &procedure_id, &directory, year)?;
    let index = project_index(&all, &project_id)?;
    store.upsert(&all[index])?;

    println!("{}", "🔢 Portfolio - Procedure Number".bold().green());
    println!("   Procedure: {}", procedure_id.bright_blue());
    println!("   Number:    {}\n", number.bold().green());

    Ok(())
}

/// Execute the add-procedure command
pub fn add_procedure(config: &AppConfig, project_id: String, year: Option<i32>) -> PortfolioResult<()> {
    let mut store = config.store();
    let mut all = store.fetch_all()?;
    let directory = config.buyers();
    let year = year.unwrap_or_else(numbering::current_year);

    let procedure_id = numbering::add_procedure(&mut all, &project_id, &directory, year)?;
    let index = project_index(&all, &project_id)?;
    store.upsert(&all[index])?;

    let number = all[index]
        .procedure(&procedure_id)
        .map(|p| p.afpa_number.clone())
        .unwrap_or_default();

    println!("{}", "➕ Portfolio - New Procedure".bold().green());
    println!("   Project:   {}", project_id.bright_blue());
    println!("   Procedure: {}", procedure_id.bold());
    println!("   Number:    {}", number.bold().green());
    if directory.buyers().is_empty() {
        println!(
            "{}",
            "   ⚠️  No buyer reference configured, trigram defaults to ZZZ".yellow()
        );
    }
    println!();

    Ok(())
}

/// Execute the attach command - upload a file to a project or procedure
pub fn attach(
    config: &AppConfig,
    project_id: String,
    file: PathBuf,
    procedure_id: Option<String>,
) -> PortfolioResult<()> {
    let mut store = config.store();
    let mut all = store.fetch_all()?;
    let index = project_index(&all, &project_id)?;

    let name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PortfolioError::Attachment(format!("Invalid file name: {}", file.display()))
        })?
        .to_string();
    let bytes = fs::read(&file)?;

    let path = attachment_path(
        &project_id,
        procedure_id.as_deref(),
        &name,
        Utc::now().timestamp_millis(),
    );
    debug!(path = %path, "uploading attachment");

    let project = &mut all[index];
    let list: &mut Vec<Attachment> = match &procedure_id {
        Some(pid) => {
            let procedure = project.procedure_mut(pid).ok_or_else(|| {
                PortfolioError::Validation(format!(
                    "Procedure '{}' not found in project '{}'",
                    pid, project_id
                ))
            })?;
            &mut procedure.rp_attachments
        }
        None => &mut project.no_attachments,
    };

    let bucket = config.attachment_store();
    let attachment = bucket.upload(&name, &bytes, &path)?;
    list.push(attachment.clone());
    if let Err(e) = store.upsert(&all[index]) {
        if let Err(cleanup) = bucket.delete(&attachment.path) {
            warn!(path = %attachment.path, error = %cleanup, "uploaded attachment left in bucket");
        }
        return Err(e);
    }

    println!("{}", "📎 Portfolio - Attachment Added".bold().green());
    println!("   File: {} ({})", attachment.name.bold(), format_size(attachment.size));
    println!("   Path: {}", attachment.path);
    println!("   URL:  {}\n", attachment.url.cyan());

    Ok(())
}

/// Execute the detach command - delete an attachment
pub fn detach(
    config: &AppConfig,
    project_id: String,
    path: String,
    procedure_id: Option<String>,
) -> PortfolioResult<()> {
    let mut store = config.store();
    let mut all = store.fetch_all()?;
    let index = project_index(&all, &project_id)?;

    let project = &mut all[index];
    let list: &mut Vec<Attachment> = match &procedure_id {
        Some(pid) => {
            &mut project
                .procedure_mut(pid)
                .ok_or_else(|| {
                    PortfolioError::Validation(format!(
                        "Procedure '{}' not found in project '{}'",
                        pid, project_id
                    ))
                })?
                .rp_attachments
        }
        None => &mut project.no_attachments,
    };

    config.attachment_store().delete(&path)?;
    let before = list.len();
    list.retain(|a| a.path != path);
    let removed = before - list.len();
    store.upsert(&all[index])?;

    println!("{}", "🗑️  Portfolio - Attachment Deleted".bold().green());
    println!("   Path: {}", path);
    if removed == 0 {
        println!(
            "{}",
            "   ⚠️  File was not listed on the project".yellow()
        );
    }
    println!();

    Ok(())
}

/// Execute the clear command - remove every stored project
pub fn clear(config: &AppConfig) -> PortfolioResult<()> {
    let mut store = config.store();
    let count = store.fetch_all()?.len();
    store.clear()?;

    println!("{}", "🧹 Portfolio - Store Cleared".bold().green());
    println!("   Removed {} projects from {}\n", count, config.store_path.display());

    Ok(())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;

use super::*;
use crate::attachments::DEFAULT_BUCKET;
use crate::types::Procedure;
use rust_xlsxwriter::Workbook;
use std::io::Write;
use tempfile::TempDir;

// =========================================================================
// Helpers
// =========================================================================

fn test_config(dir: &TempDir) -> AppConfig {
    AppConfig {
        store_path: dir.path().join("projects.json"),
        attachments_dir: dir.path().join("files"),
        public_base_url: "http://localhost/files".to_string(),
        ..Default::default()
    }
}

fn seed(config: &AppConfig, projects: &[Project]) {
    config.store().bulk_upsert(projects).unwrap();
}

fn project_with_procedure(id: &str) -> Project {
    let mut project = Project::new(id);
    project.title = format!("Projet {}", id);
    project.buyer = "Alice Martin".to_string();
    project.procedures.push(Procedure {
        id: format!("{}-P1", id),
        short_subject: "Nettoyage".to_string(),
        ..Default::default()
    });
    project
}

fn create_workbook(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("suivi.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let rows = [
        ["ID", "Titre du dossier", "Procedure_ID_Interne", "Objet court"],
        ["42", "Nettoyage", "", "Lot 1"],
        ["42", "Nettoyage", "", "Lot 2"],
        ["7", "Gardiennage", "7-A", "Sites Nord"],
    ];
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.write_string(r as u32, c as u16, *value).unwrap();
        }
    }
    workbook.save(&path).unwrap();
    path
}

// =========================================================================
// Formatting helpers
// =========================================================================

#[test]
fn test_truncate() {
    assert_eq!(truncate("court", 10), "court");
    assert_eq!(truncate("Marché de nettoyage", 8), "Marché …");
}

#[test]
fn test_or_dash() {
    assert_eq!(or_dash(""), "-");
    assert_eq!(or_dash("  "), "-");
    assert_eq!(or_dash("P1"), "P1");
}

#[test]
fn test_project_index() {
    let projects = vec![Project::new("1"), Project::new("2")];
    assert_eq!(project_index(&projects, "2").unwrap(), 1);
    assert!(matches!(
        project_index(&projects, "3"),
        Err(PortfolioError::Validation(_))
    ));
}

// =========================================================================
// Import / export
// =========================================================================

#[test]
fn test_import_saves_grouped_projects() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let input = create_workbook(&dir);

    import(&config, input, false, true).unwrap();

    let stored = config.store().fetch_all().unwrap();
    assert_eq!(stored.len(), 2);
    let p42 = stored.iter().find(|p| p.id == "42").unwrap();
    let ids: Vec<&str> = p42.procedures.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["42-P1", "42-P2"]);
}

#[test]
fn test_import_replace_clears_previous_projects() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[Project::new("999")]);

    import(&config, create_workbook(&dir), true, false).unwrap();

    let stored = config.store().fetch_all().unwrap();
    assert!(stored.iter().all(|p| p.id != "999"));
    assert_eq!(stored.len(), 2);
}

#[test]
fn test_import_of_non_workbook_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let path = dir.path().join("notes.xlsx");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"not a spreadsheet").unwrap();

    assert!(import(&config, path, false, false).is_err());
    assert!(config.store().fetch_all().unwrap().is_empty());
}

#[test]
fn test_export_writes_file() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);
    let output = dir.path().join("out.xlsx");

    export(&config, Some(output.clone()), false).unwrap();

    assert!(output.exists());
}

// =========================================================================
// Listing
// =========================================================================

#[test]
fn test_listing_commands_on_empty_store() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    assert!(projects(&config, None, vec![], None, false).is_ok());
    assert!(procedures(&config, None, None, None).is_ok());
    assert!(summary(&config).is_ok());
}

#[test]
fn test_listing_commands_with_filters() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1"), project_with_procedure("2")]);

    assert!(projects(&config, Some("projet 2".into()), vec![], Some("Alice Martin".into()), false).is_ok());
    assert!(projects(&config, None, vec![], None, true).is_ok());
    assert!(procedures(&config, Some("nettoyage".into()), None, None).is_ok());
    assert!(summary(&config).is_ok());
}

#[test]
fn test_project_filter_hides_closed_projects_by_default() {
    let mut open = project_with_procedure("1");
    open.status = "En cours".to_string();
    let mut finished = project_with_procedure("2");
    finished.status = "Terminé".to_string();
    let mut abandoned = project_with_procedure("3");
    abandoned.status = "Abandonné".to_string();
    let all = vec![open, finished, abandoned];

    let ids = |filter: &ProjectFilter| -> Vec<String> {
        filter_projects(&all, filter).iter().map(|p| p.id.clone()).collect()
    };

    assert_eq!(ids(&project_filter(&all, None, vec![], None, false)), vec!["1"]);
    assert_eq!(ids(&project_filter(&all, None, vec![], None, true)), vec!["3", "2", "1"]);
    assert_eq!(
        ids(&project_filter(&all, None, vec!["Terminé".to_string()], None, false)),
        vec!["2"]
    );
}

// =========================================================================
// Numbering
// =========================================================================

#[test]
fn test_number_updates_store() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);

    number(&config, "1".into(), "1-P1".into(), Some(2024)).unwrap();

    let stored = config.store().fetch("1").unwrap().unwrap();
    assert_eq!(stored.procedures[0].afpa_number, "24500 - Nettoyage - ZZZ");
}

#[test]
fn test_number_unknown_procedure() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);

    assert!(number(&config, "1".into(), "1-P9".into(), Some(2024)).is_err());
}

#[test]
fn test_add_procedure_persists() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);

    add_procedure(&config, "1".into(), Some(2024)).unwrap();

    let stored = config.store().fetch("1").unwrap().unwrap();
    assert_eq!(stored.procedures.len(), 2);
    assert_eq!(stored.procedures[1].id, "1-P2");
    assert_eq!(stored.procedures[1].buyer, "Alice Martin");
}

// =========================================================================
// Attachments
// =========================================================================

#[test]
fn test_attach_and_detach_project_file() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);
    let file = dir.path().join("Note opportunité.pdf");
    std::fs::write(&file, b"%PDF").unwrap();

    attach(&config, "1".into(), file, None).unwrap();

    let stored = config.store().fetch("1").unwrap().unwrap();
    assert_eq!(stored.no_attachments.len(), 1);
    let path = stored.no_attachments[0].path.clone();
    assert!(path.starts_with("project_1/no/"));
    assert!(path.ends_with("_Note_opportunite.pdf"));
    assert!(config.attachments_dir.join(DEFAULT_BUCKET).join(&path).exists());

    detach(&config, "1".into(), path, None).unwrap();
    let stored = config.store().fetch("1").unwrap().unwrap();
    assert!(stored.no_attachments.is_empty());
}

#[test]
fn test_attach_to_procedure() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);
    let file = dir.path().join("rapport.docx");
    std::fs::write(&file, b"docx").unwrap();

    attach(&config, "1".into(), file, Some("1-P1".into())).unwrap();

    let stored = config.store().fetch("1").unwrap().unwrap();
    let attachments = &stored.procedures[0].rp_attachments;
    assert_eq!(attachments.len(), 1);
    assert!(attachments[0].path.starts_with("project_1/procedure_1-P1/rp/"));
}

#[test]
fn test_detach_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);

    let result = detach(&config, "1".into(), "project_1/no/absent.pdf".into(), None);
    assert!(matches!(result, Err(PortfolioError::Attachment(_))));
}

#[test]
fn test_detach_outside_bucket_keeps_file() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);
    let outside = dir.path().join("rapport.pdf");
    std::fs::write(&outside, b"%PDF").unwrap();

    let absolute = detach(&config, "1".into(), outside.to_string_lossy().into_owned(), None);
    assert!(matches!(absolute, Err(PortfolioError::Attachment(_))));

    let parent = detach(&config, "1".into(), "../../rapport.pdf".into(), None);
    assert!(matches!(parent, Err(PortfolioError::Attachment(_))));

    assert!(outside.exists());
}

#[test]
fn test_attach_removes_upload_when_store_write_fails() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[project_with_procedure("1")]);
    let file = dir.path().join("note.pdf");
    std::fs::write(&file, b"%PDF").unwrap();
    // The store writes through `projects.json.tmp`; a directory there makes the write fail
    std::fs::create_dir(config.store_path.with_extension("json.tmp")).unwrap();

    let result = attach(&config, "1".into(), file, None);

    assert!(result.is_err());
    let project_dir = config.attachments_dir.join(DEFAULT_BUCKET).join("project_1/no");
    let leftovers = std::fs::read_dir(&project_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
    assert!(config.store().fetch("1").unwrap().unwrap().no_attachments.is_empty());
}

#[test]
fn test_clear() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    seed(&config, &[Project::new("1"), Project::new("2")]);

    clear(&config).unwrap();

    assert!(config.store().fetch_all().unwrap().is_empty());
}

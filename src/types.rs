use serde::{Deserialize, Serialize};

//==============================================================================
// Canonical Column Names
//==============================================================================

/// Spreadsheet column names, used verbatim as field keys everywhere
/// (workbook headers, store documents, API payloads).
pub mod columns {
    pub const ID: &str = "ID";
    pub const BUYER: &str = "Acheteur";
    pub const MAIN_FAMILY: &str = "Famille Achat Principale";
    pub const TITLE: &str = "Titre du dossier";
    pub const AMOUNT_TTC: &str = "Montant prévisionnel du marché (€ TTC)";
    pub const PRESCRIBER: &str = "Prescripteur";
    pub const INTERNAL_CLIENT: &str = "Client Interne";
    pub const PROJECT_STATUS: &str = "Statut du Dossier";
    pub const PROGRAMME: &str = "Programme";
    pub const OPERATION: &str = "Opération";
    pub const STRATEGY_DEADLINE: &str = "Date limite étude stratégie avec client interne";
    pub const PURCHASE_LEVER: &str = "Levier Achat";
    pub const RENEWAL: &str = "Renouvellement de marché";
    pub const EXPECTED_PERFORMANCE: &str = "Perf achat prévisionnelle (en %)";
    pub const SAVINGS_BASIS: &str = "Origine du montant pour le calcul de l'économie";
    pub const PRIORITY: &str = "Priorité";
    pub const PURCHASE_COMMITTEE: &str = "Commission Achat";
    pub const NO_PLANNED_DATE: &str = "NO - Date prévisionnelle";
    pub const NO_CODIR_DATE: &str = "NO - Date validation CODIR";
    pub const NO_SIGNATURE_SENT: &str = "NO - Date envoi signature";
    pub const NO_VALIDATION_DATE: &str = "NO - Date de validation du document";
    pub const NO_VALIDATORS: &str = "NO - Nom des valideurs";
    pub const NO_STATUS: &str = "NO - Statut";
    pub const NO_COMMENT: &str = "NO - Commentaire";
    pub const VALIDATORS: &str = "Nom des valideurs";
    pub const GENERAL_COMMENT: &str = "Commentaire général sur le projet";

    /// Source-only column carrying a supplied procedure id
    pub const PROCEDURE_INTERNAL_ID: &str = "Procedure_ID_Interne";
    /// Source-only column carrying the procedure buyer (falls back to `Acheteur`)
    pub const PROCEDURE_BUYER: &str = "Proc_Acheteur";

    pub const AFPA_NUMBER: &str = "Numéro de procédure (Afpa)";
    pub const PROCEDURE_TYPE: &str = "Type de procédure";
    pub const CPV_CODE: &str = "Code CPV Principal";
    pub const AMOUNT_HT: &str = "Montant prévisionnel du marché (€ HT)";
    pub const ANNUAL_SAVINGS: &str = "Sur 12 mois économie achat prévisionnelle (€)";
    pub const CONTRACT_FORM: &str = "Forme du marché";
    pub const SHORT_SUBJECT: &str = "Objet court";
    pub const LAUNCH_DATE: &str = "Date de lancement de la consultation";
    pub const APPLICATIONS_DUE: &str = "Date de remise des candidatures";
    pub const OFFERS_DUE: &str = "Date de remise des offres";
    pub const EXECUTION_START: &str = "7 Exécution Date de début";
    pub const EXECUTION_END: &str = "7 Exécution Date de fin";
    pub const NOTIFICATION_DATE: &str = "Date de Notification";
    pub const DURATION_MONTHS: &str = "Durée du marché (en mois)";
    pub const SUB_FAMILIES: &str = "Sous-Familles";
    pub const WITHDRAWALS: &str = "Nombre de retraits";
    pub const BIDDERS: &str = "Nombre de soumissionnaires";
    pub const QUESTIONS: &str = "Nombre de questions";
    pub const SOCIAL_CLAUSES: &str = "Dispo sociales";
    pub const ENVIRONMENTAL_CLAUSES: &str = "Dispo environnementales";
    pub const OPEN_TO_INNOVATION: &str = "Projet ouvert à l'acquisition de solutions innovantes";
    pub const SME_ACCESS: &str = "Projet facilitant l'accès aux TPE/PME";
    pub const DCE_WRITTEN: &str = "Date d'écriture du DCE";
    pub const OFFERS_OPENED: &str = "Date d'ouverture des offres";
    pub const RP_MSA_DATE: &str = "RP - Date validation MSA";
    pub const RP_SIGNATURE_SENT: &str = "RP - Date envoi signature élec";
    pub const RP_VALIDATION_DATE: &str = "RP - Date de validation du document";
    pub const RP_CODIR_DATE: &str = "RP - Date validation CODIR";
    pub const RP_COMMENT: &str = "RP - Commentaire";
    pub const REJECTION_DATE: &str = "Date des Rejets";
    pub const AWARD_NOTICE: &str = "Avis d'attribution";
    pub const ESSENTIAL_DATA: &str = "Données essentielles";
    pub const PURPOSE: &str = "Finalité de la consultation";
    pub const CONSULTATION_STATUS: &str = "Statut de la consultation";
}

//==============================================================================
// Attachments
//==============================================================================

/// Metadata of a file stored in the attachment bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,
    /// Internal path inside the bucket
    pub path: String,
}

//==============================================================================
// Procedure (child entity)
//==============================================================================

/// One purchasing process belonging to a [`Project`].
///
/// Dates are ISO `YYYY-MM-DD` strings (or empty), amounts keep their
/// spreadsheet formatting and are only parsed on demand
/// (see [`crate::amounts::parse_amount`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Procedure {
    pub id: String,
    #[serde(rename = "Numéro de procédure (Afpa)")]
    pub afpa_number: String,
    #[serde(rename = "Acheteur")]
    pub buyer: String,
    #[serde(rename = "Type de procédure")]
    pub procedure_type: String,
    #[serde(rename = "Code CPV Principal")]
    pub cpv_code: String,
    #[serde(rename = "Montant prévisionnel du marché (€ HT)")]
    pub amount_ht: String,
    #[serde(rename = "Sur 12 mois économie achat prévisionnelle (€)")]
    pub annual_savings: String,
    #[serde(rename = "Forme du marché")]
    pub contract_form: String,
    #[serde(rename = "Objet court")]
    pub short_subject: String,
    #[serde(rename = "Date de lancement de la consultation")]
    pub launch_date: String,
    #[serde(rename = "Date de remise des candidatures")]
    pub applications_due: String,
    #[serde(rename = "Date de remise des offres")]
    pub offers_due: String,
    #[serde(rename = "7 Exécution Date de début")]
    pub execution_start: String,
    #[serde(rename = "7 Exécution Date de fin")]
    pub execution_end: String,
    #[serde(rename = "Date de Notification")]
    pub notification_date: String,
    #[serde(rename = "Durée du marché (en mois)")]
    pub duration_months: String,
    #[serde(rename = "Sous-Familles")]
    pub sub_families: Vec<String>,

    // Indicators & DAE
    #[serde(rename = "Nombre de retraits")]
    pub withdrawals: String,
    #[serde(rename = "Nombre de soumissionnaires")]
    pub bidders: String,
    #[serde(rename = "Nombre de questions")]
    pub questions: String,
    #[serde(rename = "Dispo sociales")]
    pub social_clauses: String,
    #[serde(rename = "Dispo environnementales")]
    pub environmental_clauses: String,
    #[serde(rename = "Projet ouvert à l'acquisition de solutions innovantes")]
    pub open_to_innovation: String,
    #[serde(rename = "Projet facilitant l'accès aux TPE/PME")]
    pub sme_access: String,
    #[serde(rename = "Date d'écriture du DCE")]
    pub dce_written: String,
    #[serde(rename = "Date d'ouverture des offres")]
    pub offers_opened: String,

    // Presentation report (RP)
    #[serde(rename = "RP - Date validation MSA")]
    pub rp_msa_date: String,
    #[serde(rename = "RP - Date envoi signature élec")]
    pub rp_signature_sent: String,
    #[serde(rename = "RP - Date de validation du document")]
    pub rp_validation_date: String,
    #[serde(rename = "RP - Date validation CODIR")]
    pub rp_codir_date: String,
    #[serde(rename = "RP - Commentaire")]
    pub rp_comment: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rp_attachments: Vec<Attachment>,

    // Award
    #[serde(rename = "Date des Rejets")]
    pub rejection_date: String,
    #[serde(rename = "Avis d'attribution")]
    pub award_notice: String,
    #[serde(rename = "Données essentielles")]
    pub essential_data: String,
    #[serde(rename = "Finalité de la consultation")]
    pub purpose: String,
    #[serde(rename = "Statut de la consultation")]
    pub consultation_status: String,
}

//==============================================================================
// Project (parent entity)
//==============================================================================

/// A procurement dossier, identified by its spreadsheet `ID`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Acheteur")]
    pub buyer: String,
    #[serde(rename = "Famille Achat Principale")]
    pub main_family: String,
    #[serde(rename = "Titre du dossier")]
    pub title: String,
    #[serde(rename = "Montant prévisionnel du marché (€ TTC)")]
    pub amount_ttc: String,
    #[serde(rename = "Prescripteur")]
    pub prescriber: String,
    #[serde(rename = "Client Interne")]
    pub internal_client: String,
    #[serde(rename = "Statut du Dossier")]
    pub status: String,
    #[serde(rename = "Programme")]
    pub programme: String,
    #[serde(rename = "Opération")]
    pub operation: String,
    #[serde(rename = "Date limite étude stratégie avec client interne")]
    pub strategy_deadline: String,
    #[serde(rename = "Levier Achat")]
    pub purchase_lever: String,
    #[serde(rename = "Renouvellement de marché")]
    pub renewal: String,
    #[serde(rename = "Perf achat prévisionnelle (en %)")]
    pub expected_performance: String,
    #[serde(rename = "Origine du montant pour le calcul de l'économie")]
    pub savings_basis: String,
    #[serde(rename = "Priorité")]
    pub priority: String,
    #[serde(rename = "Commission Achat")]
    pub purchase_committee: String,

    // Opportunity note (NO)
    #[serde(rename = "NO - Date prévisionnelle")]
    pub no_planned_date: String,
    #[serde(rename = "NO - Date validation CODIR")]
    pub no_codir_date: String,
    #[serde(rename = "NO - Date envoi signature")]
    pub no_signature_sent: String,
    #[serde(rename = "NO - Date de validation du document")]
    pub no_validation_date: String,
    #[serde(rename = "NO - Nom des valideurs")]
    pub no_validators: String,
    #[serde(rename = "NO - Statut")]
    pub no_status: String,
    #[serde(rename = "NO - Commentaire")]
    pub no_comment: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub no_attachments: Vec<Attachment>,

    // Legacy columns still present in older workbooks
    #[serde(rename = "Nom des valideurs")]
    pub validators: String,
    #[serde(rename = "Commentaire général sur le projet")]
    pub general_comment: String,

    pub procedures: Vec<Procedure>,
}

impl Project {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn procedure(&self, procedure_id: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.id == procedure_id)
    }

    pub fn procedure_mut(&mut self, procedure_id: &str) -> Option<&mut Procedure> {
        self.procedures.iter_mut().find(|p| p.id == procedure_id)
    }

    /// Fill blank procedure ids with `{ID}-P{n}`, `n` being the 1-based
    /// position in the current procedure list.
    pub fn assign_missing_procedure_ids(&mut self) {
        let project_id = self.id.clone();
        for (index, procedure) in self.procedures.iter_mut().enumerate() {
            if procedure.id.is_empty() {
                procedure.id = format!("{}-P{}", project_id, index + 1);
            }
        }
    }
}

/// Total number of procedures across a project set
pub fn procedure_count(projects: &[Project]) -> usize {
    projects.iter().map(|p| p.procedures.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_missing_procedure_ids_uses_final_position() {
        let mut project = Project::new("42");
        project.procedures.push(Procedure::default());
        project.procedures.push(Procedure {
            id: "P-X".to_string(),
            ..Default::default()
        });
        project.procedures.push(Procedure::default());

        project.assign_missing_procedure_ids();

        let ids: Vec<&str> = project.procedures.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["42-P1", "P-X", "42-P3"]);
    }

    #[test]
    fn test_project_serializes_with_column_names() {
        let mut project = Project::new("7");
        project.title = "Nettoyage des locaux".to_string();
        project.procedures.push(Procedure {
            id: "7-P1".to_string(),
            sub_families: vec!["Propreté".to_string()],
            ..Default::default()
        });

        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["ID"], "7");
        assert_eq!(json[columns::TITLE], "Nettoyage des locaux");
        assert_eq!(json["procedures"][0][columns::SUB_FAMILIES][0], "Propreté");
        assert!(json.get("no_attachments").is_none());
    }

    #[test]
    fn test_project_deserializes_sparse_document() {
        let json = r#"{"ID":"12","Statut du Dossier":"En cours","procedures":[{"id":"12-P1"}]}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, "12");
        assert_eq!(project.status, "En cours");
        assert_eq!(project.title, "");
        assert_eq!(project.procedures[0].id, "12-P1");
        assert!(project.procedures[0].sub_families.is_empty());
    }

    #[test]
    fn test_attachment_wire_names() {
        let attachment = Attachment {
            name: "note.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            uploaded_at: "2024-03-15T10:00:00Z".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&attachment).unwrap();
        assert_eq!(json["type"], "application/pdf");
        assert_eq!(json["uploadedAt"], "2024-03-15T10:00:00Z");
    }

    #[test]
    fn test_procedure_count() {
        let mut a = Project::new("1");
        a.procedures.push(Procedure::default());
        a.procedures.push(Procedure::default());
        let b = Project::new("2");
        assert_eq!(procedure_count(&[a, b]), 2);
    }
}

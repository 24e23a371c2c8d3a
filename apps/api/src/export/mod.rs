//! Export — turns a settled session into a downloadable Markdown study guide.
//!
//! Layout: cover block (title, skillset, role, sector, date), then the interview
//! document, then the certification guide when one was produced.

pub mod handlers;

use chrono::NaiveDate;

use crate::errors::AppError;
use crate::generation::orchestrator::SessionSnapshot;

pub const DOCUMENT_TITLE: &str = "Interview Preparation Guide";
pub const INTERVIEW_HEADING: &str = "Interview Questions & Answers";
pub const CERTIFICATION_HEADING: &str = "Certification Guide";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub filename: String,
    pub content: String,
}

/// Builds the export for `snapshot`. Only a settled session with some content exports.
pub fn build_export(
    snapshot: &SessionSnapshot,
    generated_on: NaiveDate,
) -> Result<ExportDocument, AppError> {
    if !snapshot.is_settled() {
        return Err(AppError::Conflict(
            "Export is available once generation has finished.".to_string(),
        ));
    }
    let request = snapshot.request.as_ref().ok_or_else(|| {
        AppError::Conflict("There is no generated content to export.".to_string())
    })?;

    let interview = snapshot.interview.accumulated_text.trim();
    let certification = snapshot
        .certification
        .as_ref()
        .map(|c| c.accumulated_text.trim())
        .unwrap_or_default();
    if interview.is_empty() && certification.is_empty() {
        return Err(AppError::Conflict(
            "There is no generated content to export.".to_string(),
        ));
    }

    let mut content = format!("# {DOCUMENT_TITLE}\n\n- **Skillset:** {}\n", request.skillset);
    if let Some(role) = &request.role {
        content.push_str(&format!("- **Role:** {role}\n"));
    }
    if let Some(sector) = &request.sector {
        content.push_str(&format!("- **Sector:** {sector}\n"));
    }
    content.push_str(&format!(
        "\n_Generated on {}_\n",
        generated_on.format("%B %-d, %Y")
    ));

    for (heading, body) in [
        (INTERVIEW_HEADING, interview),
        (CERTIFICATION_HEADING, certification),
    ] {
        if !body.is_empty() {
            content.push_str(&format!("\n---\n\n## {heading}\n\n{body}\n"));
        }
    }

    Ok(ExportDocument {
        filename: export_filename(&request.skillset),
        content,
    })
}

/// `Interview_Guide_<skillset>.md`, whitespace runs as `_`, header-unsafe chars as `_`.
pub fn export_filename(skillset: &str) -> String {
    let stem: Vec<String> = skillset
        .split_whitespace()
        .map(|word| {
            word.chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+') {
                        c
                    } else {
                        '_'
                    }
                })
                .collect()
        })
        .collect();
    format!("Interview_Guide_{}.md", stem.join("_"))
}

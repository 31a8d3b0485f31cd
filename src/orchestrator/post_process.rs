//! Post-load processing.
//!
//! Writes the requested exports for the current filtered view after a load completes.

use crate::export;
use crate::filter::FilterCriteria;
use crate::model::{ApplicationRecord, StatSummary};
use crate::render::ListRender;
use std::path::Path;

/// Export targets requested on the command line.
#[derive(Debug, Clone, Default)]
pub struct ExportTargets {
    pub json: Option<std::path::PathBuf>,
    pub csv: Option<std::path::PathBuf>,
}

/// Write the configured exports and return one status message per export.
pub fn process_load_completion(
    targets: &ExportTargets,
    criteria: &FilterCriteria,
    stats: StatSummary,
    filtered: &[ApplicationRecord],
    render: &ListRender,
) -> Vec<String> {
    let mut messages = Vec::new();
    if let Some(p) = targets.json.as_deref() {
        messages.push(report(
            "JSON",
            p,
            export::export_json(p, criteria, stats, filtered),
        ));
    }
    if let Some(p) = targets.csv.as_deref() {
        messages.push(report("CSV", p, export::export_csv(p, render)));
    }
    messages
}

fn report(kind: &str, path: &Path, res: anyhow::Result<()>) -> String {
    match res {
        Ok(()) => format!("Exported {kind}: {}", path.display()),
        Err(e) => format!("Export {kind} failed: {e:#}"),
    }
}

//! JSON and CSV export of the filtered application list.

use crate::filter::FilterCriteria;
use crate::model::{ApplicationRecord, StatSummary};
use crate::render::{ListRender, RowDescriptor};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct JsonExport<'a> {
    exported_at: String,
    criteria: &'a FilterCriteria,
    stats: StatSummary,
    records: &'a [ApplicationRecord],
}

pub fn export_json(
    path: &Path,
    criteria: &FilterCriteria,
    stats: StatSummary,
    records: &[ApplicationRecord],
) -> Result<()> {
    let doc = JsonExport {
        exported_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        criteria,
        stats,
        records,
    };
    let body = serde_json::to_string_pretty(&doc).context("serialize export")?;
    std::fs::write(path, body).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

const CSV_HEADER: &str = "id,case_no,applicant_name,status,status_label,disaster_type,location,date";

fn csv_field(v: &str) -> String {
    if v.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", v.replace('"', "\"\""))
    } else {
        v.to_string()
    }
}

fn csv_line(row: &RowDescriptor) -> String {
    [
        row.id.as_str(),
        row.case_no.as_str(),
        row.applicant_name.as_str(),
        row.badge.class.as_str(),
        row.badge.label.as_str(),
        row.disaster_type.as_str(),
        row.location.as_str(),
        row.date.as_str(),
    ]
    .iter()
    .map(|v| csv_field(v))
    .collect::<Vec<_>>()
    .join(",")
}

/// Write the rendered rows as CSV. An empty list writes only the header.
pub fn export_csv(path: &Path, render: &ListRender) -> Result<()> {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    if let ListRender::Rows { rows } = render {
        for row in rows {
            out.push_str(&csv_line(row));
            out.push('\n');
        }
    }
    std::fs::write(path, out).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

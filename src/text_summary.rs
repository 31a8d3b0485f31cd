//! Text summary builder for CLI output.
//!
//! Formats the stat cards, the active filter and either list rows or placed markers.

use crate::filter::FilterCriteria;
use crate::map::MapOverlay;
use crate::model::{LoadOutcome, StatSummary};
use crate::render::ListRender;

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

fn criteria_line(c: &FilterCriteria) -> Option<String> {
    let parts: Vec<String> = [
        ("city", &c.city),
        ("township", &c.township),
        ("village", &c.village),
        ("disaster", &c.disaster_type),
        ("status", &c.status),
        ("search", &c.search_term),
    ]
    .iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| format!("{k}={v}"))
    .collect();
    if parts.is_empty() {
        None
    } else {
        Some(format!("Filter: {}", parts.join(" ")))
    }
}

fn stats_line(s: &StatSummary) -> String {
    format!(
        "待審核 {}  審核中 {}  已拒絕 {}  已完成 {}  (total {})",
        s.pending, s.inspection, s.rejected, s.approved_or_completed, s.total
    )
}

pub fn build_list_summary(
    outcome: Option<&LoadOutcome>,
    stats: &StatSummary,
    criteria: &FilterCriteria,
    render: &ListRender,
) -> TextSummary {
    let mut lines = header_lines(outcome, stats, criteria);
    match render {
        ListRender::Empty { message } => lines.push(message.clone()),
        ListRender::Rows { rows } => {
            for row in rows {
                lines.push(format!(
                    "[{}] {} {} | {} | {} | {}",
                    row.badge.label,
                    row.applicant_name,
                    row.case_no,
                    row.disaster_type,
                    row.location,
                    row.date
                ));
            }
            lines.push(format!("{} record(s)", rows.len()));
        }
    }
    TextSummary { lines }
}

pub fn build_map_summary(
    outcome: Option<&LoadOutcome>,
    stats: &StatSummary,
    criteria: &FilterCriteria,
    overlay: &MapOverlay,
) -> TextSummary {
    let mut lines = header_lines(outcome, stats, criteria);
    for m in overlay.markers() {
        lines.push(format!(
            "{} {:.5},{:.5} {} ({})",
            m.color(),
            m.position.lat,
            m.position.lng,
            m.title,
            m.address
        ));
    }
    let vp = overlay.viewport();
    lines.push(format!(
        "Markers: {} placed, {} failed; viewport lat {:.4}..{:.4} lng {:.4}..{:.4}",
        overlay.markers().len(),
        overlay.failed(),
        vp.lat[0],
        vp.lat[1],
        vp.lng[0],
        vp.lng[1]
    ));
    TextSummary { lines }
}

fn header_lines(
    outcome: Option<&LoadOutcome>,
    stats: &StatSummary,
    criteria: &FilterCriteria,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(LoadOutcome::Failed { reason }) = outcome {
        lines.push(format!("載入案件失敗: {reason}"));
    }
    lines.push(stats_line(stats));
    if let Some(l) = criteria_line(criteria) {
        lines.push(l);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_load_is_reported_above_the_placeholder() {
        let render = ListRender::Empty {
            message: crate::render::EMPTY_LIST_MESSAGE.into(),
        };
        let s = build_list_summary(
            Some(&LoadOutcome::Failed {
                reason: "HTTP 500".into(),
            }),
            &StatSummary::default(),
            &FilterCriteria::default(),
            &render,
        );
        assert_eq!(s.lines[0], "載入案件失敗: HTTP 500");
        assert_eq!(s.lines.last().unwrap(), crate::render::EMPTY_LIST_MESSAGE);
    }

    #[test]
    fn filter_line_lists_only_active_criteria() {
        let c = FilterCriteria {
            city: "台南市".into(),
            status: "pending".into(),
            ..Default::default()
        };
        assert_eq!(
            criteria_line(&c).as_deref(),
            Some("Filter: city=台南市 status=pending")
        );
        assert_eq!(criteria_line(&FilterCriteria::default()), None);
    }
}

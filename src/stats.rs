use crate::model::{ApplicationRecord, ApplicationStatus, StatSummary};

/// Count records per dashboard card in a single pass.
///
/// `inspection` groups site inspection with under review, and `approved_or_completed`
/// groups approved with completed. Unknown statuses only count towards `total`.
pub fn compute_stats(records: &[ApplicationRecord]) -> StatSummary {
    let mut s = StatSummary {
        total: records.len(),
        ..Default::default()
    };
    for r in records {
        match r.status {
            ApplicationStatus::Pending => s.pending += 1,
            ApplicationStatus::UnderReview | ApplicationStatus::SiteInspection => {
                s.inspection += 1
            }
            ApplicationStatus::Approved | ApplicationStatus::Completed => {
                s.approved_or_completed += 1
            }
            ApplicationStatus::Rejected => s.rejected += 1,
            ApplicationStatus::Unknown(_) | ApplicationStatus::Missing => {}
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(codes: &[&str]) -> Vec<ApplicationRecord> {
        codes
            .iter()
            .enumerate()
            .map(|(i, c)| ApplicationRecord {
                id: i.to_string(),
                status: ApplicationStatus::parse(c),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn inspection_groups_site_inspection_and_under_review() {
        let s = compute_stats(&with_status(&["site_inspection", "under_review"]));
        assert_eq!(s.inspection, 2);
        assert_eq!(s.pending, 0);
    }

    #[test]
    fn groups_and_unknowns() {
        let s = compute_stats(&with_status(&[
            "pending", "pending", "approved", "completed", "rejected", "escalated", "",
        ]));
        assert_eq!(
            s,
            StatSummary {
                pending: 2,
                inspection: 0,
                rejected: 1,
                approved_or_completed: 2,
                total: 7,
            }
        );
    }

    #[test]
    fn empty_store_is_all_zero() {
        assert_eq!(compute_stats(&[]), StatSummary::default());
    }
}

//! Application store: the full fetched list plus the active view mode.

mod client;
pub mod response;

pub use client::ApplicationsClient;

use crate::error::FetchError;
use crate::filter::{self, FilterCriteria};
use crate::model::{ApplicationRecord, LoadOutcome, StatSummary, ViewMode};
use crate::stats::compute_stats;
use tracing::warn;

#[derive(Debug, Default)]
pub struct ApplicationStore {
    records: Vec<ApplicationRecord>,
    stats: StatSummary,
    view_mode: ViewMode,
    last_outcome: Option<LoadOutcome>,
}

impl ApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    pub fn stats(&self) -> StatSummary {
        self.stats
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn last_outcome(&self) -> Option<&LoadOutcome> {
        self.last_outcome.as_ref()
    }

    /// Install the result of a load. A failed load empties the store instead of
    /// leaving the previous list on screen; stats are recomputed either way.
    pub fn apply_load(&mut self, result: Result<Vec<ApplicationRecord>, FetchError>) -> LoadOutcome {
        let outcome = match result {
            Ok(records) => {
                let count = records.len();
                self.records = records;
                LoadOutcome::Loaded { count }
            }
            Err(e) => {
                warn!(error = %e, "loading applications failed, clearing store");
                self.records.clear();
                LoadOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.stats = compute_stats(&self.records);
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    /// Fetch through `client` and install the result.
    pub async fn load(&mut self, client: &ApplicationsClient) -> LoadOutcome {
        let result = client.fetch().await;
        self.apply_load(result)
    }

    pub fn filtered(&self, criteria: &FilterCriteria) -> Vec<ApplicationRecord> {
        filter::filter(&self.records, criteria)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApplicationStatus;

    fn rec(id: &str, status: ApplicationStatus) -> ApplicationRecord {
        ApplicationRecord {
            id: id.into(),
            status,
            ..Default::default()
        }
    }

    #[test]
    fn failed_load_clears_previous_records_and_stats() {
        let mut store = ApplicationStore::new();
        store.apply_load(Ok(vec![
            rec("1", ApplicationStatus::Pending),
            rec("2", ApplicationStatus::Rejected),
        ]));
        assert_eq!(store.stats().pending, 1);

        let outcome = store.apply_load(Err(FetchError::Status {
            url: "http://h/api/v1/applications/".into(),
            status: 503,
        }));
        assert!(outcome.is_failed());
        assert!(store.records().is_empty());
        assert_eq!(store.stats(), StatSummary::default());
    }

    #[test]
    fn stats_ignore_active_filter() {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(rec(&format!("p{i}"), ApplicationStatus::Pending));
        }
        records.push(rec("a1", ApplicationStatus::Approved));
        records.push(rec("a2", ApplicationStatus::Approved));
        records.push(rec("r1", ApplicationStatus::Rejected));

        let mut store = ApplicationStore::new();
        store.apply_load(Ok(records));

        let criteria = FilterCriteria {
            status: "rejected".into(),
            ..Default::default()
        };
        assert_eq!(store.filtered(&criteria).len(), 1);

        let stats = store.stats();
        assert_eq!(stats.pending, 5);
        assert_eq!(stats.approved_or_completed, 2);
        assert_eq!(stats.rejected, 1);
    }
}

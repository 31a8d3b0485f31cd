//! Client-side filtering of the application list.
//!
//! Every non-empty criterion becomes an independent [`Predicate`]; a record is kept
//! when all of them match, so the order they are applied in is not observable.

use crate::model::ApplicationRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub township: String,
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub disaster_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub search_term: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Substring of `address` or `damage_location` (city, township and village all use this).
    Region(String),
    DisasterType(String),
    Status(String),
    /// Lowercased needle matched against the five text fields.
    Search(String),
}

fn contains(field: &Option<String>, needle: &str) -> bool {
    field.as_deref().is_some_and(|v| v.contains(needle))
}

fn contains_folded(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|v| v.to_lowercase().contains(needle))
}

impl Predicate {
    pub fn matches(&self, r: &ApplicationRecord) -> bool {
        match self {
            Predicate::Region(term) => {
                contains(&r.address, term) || contains(&r.damage_location, term)
            }
            Predicate::DisasterType(code) => r.disaster_type.as_deref() == Some(code.as_str()),
            Predicate::Status(code) => r.status.as_str() == code,
            Predicate::Search(needle) => {
                contains_folded(&r.case_no, needle)
                    || contains_folded(&r.applicant_name, needle)
                    || contains_folded(&r.address, needle)
                    || contains_folded(&r.damage_location, needle)
                    || contains_folded(&r.phone, needle)
            }
        }
    }
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.predicates().is_empty()
    }

    pub fn clear(&mut self) {
        *self = FilterCriteria::default();
    }

    /// Predicates for the non-empty criteria, cheapest region checks first.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        for term in [&self.city, &self.township, &self.village] {
            if !term.is_empty() {
                out.push(Predicate::Region(term.clone()));
            }
        }
        if !self.disaster_type.is_empty() {
            out.push(Predicate::DisasterType(self.disaster_type.clone()));
        }
        if !self.status.is_empty() {
            out.push(Predicate::Status(self.status.clone()));
        }
        if !self.search_term.is_empty() {
            out.push(Predicate::Search(self.search_term.to_lowercase()));
        }
        out
    }

    pub fn matches(&self, r: &ApplicationRecord) -> bool {
        self.predicates().iter().all(|p| p.matches(r))
    }
}

/// Apply an explicit predicate list, keeping input order.
pub fn filter_with(records: &[ApplicationRecord], predicates: &[Predicate]) -> Vec<ApplicationRecord> {
    records
        .iter()
        .filter(|r| predicates.iter().all(|p| p.matches(r)))
        .cloned()
        .collect()
}

pub fn filter(records: &[ApplicationRecord], criteria: &FilterCriteria) -> Vec<ApplicationRecord> {
    filter_with(records, &criteria.predicates())
}

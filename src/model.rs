use crate::error::{FetchError, GeocodeError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Review status of an application. Codes the backend adds later are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ApplicationStatus {
    Pending,
    UnderReview,
    SiteInspection,
    Approved,
    Completed,
    Rejected,
    Unknown(String),
    #[default]
    Missing,
}

impl ApplicationStatus {
    pub const KNOWN: [ApplicationStatus; 6] = [
        ApplicationStatus::Pending,
        ApplicationStatus::UnderReview,
        ApplicationStatus::SiteInspection,
        ApplicationStatus::Approved,
        ApplicationStatus::Completed,
        ApplicationStatus::Rejected,
    ];

    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => ApplicationStatus::Pending,
            "under_review" => ApplicationStatus::UnderReview,
            "site_inspection" => ApplicationStatus::SiteInspection,
            "approved" => ApplicationStatus::Approved,
            "completed" => ApplicationStatus::Completed,
            "rejected" => ApplicationStatus::Rejected,
            "" => ApplicationStatus::Missing,
            other => ApplicationStatus::Unknown(other.to_string()),
        }
    }

    /// Wire code as sent by the backend (empty when the record had none).
    pub fn as_str(&self) -> &str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::SiteInspection => "site_inspection",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Completed => "completed",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Unknown(raw) => raw,
            ApplicationStatus::Missing => "",
        }
    }
}

impl Serialize for ApplicationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApplicationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient_string(deserializer)?;
        Ok(raw
            .map(|s| ApplicationStatus::parse(&s))
            .unwrap_or_default())
    }
}

/// Accept strings and numbers; anything else (null, objects, arrays) becomes `None`.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// One applicant's case as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub case_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
    #[serde(default)]
    pub status: ApplicationStatus,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub disaster_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub damage_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    // Shown in the review view only.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub damage_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub subsidy_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub requested_amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,

    /// Fields this tool does not model, kept so the review view can show the whole record.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

impl ApplicationRecord {
    /// Best available location: damage location first, then the contact address.
    pub fn location(&self) -> Option<&str> {
        non_empty(&self.damage_location).or_else(|| non_empty(&self.address))
    }

    /// Submission timestamp, falling back to the creation timestamp.
    pub fn timestamp(&self) -> Option<&str> {
        non_empty(&self.submitted_at).or_else(|| non_empty(&self.created_at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    List,
    Map,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::List => ViewMode::Map,
            ViewMode::Map => ViewMode::List,
        }
    }
}

/// Dashboard counts over the full, unfiltered store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSummary {
    pub pending: usize,
    pub inspection: usize,
    pub rejected: usize,
    pub approved_or_completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Result of one store load, kept for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { count: usize },
    Failed { reason: String },
}

impl LoadOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadOutcome::Failed { .. })
    }
}

/// A geocode request for one filtered record.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeJob {
    pub record_id: String,
    pub title: String,
    pub status: ApplicationStatus,
    pub address: String,
}

/// Completion of one [`GeocodeJob`], tagged with the map pass it belongs to.
#[derive(Debug, Clone)]
pub struct GeocodeOutcome {
    pub generation: u64,
    pub job: GeocodeJob,
    pub result: Result<LatLng, GeocodeError>,
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug)]
pub enum AppEvent {
    LoadStarted,
    Loaded {
        result: Result<Vec<ApplicationRecord>, FetchError>,
    },
    Geocoded(GeocodeOutcome),
    GeocodePassFinished {
        generation: u64,
        placed: usize,
        failed: usize,
    },
    Info(InfoEvent),
}

#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    GeocoderUnavailable,
    ConfigResolved { api_base_url: String, from_backend: bool },
}

impl InfoEvent {
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::GeocoderUnavailable => {
                "No geocoder configured; map markers are disabled".to_string()
            }
            InfoEvent::ConfigResolved {
                api_base_url,
                from_backend,
            } => {
                if *from_backend {
                    format!("API base (from backend): {api_base_url}")
                } else {
                    format!("API base: {api_base_url}")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_tolerates_nulls_numbers_and_unknown_status() {
        let r: ApplicationRecord = serde_json::from_value(json!({
            "id": 42,
            "case_no": null,
            "applicant_name": "王小明",
            "status": "escalated",
            "phone": 912345678,
            "estimated_loss": 150000
        }))
        .unwrap();
        assert_eq!(r.id, "42");
        assert_eq!(r.case_no, None);
        assert_eq!(r.phone.as_deref(), Some("912345678"));
        assert_eq!(r.status, ApplicationStatus::Unknown("escalated".into()));
        assert_eq!(r.extra.get("estimated_loss"), Some(&json!(150000)));
    }

    #[test]
    fn missing_status_is_distinct_from_unknown() {
        let r: ApplicationRecord = serde_json::from_value(json!({ "id": "a" })).unwrap();
        assert_eq!(r.status, ApplicationStatus::Missing);
        let r: ApplicationRecord =
            serde_json::from_value(json!({ "id": "a", "status": null })).unwrap();
        assert_eq!(r.status, ApplicationStatus::Missing);
    }

    #[test]
    fn location_prefers_damage_location_and_skips_empty_strings() {
        let mut r = ApplicationRecord {
            address: Some("台北市大安區".into()),
            damage_location: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(r.location(), Some("台北市大安區"));
        r.damage_location = Some("台南市中西區".into());
        assert_eq!(r.location(), Some("台南市中西區"));
        r.damage_location = None;
        r.address = None;
        assert_eq!(r.location(), None);
    }

    #[test]
    fn status_serializes_back_to_wire_code() {
        let r = ApplicationRecord {
            id: "1".into(),
            status: ApplicationStatus::SiteInspection,
            ..Default::default()
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["status"], json!("site_inspection"));
        assert!(v.get("case_no").is_none());
    }
}

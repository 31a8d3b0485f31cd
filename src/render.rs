//! Projection of filtered records into display rows.
//!
//! Missing or malformed fields never abort a render; each falls back to a fixed
//! display text.

use crate::model::{ApplicationRecord, ApplicationStatus};
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, UtcOffset};

pub const EMPTY_LIST_MESSAGE: &str = "目前沒有符合條件的案件";
pub const NO_NAME: &str = "未提供";
pub const NO_CASE_NO: &str = "N/A";
pub const NO_ADDRESS: &str = "未提供地址";
pub const NO_DATE: &str = "日期不明";
pub const NO_ADDRESS_FOR_NAVIGATION: &str = "此案件未提供地址資訊";
pub const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// Status badge: display text, CSS-style class (the raw code) and a hex color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: String,
    pub class: String,
    pub color: &'static str,
}

pub fn status_badge(status: &ApplicationStatus) -> StatusBadge {
    let (label, color) = match status {
        ApplicationStatus::Pending => ("待審核", "#dc2626"),
        ApplicationStatus::UnderReview => ("審核中", "#d97706"),
        ApplicationStatus::SiteInspection => ("審核中", "#2563eb"),
        ApplicationStatus::Approved | ApplicationStatus::Completed => ("已完成", "#059669"),
        ApplicationStatus::Rejected => ("已拒絕", "#ea580c"),
        ApplicationStatus::Unknown(raw) => (raw.as_str(), "#999999"),
        ApplicationStatus::Missing => ("unknown", "#999999"),
    };
    StatusBadge {
        label: label.to_string(),
        class: status.as_str().to_string(),
        color,
    }
}

/// Marker fill color on the map.
pub fn marker_color(status: &ApplicationStatus) -> &'static str {
    match status {
        ApplicationStatus::Pending => "#dc2626",
        ApplicationStatus::UnderReview | ApplicationStatus::SiteInspection => "#d97706",
        ApplicationStatus::Approved | ApplicationStatus::Completed => "#059669",
        ApplicationStatus::Rejected => "#ea580c",
        ApplicationStatus::Unknown(_) | ApplicationStatus::Missing => "#999999",
    }
}

pub const DISASTER_TYPES: [(&str, &str); 5] = [
    ("flood", "水災"),
    ("typhoon", "颱風"),
    ("earthquake", "地震"),
    ("fire", "火災"),
    ("other", "其他"),
];

pub fn disaster_type_label(code: Option<&str>) -> String {
    match code.filter(|c| !c.is_empty()) {
        None => NO_NAME.to_string(),
        Some(code) => DISASTER_TYPES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| code.to_string()),
    }
}

/// Render a backend timestamp as a zh-TW short date (`2025/7/3`) in `offset`.
///
/// RFC 3339 timestamps are converted to the offset; anything else is read as a
/// calendar date from its first ten characters.
pub fn format_date(raw: Option<&str>, offset: UtcOffset) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return NO_DATE.to_string();
    };
    let date = match OffsetDateTime::parse(raw, &Rfc3339) {
        Ok(dt) => Some(dt.to_offset(offset).date()),
        Err(_) => raw.get(..10).and_then(parse_calendar_date),
    };
    match date {
        Some(d) => format!("{}/{}/{}", d.year(), d.month() as u8, d.day()),
        None => NO_DATE.to_string(),
    }
}

fn parse_calendar_date(s: &str) -> Option<Date> {
    let fmt = time::macros::format_description!("[year]-[month]-[day]");
    Date::parse(s, &fmt).ok()
}

/// Local UTC offset, or UTC when the platform cannot tell.
pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// External maps link for a location string.
pub fn navigate_url(location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() || location == NO_ADDRESS {
        return None;
    }
    reqwest::Url::parse_with_params(MAPS_SEARCH_URL, &[("api", "1"), ("query", location)])
        .ok()
        .map(String::from)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDescriptor {
    pub id: String,
    pub badge: StatusBadge,
    pub applicant_name: String,
    pub case_no: String,
    pub disaster_type: String,
    pub location: String,
    pub date: String,
    pub navigate_url: Option<String>,
}

impl RowDescriptor {
    pub fn from_record(r: &ApplicationRecord, offset: UtcOffset) -> Self {
        let location = r.location().unwrap_or(NO_ADDRESS).to_string();
        Self {
            id: r.id.clone(),
            badge: status_badge(&r.status),
            applicant_name: non_empty_or(r.applicant_name.as_deref(), NO_NAME),
            case_no: non_empty_or(r.case_no.as_deref(), NO_CASE_NO),
            disaster_type: disaster_type_label(r.disaster_type.as_deref()),
            navigate_url: r.location().and_then(navigate_url),
            location,
            date: format_date(r.timestamp(), offset),
        }
    }
}

fn non_empty_or(v: Option<&str>, fallback: &str) -> String {
    v.filter(|s| !s.is_empty()).unwrap_or(fallback).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListRender {
    /// Nothing matched; show the placeholder rather than an empty container.
    Empty { message: String },
    Rows { rows: Vec<RowDescriptor> },
}

impl ListRender {
    pub fn len(&self) -> usize {
        match self {
            ListRender::Empty { .. } => 0,
            ListRender::Rows { rows } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn render_list(records: &[ApplicationRecord], offset: UtcOffset) -> ListRender {
    if records.is_empty() {
        return ListRender::Empty {
            message: EMPTY_LIST_MESSAGE.to_string(),
        };
    }
    ListRender::Rows {
        rows: records
            .iter()
            .map(|r| RowDescriptor::from_record(r, offset))
            .collect(),
    }
}

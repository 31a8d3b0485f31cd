//! # relief-review
//!
//! Terminal review console for disaster-relief subsidy applications. It loads the
//! application list from the review backend, shows dashboard counts, and renders the
//! filtered list either as rows or as geocoded map markers.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod geocode;
pub mod map;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod stats;
pub mod store;
pub mod text_summary;
#[cfg(feature = "tui")]
pub mod tui;

pub use config::AppConfig;
pub use error::{FetchError, GeocodeError};
pub use filter::{filter, FilterCriteria};
pub use map::MapOverlay;
pub use model::{ApplicationRecord, ApplicationStatus, StatSummary, ViewMode};
pub use render::{render_list, ListRender};
pub use stats::compute_stats;
pub use store::{ApplicationStore, ApplicationsClient};

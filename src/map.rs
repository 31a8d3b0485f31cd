//! Map-marker overlay kept in sync with the filtered record set.
//!
//! Each rebuild of the overlay is a *pass* identified by a generation number.
//! Geocode results arrive out of order and are tagged with the generation that
//! requested them; results for anything but the current generation are dropped.

use crate::geocode::Geocoder;
use crate::model::{AppEvent, ApplicationRecord, ApplicationStatus, GeocodeJob, GeocodeOutcome, LatLng};
use crate::render::{marker_color, NO_CASE_NO, NO_NAME};
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// Center of Taiwan; the viewport before any marker is placed.
pub const DEFAULT_CENTER: LatLng = LatLng { lat: 23.5, lng: 121.0 };
const DEFAULT_SPAN_LAT: f64 = 4.0;
const DEFAULT_SPAN_LNG: f64 = 3.0;
const MIN_SPAN: f64 = 0.02;
const PADDING: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub record_id: String,
    pub title: String,
    pub status: ApplicationStatus,
    pub address: String,
    pub position: LatLng,
}

impl Marker {
    pub fn color(&self) -> &'static str {
        marker_color(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn around(p: LatLng) -> Self {
        Self {
            south: p.lat,
            west: p.lng,
            north: p.lat,
            east: p.lng,
        }
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self.west = self.west.min(p.lng);
        self.east = self.east.max(p.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng {
            lat: (self.south + self.north) / 2.0,
            lng: (self.west + self.east) / 2.0,
        }
    }
}

/// Visible region in degrees, ready for a canvas' x (lng) and y (lat) bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: LatLng,
    pub lat: [f64; 2],
    pub lng: [f64; 2],
}

/// Fit the viewport to the markers' bounding box with a little padding.
pub fn fit_viewport(bounds: Option<Bounds>) -> Viewport {
    let Some(b) = bounds else {
        return Viewport {
            center: DEFAULT_CENTER,
            lat: [
                DEFAULT_CENTER.lat - DEFAULT_SPAN_LAT / 2.0,
                DEFAULT_CENTER.lat + DEFAULT_SPAN_LAT / 2.0,
            ],
            lng: [
                DEFAULT_CENTER.lng - DEFAULT_SPAN_LNG / 2.0,
                DEFAULT_CENTER.lng + DEFAULT_SPAN_LNG / 2.0,
            ],
        };
    };
    let center = b.center();
    let half_lat = ((b.north - b.south) * (1.0 + PADDING)).max(MIN_SPAN) / 2.0;
    let half_lng = ((b.east - b.west) * (1.0 + PADDING)).max(MIN_SPAN) / 2.0;
    Viewport {
        center,
        lat: [center.lat - half_lat, center.lat + half_lat],
        lng: [center.lng - half_lng, center.lng + half_lng],
    }
}

/// Marker title: `case_no - applicant_name`.
pub fn marker_title(r: &ApplicationRecord) -> String {
    format!(
        "{} - {}",
        r.case_no.as_deref().filter(|s| !s.is_empty()).unwrap_or(NO_CASE_NO),
        r.applicant_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_NAME)
    )
}

/// One geocode job per record that has a location; records without one are skipped.
pub fn plan_pass(records: &[ApplicationRecord]) -> Vec<GeocodeJob> {
    records
        .iter()
        .filter_map(|r| {
            r.location().map(|loc| GeocodeJob {
                record_id: r.id.clone(),
                title: marker_title(r),
                status: r.status.clone(),
                address: loc.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Default)]
pub struct MapOverlay {
    generation: u64,
    markers: Vec<Marker>,
    bounds: Option<Bounds>,
    requested: usize,
    failed: usize,
    finished: bool,
}

impl MapOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass: drop every marker and bump the generation in one step.
    pub fn begin_pass(&mut self, requested: usize) -> u64 {
        self.generation += 1;
        self.markers.clear();
        self.bounds = None;
        self.requested = requested;
        self.failed = 0;
        self.finished = requested == 0;
        self.generation
    }

    /// Invalidate the current pass without starting a new one (leaving map mode).
    pub fn reset(&mut self) {
        self.begin_pass(0);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn viewport(&self) -> Viewport {
        fit_viewport(self.bounds)
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn outstanding(&self) -> usize {
        self.requested
            .saturating_sub(self.markers.len() + self.failed)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply one geocode result. Returns `false` when it belonged to a stale pass.
    pub fn apply(&mut self, outcome: GeocodeOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                stale = outcome.generation,
                current = self.generation,
                record_id = %outcome.job.record_id,
                "discarding stale geocode result"
            );
            return false;
        }
        match outcome.result {
            Ok(position) => {
                match self.bounds.as_mut() {
                    Some(b) => b.extend(position),
                    None => self.bounds = Some(Bounds::around(position)),
                }
                let job = outcome.job;
                self.markers.push(Marker {
                    record_id: job.record_id,
                    title: job.title,
                    status: job.status,
                    address: job.address,
                    position,
                });
            }
            Err(e) => {
                warn!(record_id = %outcome.job.record_id, address = %outcome.job.address, error = %e, "geocode failed, skipping marker");
                self.failed += 1;
            }
        }
        true
    }

    pub fn finish(&mut self, generation: u64) {
        if generation == self.generation {
            self.finished = true;
        }
    }
}

/// Handle to a running geocode pass. Aborting it cancels every outstanding request.
pub struct PassHandle {
    generation: u64,
    handle: JoinHandle<()>,
}

impl PassHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Spawn one geocode task per job. Each result is sent as soon as it arrives,
/// followed by a `GeocodePassFinished` once all jobs are done.
pub fn spawn_pass(
    geocoder: Arc<dyn Geocoder>,
    generation: u64,
    jobs: Vec<GeocodeJob>,
    limit: Arc<Semaphore>,
    event_tx: UnboundedSender<AppEvent>,
) -> PassHandle {
    let handle = tokio::spawn(async move {
        let mut set = JoinSet::new();
        for job in jobs {
            let geocoder = geocoder.clone();
            let limit = limit.clone();
            let tx = event_tx.clone();
            set.spawn(async move {
                let result = match limit.acquire_owned().await {
                    Ok(_permit) => geocoder.geocode(&job.address).await,
                    Err(_) => return false,
                };
                let ok = result.is_ok();
                let _ = tx.send(AppEvent::Geocoded(GeocodeOutcome {
                    generation,
                    job,
                    result,
                }));
                ok
            });
        }

        let mut placed = 0;
        let mut failed = 0;
        while let Some(res) = set.join_next().await {
            match res {
                Ok(true) => placed += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    debug!(error = %e, "geocode task ended early");
                    failed += 1;
                }
            }
        }
        let _ = event_tx.send(AppEvent::GeocodePassFinished {
            generation,
            placed,
            failed,
        });
    });
    PassHandle { generation, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeocodeError;

    fn job(id: &str) -> GeocodeJob {
        GeocodeJob {
            record_id: id.into(),
            title: format!("{id} - x"),
            status: ApplicationStatus::Pending,
            address: format!("addr {id}"),
        }
    }

    fn ok(generation: u64, id: &str, lat: f64, lng: f64) -> GeocodeOutcome {
        GeocodeOutcome {
            generation,
            job: job(id),
            result: Ok(LatLng { lat, lng }),
        }
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut overlay = MapOverlay::new();
        let old = overlay.begin_pass(2);
        assert!(overlay.apply(ok(old, "a", 23.0, 120.0)));

        let current = overlay.begin_pass(1);
        assert!(overlay.markers().is_empty());
        assert!(!overlay.apply(ok(old, "b", 25.0, 121.5)));
        assert!(overlay.markers().is_empty());

        assert!(overlay.apply(ok(current, "c", 22.6, 120.3)));
        assert_eq!(overlay.markers().len(), 1);
        assert_eq!(overlay.markers()[0].record_id, "c");
    }

    #[test]
    fn failures_are_counted_not_placed() {
        let mut overlay = MapOverlay::new();
        let g = overlay.begin_pass(2);
        overlay.apply(GeocodeOutcome {
            generation: g,
            job: job("a"),
            result: Err(GeocodeError::NotFound {
                address: "addr a".into(),
            }),
        });
        overlay.apply(ok(g, "b", 24.1, 120.6));
        assert_eq!(overlay.failed(), 1);
        assert_eq!(overlay.markers().len(), 1);
        assert_eq!(overlay.outstanding(), 0);
    }

    #[test]
    fn viewport_grows_with_markers() {
        let mut overlay = MapOverlay::new();
        assert_eq!(overlay.viewport().center, DEFAULT_CENTER);

        let g = overlay.begin_pass(2);
        overlay.apply(ok(g, "a", 22.0, 120.0));
        let single = overlay.viewport();
        assert_eq!(single.center, LatLng { lat: 22.0, lng: 120.0 });
        assert!(single.lat[1] - single.lat[0] >= MIN_SPAN - 1e-9);

        overlay.apply(ok(g, "b", 25.0, 121.0));
        let vp = overlay.viewport();
        assert!(vp.lat[0] < 22.0 && vp.lat[1] > 25.0);
        assert!(vp.lng[0] < 120.0 && vp.lng[1] > 121.0);
        assert_eq!(
            overlay.bounds(),
            Some(Bounds {
                south: 22.0,
                west: 120.0,
                north: 25.0,
                east: 121.0
            })
        );
    }

    #[test]
    fn plan_skips_records_without_location() {
        let records = vec![
            ApplicationRecord {
                id: "1".into(),
                case_no: Some("C-1".into()),
                applicant_name: Some("王".into()),
                address: Some("台北市".into()),
                ..Default::default()
            },
            ApplicationRecord {
                id: "2".into(),
                address: Some(String::new()),
                ..Default::default()
            },
        ];
        let jobs = plan_pass(&records);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "C-1 - 王");
        assert_eq!(jobs[0].address, "台北市");
    }

    #[test]
    fn reset_invalidates_in_flight_pass() {
        let mut overlay = MapOverlay::new();
        let g = overlay.begin_pass(3);
        overlay.reset();
        assert!(!overlay.apply(ok(g, "a", 23.0, 120.0)));
        assert!(overlay.is_finished());
    }
}

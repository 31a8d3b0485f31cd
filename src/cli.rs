use crate::config::{build_http_client, AppConfig, ConfigOverrides};
use crate::filter::FilterCriteria;
use crate::geocode::{build_geocoder, GeocoderKind};
use crate::map::{plan_pass, spawn_pass, MapOverlay};
use crate::model::{AppEvent, ViewMode};
use crate::orchestrator::{process_load_completion, ExportTargets};
use crate::render::{local_offset, render_list};
use crate::store::{ApplicationStore, ApplicationsClient};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "relief-review",
    version,
    about = "Review console for disaster-relief subsidy applications"
)]
pub struct Cli {
    /// Backend origin; the frontend config is read from {origin}/api/v1/config/frontend
    #[arg(long, default_value = "http://localhost:8000")]
    pub origin: String,

    /// API base URL; skips the frontend config lookup when given
    #[arg(long)]
    pub api_base: Option<String>,

    /// Bearer token for the applications API
    #[arg(long, env = "RELIEF_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum number of applications to request
    #[arg(long, default_value_t = 1000)]
    pub limit: usize,

    /// HTTP request timeout
    #[arg(long, default_value = "10s")]
    pub timeout: humantime::Duration,

    /// Print JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Initial view
    #[arg(long, value_enum, default_value_t = ViewMode::List)]
    pub view: ViewMode,

    /// Filter: city (substring of address or damage location)
    #[arg(long, default_value = "")]
    pub city: String,

    /// Filter: township (substring of address or damage location)
    #[arg(long, default_value = "")]
    pub township: String,

    /// Filter: village (substring of address or damage location)
    #[arg(long, default_value = "")]
    pub village: String,

    /// Filter: disaster type code (flood, typhoon, earthquake, fire, other)
    #[arg(long, default_value = "")]
    pub disaster_type: String,

    /// Filter: status code (pending, under_review, site_inspection, approved, completed, rejected)
    #[arg(long, default_value = "")]
    pub status: String,

    /// Filter: case-insensitive search over case number, name, addresses and phone
    #[arg(long, default_value = "")]
    pub search: String,

    /// Geocoding service used for map markers
    #[arg(long, value_enum, default_value_t = GeocoderKind::Backend)]
    pub geocoder: GeocoderKind,

    /// Google Maps API key (only for --geocoder google)
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    pub google_maps_key: Option<String>,

    /// Maximum concurrent geocode requests
    #[arg(long, default_value_t = 8)]
    pub geocode_concurrency: usize,

    /// Export the filtered applications as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Export the filtered applications as CSV
    #[arg(long)]
    pub export_csv: Option<std::path::PathBuf>,

    /// Log file used while the TUI is active
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        !self.json && !self.text
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            city: self.city.clone(),
            township: self.township.clone(),
            village: self.village.clone(),
            disaster_type: self.disaster_type.clone(),
            status: self.status.clone(),
            search_term: self.search.clone(),
        }
    }

    pub fn export_targets(&self) -> ExportTargets {
        ExportTargets {
            json: self.export_json.clone(),
            csv: self.export_csv.clone(),
        }
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            origin: self.origin.clone(),
            api_base: self.api_base.clone(),
            token: self.token.clone(),
            limit: self.limit,
            timeout: Duration::from(self.timeout),
        }
    }
}

/// Shared pieces built once at startup and handed to whichever mode runs.
pub struct Session {
    pub cfg: AppConfig,
    pub client: ApplicationsClient,
    pub geocoder: Option<Arc<dyn crate::geocode::Geocoder>>,
}

/// Resolve configuration and build the HTTP collaborators.
pub async fn build_session(args: &Cli) -> Result<Session> {
    let http = build_http_client(Duration::from(args.timeout)).context("build HTTP client")?;
    let cfg = AppConfig::resolve(args.overrides(), &http).await;
    let client = ApplicationsClient::new(&cfg, http.clone());
    let geocoder = build_geocoder(args.geocoder, &cfg, http.clone(), args.google_maps_key.clone());
    if args.geocoder == GeocoderKind::Google && geocoder.is_none() {
        tracing::warn!("--geocoder google needs --google-maps-key or GOOGLE_MAPS_API_KEY");
    }
    Ok(Session {
        cfg,
        client,
        geocoder,
    })
}

pub async fn run(args: Cli) -> Result<()> {
    let session = build_session(&args).await?;

    if args.is_interactive() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, session).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_once(args, session).await;
        }
    }

    run_once(args, session).await
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    app_name: &'a str,
    api_base_url: &'a str,
    load_failed: Option<&'a str>,
    view: ViewMode,
    criteria: &'a FilterCriteria,
    stats: crate::model::StatSummary,
    records: &'a [crate::model::ApplicationRecord],
    render: &'a crate::render::ListRender,
    #[serde(skip_serializing_if = "Option::is_none")]
    markers: Option<Vec<MarkerOut>>,
}

#[derive(Serialize)]
struct MarkerOut {
    record_id: String,
    title: String,
    color: &'static str,
    lat: f64,
    lng: f64,
}

/// Load once, filter with the CLI criteria, print, export and exit.
async fn run_once(args: Cli, session: Session) -> Result<()> {
    let (out_tx, out_handle) = spawn_output_writer();
    let criteria = args.criteria();

    let mut store = ApplicationStore::new();
    store.set_view_mode(args.view);
    let outcome = store.load(&session.client).await;
    let filtered = store.filtered(&criteria);
    let render = render_list(&filtered, local_offset());

    for msg in process_load_completion(
        &args.export_targets(),
        &criteria,
        store.stats(),
        &filtered,
        &render,
    ) {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }

    let overlay = if store.view_mode() == ViewMode::Map {
        Some(geocode_once(&session, &filtered, args.geocode_concurrency).await)
    } else {
        None
    };

    let failed_reason = match &outcome {
        crate::model::LoadOutcome::Failed { reason } => Some(reason.as_str()),
        _ => None,
    };

    if args.json {
        let doc = JsonOutput {
            app_name: &session.cfg.app_name,
            api_base_url: &session.cfg.api_base_url,
            load_failed: failed_reason,
            view: store.view_mode(),
            criteria: &criteria,
            stats: store.stats(),
            records: &filtered,
            render: &render,
            markers: overlay.as_ref().map(|o| {
                o.markers()
                    .iter()
                    .map(|m| MarkerOut {
                        record_id: m.record_id.clone(),
                        title: m.title.clone(),
                        color: m.color(),
                        lat: m.position.lat,
                        lng: m.position.lng,
                    })
                    .collect()
            }),
        };
        let out = serde_json::to_string_pretty(&doc)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = match overlay.as_ref() {
            Some(o) => crate::text_summary::build_map_summary(
                store.last_outcome(),
                &store.stats(),
                &criteria,
                o,
            ),
            None => crate::text_summary::build_list_summary(
                store.last_outcome(),
                &store.stats(),
                &criteria,
                &render,
            ),
        };
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "{} ({})",
            session.cfg.app_name, session.cfg.api_base_url
        )));
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Run a single geocode pass to completion and return the resulting overlay.
async fn geocode_once(
    session: &Session,
    filtered: &[crate::model::ApplicationRecord],
    concurrency: usize,
) -> MapOverlay {
    let mut overlay = MapOverlay::new();
    let jobs = plan_pass(filtered);
    let generation = overlay.begin_pass(jobs.len());
    let Some(geocoder) = session.geocoder.clone() else {
        tracing::warn!("no geocoder configured, map output has no markers");
        return overlay;
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<AppEvent>();
    let _pass = spawn_pass(
        geocoder,
        generation,
        jobs,
        Arc::new(Semaphore::new(concurrency.max(1))),
        tx,
    );
    while let Some(ev) = rx.recv().await {
        match ev {
            AppEvent::Geocoded(outcome) => {
                overlay.apply(outcome);
            }
            AppEvent::GeocodePassFinished { generation, .. } => {
                overlay.finish(generation);
                break;
            }
            _ => {}
        }
    }
    overlay
}

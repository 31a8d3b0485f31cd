//! Load and geocode lifecycle controller.
//!
//! Owns store loads and map geocode passes and emits events for presentation layers.
//! The presentation layer owns the store and the overlay; this task only does I/O.

use crate::geocode::Geocoder;
use crate::map::{spawn_pass, PassHandle};
use crate::model::{AppEvent, ApplicationRecord, GeocodeJob, InfoEvent};
use crate::error::FetchError;
use crate::store::ApplicationsClient;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Reload,
    /// Replace the running map pass with a new one for `generation`.
    Geocode {
        generation: u64,
        jobs: Vec<GeocodeJob>,
    },
    /// Stop the running map pass (view switched away from the map).
    CancelGeocode,
    Quit,
}

/// Everything the controller needs to talk to the outside world.
pub struct ControllerCtx {
    pub client: ApplicationsClient,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub geocode_concurrency: usize,
    pub load_on_launch: bool,
}

type LoadHandle = tokio::task::JoinHandle<Result<Vec<ApplicationRecord>, FetchError>>;

fn start_load(client: &ApplicationsClient, event_tx: &UnboundedSender<AppEvent>) -> LoadHandle {
    let _ = event_tx.send(AppEvent::LoadStarted);
    let client = client.clone();
    tokio::spawn(async move { client.fetch().await })
}

/// Serve UI commands until `Quit` (or the command channel closes).
pub async fn run_controller(
    ctx: ControllerCtx,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let limit = Arc::new(Semaphore::new(ctx.geocode_concurrency.max(1)));
    let mut load: Option<LoadHandle> = if ctx.load_on_launch {
        Some(start_load(&ctx.client, &event_tx))
    } else {
        None
    };
    let mut reload_pending = false;
    let mut pass: Option<PassHandle> = None;

    let res = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Reload) => {
                        // Reloads are serialized: a reload during a load runs once it lands.
                        if load.is_some() {
                            reload_pending = true;
                        } else {
                            load = Some(start_load(&ctx.client, &event_tx));
                        }
                    }
                    Some(UiCommand::Geocode { generation, jobs }) => {
                        if let Some(old) = pass.take() {
                            debug!(generation = old.generation(), "cancelling superseded geocode pass");
                            old.cancel();
                        }
                        match ctx.geocoder.as_ref() {
                            Some(geocoder) => {
                                info!(generation, jobs = jobs.len(), geocoder = geocoder.name(), "starting geocode pass");
                                pass = Some(spawn_pass(
                                    geocoder.clone(),
                                    generation,
                                    jobs,
                                    limit.clone(),
                                    event_tx.clone(),
                                ));
                            }
                            None => {
                                let _ = event_tx.send(AppEvent::Info(InfoEvent::GeocoderUnavailable));
                                let _ = event_tx.send(AppEvent::GeocodePassFinished {
                                    generation,
                                    placed: 0,
                                    failed: 0,
                                });
                            }
                        }
                    }
                    Some(UiCommand::CancelGeocode) => {
                        if let Some(old) = pass.take() {
                            old.cancel();
                        }
                    }
                    Some(UiCommand::Quit) | None => break Ok(()),
                }
            }
            // Keep the JoinHandle in place until this branch wins, otherwise a losing
            // select branch would drop it and the load result would be lost.
            maybe_done = async {
                if let Some(h) = load.as_mut() {
                    return Some(h.await);
                }
                futures::future::pending().await
            } => {
                if let Some(join_res) = maybe_done {
                    load = None;
                    let result = match join_res {
                        Ok(r) => r,
                        Err(e) => {
                            let _ = event_tx.send(AppEvent::Info(InfoEvent::Message(format!(
                                "Load task failed: {e}"
                            ))));
                            continue;
                        }
                    };
                    let _ = event_tx.send(AppEvent::Loaded { result });
                    if reload_pending {
                        reload_pending = false;
                        load = Some(start_load(&ctx.client, &event_tx));
                    }
                }
            }
        }
    };

    if let Some(p) = pass.take() {
        p.cancel();
    }
    if let Some(h) = load.take() {
        h.abort();
    }
    res
}

pub mod config;
pub mod dom;
pub mod errors;
pub mod image_map;
pub mod viewport;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::AppConfig;
use crate::dom::headless::HeadlessDocument;
use crate::dom::traits::Document;
use crate::errors::{MapError, MapResult};
use crate::image_map::loader::FsImageLoader;
use crate::image_map::map::ImageMap;
use crate::viewport::event_bus::ViewportBus;
use crate::viewport::session::{mount, MapEvent, Subscription};

/// CLI entry: load `gatemap.toml`, mount the map in a headless page, replay
/// the configured viewport sizes and print every map event as a JSON line.
pub fn run() -> MapResult<()> {
    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config, path) = config::load_config()?;
    let image_root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    runtime.block_on(replay(config, image_root, &mut out))
}

/// Mount the configured map and walk it through every resize step.
pub async fn replay<W: Write>(config: AppConfig, image_root: PathBuf, out: &mut W) -> MapResult<()> {
    let mut doc = HeadlessDocument::new(config.viewport.initial());
    let body = doc.body();
    let container = doc.create_element("div");
    doc.append_child(body, container)?;
    let pins: Vec<_> = config
        .map
        .gates
        .iter()
        .map(|_| doc.create_element("button"))
        .collect();

    let url = config.map.map_image.clone();
    let map = ImageMap::with_layout(&mut doc, config.map.clone(), pins, container, config.layout.clone())?;
    let doc = Arc::new(Mutex::new(doc));
    let bus = ViewportBus::new();
    let loader = Arc::new(FsImageLoader::new(image_root));
    let mut sub = mount(doc.clone(), map, loader, bus.clone());

    if !pump_until_layout(&mut sub, out).await? {
        sub.dispose().await?;
        return Err(MapError::ImageLoad(format!("{url} could not be loaded")));
    }

    for step in config.viewport.steps() {
        doc.lock().await.set_viewport(step);
        bus.resize(step);
        pump_until_layout(&mut sub, out).await?;
    }

    let map = sub.dispose().await?;
    tracing::info!(map_id = %map.id(), state = ?map.state(), "replay finished");
    Ok(())
}

/// Forward events to `out` until the next layout pass ends, successful or
/// not. `false` when the image failed to load instead.
async fn pump_until_layout<W: Write>(sub: &mut Subscription, out: &mut W) -> MapResult<bool> {
    while let Some(event) = sub.next_event().await {
        serde_json::to_writer(&mut *out, &event)?;
        writeln!(out)?;
        match event {
            MapEvent::Repositioned { .. } => return Ok(true),
            MapEvent::RecomputeFailed { reason, .. } => {
                tracing::warn!(reason = %reason, "layout pass failed");
                return Ok(true);
            }
            MapEvent::LoadFailed { .. } => return Ok(false),
            _ => {}
        }
    }
    Err(MapError::Session("map session ended unexpectedly".into()))
}

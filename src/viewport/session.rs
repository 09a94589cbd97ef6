/// Drives an [`ImageMap`] through its lifecycle: wait for the image, attach,
/// then reposition on every viewport resize until disposed.
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::dom::traits::Document;
use crate::dom::types::Size;
use crate::errors::{MapError, MapResult};
use crate::image_map::loader::ImageLoader;
use crate::image_map::map::ImageMap;
use crate::image_map::scale::ScaleRatio;
use crate::image_map::types::{Placement, Reposition};
use crate::viewport::event_bus::{ViewportBus, ViewportEvent};

const EVENT_BUFFER: usize = 64;

/// Lifecycle notifications published by a mounted map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MapEvent {
    Attached {
        map_id: Uuid,
        natural: Size,
    },
    Repositioned {
        map_id: Uuid,
        ratio: ScaleRatio,
        placements: Vec<Placement>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    LoadFailed {
        map_id: Uuid,
        url: String,
        reason: String,
    },
    RecomputeFailed {
        map_id: Uuid,
        reason: String,
    },
    Disposed {
        map_id: Uuid,
    },
}

impl MapEvent {
    fn repositioned(map_id: Uuid, update: Reposition) -> Self {
        MapEvent::Repositioned {
            map_id,
            ratio: update.ratio,
            placements: update.placements,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Handle to a mounted map.
///
/// Dropping it leaves the map listening for resizes for as long as the
/// runtime lives; [`Subscription::dispose`] stops the listener and takes
/// the map out of its container.
pub struct Subscription {
    map_id: Uuid,
    cancel: Arc<Notify>,
    events: mpsc::Receiver<MapEvent>,
    task: JoinHandle<MapResult<ImageMap>>,
}

impl Subscription {
    pub fn map_id(&self) -> Uuid {
        self.map_id
    }

    /// Next lifecycle event, `None` once the session has ended and drained.
    pub async fn next_event(&mut self) -> Option<MapEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<MapEvent> {
        self.events.try_recv().ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop listening, detach the map and hand it back.
    pub async fn dispose(self) -> MapResult<ImageMap> {
        let Subscription {
            cancel,
            events,
            task,
            ..
        } = self;
        // Unblocks a session waiting on a full event buffer.
        drop(events);
        cancel.notify_one();
        task.await
            .map_err(|e| MapError::Session(format!("join: {e}")))?
    }
}

/// Start loading `map`'s image and drive the map from then on.
pub fn mount<D, L>(
    doc: Arc<Mutex<D>>,
    map: ImageMap,
    loader: Arc<L>,
    bus: ViewportBus,
) -> Subscription
where
    D: Document + Send + 'static,
    L: ImageLoader + ?Sized + 'static,
{
    let map_id = map.id();
    let cancel = Arc::new(Notify::new());
    let (events_tx, events) = mpsc::channel(EVENT_BUFFER);

    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        let result = drive(doc, map, loader, bus, task_cancel, events_tx).await;
        if let Err(e) = &result {
            tracing::error!(map_id = %map_id, error = %e, "map session ended with an error");
        }
        result
    });

    Subscription {
        map_id,
        cancel,
        events,
        task,
    }
}

async fn drive<D, L>(
    doc: Arc<Mutex<D>>,
    mut map: ImageMap,
    loader: Arc<L>,
    bus: ViewportBus,
    cancel: Arc<Notify>,
    events: mpsc::Sender<MapEvent>,
) -> MapResult<ImageMap>
where
    D: Document + Send + 'static,
    L: ImageLoader + ?Sized + 'static,
{
    let map_id = map.id();
    let url = map.config().map_image.clone();

    let loaded = tokio::select! {
        _ = cancel.notified() => {
            tracing::info!(map_id = %map_id, "disposed before the image loaded");
            return finish(&doc, map, &events).await;
        }
        result = loader.load(&url) => result,
    };

    let natural = match loaded {
        Ok(size) => size,
        Err(e) => return Ok(fail(map, url, &e, &events).await),
    };

    // The resize listener only exists once the map is attached.
    let attached = {
        let mut doc = doc.lock().await;
        doc.resolve_image(map.image_element(), natural)
            .and_then(|()| map.attach(&mut *doc))
            .map(|first| (first, bus.subscribe()))
    };
    drop(bus);
    let mut resize_rx = match attached {
        Ok((first, rx)) => {
            emit(&events, MapEvent::Attached { map_id, natural }).await;
            emit(&events, MapEvent::repositioned(map_id, first)).await;
            rx
        }
        Err(e) => return Ok(fail(map, url, &e, &events).await),
    };

    loop {
        let should_recompute = tokio::select! {
            _ = cancel.notified() => break,
            received = resize_rx.recv() => match received {
                Ok(ViewportEvent::Resized { width, height, .. }) => {
                    tracing::debug!(map_id = %map_id, width, height, "resize received");
                    true
                }
                // Positions only depend on the current layout. The next recv
                // yields the newest retained resize, which covers the missed ones.
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(map_id = %map_id, missed, "resize events collapsed");
                    false
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(map_id = %map_id, "viewport bus closed, waiting for dispose");
                    cancel.notified().await;
                    break;
                }
            },
        };

        if should_recompute {
            let update = {
                let mut doc = doc.lock().await;
                map.update_positions(&mut *doc)
            };
            let event = match update {
                Ok(update) => MapEvent::repositioned(map_id, update),
                Err(e) => {
                    tracing::warn!(map_id = %map_id, error = %e, "recompute failed");
                    MapEvent::RecomputeFailed {
                        map_id,
                        reason: e.to_string(),
                    }
                }
            };
            emit(&events, event).await;
        }
    }

    finish(&doc, map, &events).await
}

async fn finish<D: Document>(
    doc: &Mutex<D>,
    mut map: ImageMap,
    events: &mpsc::Sender<MapEvent>,
) -> MapResult<ImageMap> {
    {
        let mut doc = doc.lock().await;
        map.detach(&mut *doc)?;
    }
    emit(events, MapEvent::Disposed { map_id: map.id() }).await;
    Ok(map)
}

/// The image never became usable: the map stays out of the tree.
async fn fail(
    mut map: ImageMap,
    url: String,
    error: &MapError,
    events: &mpsc::Sender<MapEvent>,
) -> ImageMap {
    let map_id = map.id();
    tracing::warn!(map_id = %map_id, url = %url, error = %error, "map image unusable; map stays detached");
    map.mark_failed();
    emit(
        events,
        MapEvent::LoadFailed {
            map_id,
            url,
            reason: error.to_string(),
        },
    )
    .await;
    map
}

/// Waits for buffer space; only fails once the subscriber is gone.
async fn emit(events: &mpsc::Sender<MapEvent>, event: MapEvent) {
    if events.send(event).await.is_err() {
        tracing::debug!("map event dropped: subscriber gone");
    }
}

//! CameraManager - owns every capture stream the bridge opens
//!
//! Guarantees:
//! - at most one stream is registered at any instant (acquire tears the
//!   previous one down first, under a lock)
//! - `stop_all_streams` is idempotent and never fails
//! - a [`StreamGuard`] releases its stream when dropped, so no exit path of
//!   the decode loop can leak the camera

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::backend::{CameraBackend, CameraError, CaptureStream, Frame};
use crate::bus::{BusEvent, SharedBus};

type Slots = Arc<Mutex<HashMap<u64, Arc<StreamSlot>>>>;

/// One registered stream. `None` once stopped.
struct StreamSlot {
    id: u64,
    stream: AsyncMutex<Option<Box<dyn CaptureStream>>>,
}

impl StreamSlot {
    /// Stop and detach the stream. Waits for an in-flight frame read.
    async fn shutdown(&self) -> bool {
        let taken = self.stream.lock().await.take();
        match taken {
            Some(mut stream) => {
                if let Err(e) = stream.stop() {
                    warn!(stream_id = self.id, "Error stopping camera stream: {}", e);
                }
                true
            }
            None => false,
        }
    }

    /// Best-effort stop from a sync context (Drop)
    fn try_shutdown(&self) {
        match self.stream.try_lock() {
            Ok(mut guard) => {
                if let Some(mut stream) = guard.take() {
                    if let Err(e) = stream.stop() {
                        warn!(stream_id = self.id, "Error stopping camera stream: {}", e);
                    }
                }
            }
            // Someone is mid-shutdown and will stop it
            Err(_) => debug!(stream_id = self.id, "Stream busy during drop"),
        }
    }
}

pub struct CameraManager {
    backend: Arc<dyn CameraBackend>,
    slots: Slots,
    next_id: AtomicU64,
    /// Serializes acquire so two sessions can never both open the device
    acquire_lock: AsyncMutex<()>,
    bus: SharedBus,
}

impl CameraManager {
    pub fn new(backend: Arc<dyn CameraBackend>, bus: SharedBus) -> Self {
        Self {
            backend,
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            acquire_lock: AsyncMutex::new(()),
            bus,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Open the camera, tearing down any stream that is still registered.
    pub async fn acquire(&self) -> Result<StreamGuard, CameraError> {
        let _lock = self.acquire_lock.lock().await;

        self.stop_all_streams().await;

        let stream = self.backend.open().await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let slot = Arc::new(StreamSlot {
            id,
            stream: AsyncMutex::new(Some(stream)),
        });

        if let Ok(mut slots) = self.slots.lock() {
            slots.insert(id, slot.clone());
        }

        info!(stream_id = id, backend = self.backend.name(), "Camera acquired");
        Ok(StreamGuard {
            slot,
            slots: self.slots.clone(),
        })
    }

    /// Stop every known stream and nudge the backend into releasing the
    /// hardware. No-op when nothing is active; errors are logged only.
    pub async fn stop_all_streams(&self) -> usize {
        let drained: Vec<Arc<StreamSlot>> = match self.slots.lock() {
            Ok(mut slots) => slots.drain().map(|(_, slot)| slot).collect(),
            Err(poisoned) => poisoned.into_inner().drain().map(|(_, slot)| slot).collect(),
        };

        let mut stopped = 0;
        for slot in drained {
            if slot.shutdown().await {
                stopped += 1;
            }
        }

        if let Err(e) = self.backend.release_hint().await {
            warn!("Camera release hint failed: {}", e);
        }

        if stopped > 0 {
            info!(streams = stopped, "Stopped camera streams");
            self.bus.publish(BusEvent::CameraReleased { streams: stopped });
        }
        stopped
    }

    /// Number of streams currently registered
    pub fn active_streams(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// True if the manager holds a stream or the device reports itself busy
    pub async fn is_camera_active(&self) -> bool {
        self.active_streams() > 0 || self.backend.device_in_use().await
    }
}

/// Scoped handle to an acquired stream. Dropping it stops the stream.
pub struct StreamGuard {
    slot: Arc<StreamSlot>,
    slots: Slots,
}

impl StreamGuard {
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    /// Read the next frame; `Err(Stopped)` once the stream was torn down.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        let mut stream = self.slot.stream.lock().await;
        match stream.as_mut() {
            Some(s) => s.next_frame().await,
            None => Err(CameraError::Stopped),
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Ok(mut slots) = self.slots.lock() {
            slots.remove(&self.slot.id);
        }
        self.slot.try_shutdown();
    }
}

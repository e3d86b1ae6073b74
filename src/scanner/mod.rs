//! QR scan sessions
//!
//! A session walks `Idle -> Initializing -> Scanning -> Stopped` and yields
//! exactly one [`ScanOutcome`]:
//! - decoded payload: the camera is released first, then after a short grace
//!   period the text is delivered
//! - camera acquisition failure: delivered immediately
//! - cancel / superseded by a newer session: delivered by whoever ended it
//!
//! Exactly-once delivery comes from the [`OutcomeSlot`]: the first party to
//! claim the oneshot sender owns the outcome, everyone after that is a no-op.
//! Each session carries a generation number; state writes from a session that
//! is no longer current are dropped.

pub mod decoder;
pub mod watchdog;

pub use decoder::{DecodeError, QrDecoder, RqrrDecoder};
pub use watchdog::CameraWatchdog;

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bus::{BusEvent, SharedBus};
use crate::camera::{CameraError, CameraManager};
use resort_wire::ScanEndReason;

/// Default frame sampling rate
pub const DEFAULT_FPS: u32 = 10;

/// Pause between releasing the camera and delivering a decoded payload
pub const DEFAULT_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Initializing,
    Scanning,
    Succeeded,
    Failed,
    Cancelled,
}

impl ScanState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Initializing | Self::Scanning)
    }
}

/// Terminal result of a scan session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Decoded(String),
    Failed(String),
    Cancelled,
    /// A newer session replaced this one
    Superseded,
}

#[derive(Debug, Clone)]
pub struct ScannerSettings {
    pub frame_interval: Duration,
    pub grace: Duration,
}

impl ScannerSettings {
    pub fn from_fps(fps: u32, grace: Duration) -> Self {
        let fps = fps.max(1);
        Self {
            frame_interval: Duration::from_millis(1000 / fps as u64),
            grace,
        }
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self::from_fps(DEFAULT_FPS, DEFAULT_GRACE)
    }
}

/// Holds the outcome sender until someone claims it
#[derive(Clone)]
struct OutcomeSlot(Arc<Mutex<Option<oneshot::Sender<ScanOutcome>>>>);

impl OutcomeSlot {
    fn new(tx: oneshot::Sender<ScanOutcome>) -> Self {
        Self(Arc::new(Mutex::new(Some(tx))))
    }

    fn claim(&self) -> Option<oneshot::Sender<ScanOutcome>> {
        match self.0.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

/// Caller's end of a session
pub struct ScanHandle {
    pub generation: u64,
    outcome: oneshot::Receiver<ScanOutcome>,
}

impl ScanHandle {
    /// Wait for the session's single outcome
    pub async fn outcome(self) -> ScanOutcome {
        // Sender dropped without sending only if the task died
        self.outcome.await.unwrap_or(ScanOutcome::Cancelled)
    }
}

struct ActiveSession {
    generation: u64,
    cancel: CancellationToken,
    slot: OutcomeSlot,
    task: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScanStatus {
    pub generation: u64,
    pub state: ScanState,
}

pub struct Scanner {
    camera: Arc<CameraManager>,
    decoder: Arc<dyn QrDecoder>,
    bus: SharedBus,
    settings: ScannerSettings,
    generation: AtomicU64,
    /// (generation, state); written only by the current generation
    state: Mutex<(u64, ScanState)>,
    active: AsyncMutex<Option<ActiveSession>>,
}

impl Scanner {
    pub fn new(
        camera: Arc<CameraManager>,
        decoder: Arc<dyn QrDecoder>,
        bus: SharedBus,
        settings: ScannerSettings,
    ) -> Self {
        Self {
            camera,
            decoder,
            bus,
            settings,
            generation: AtomicU64::new(0),
            state: Mutex::new((0, ScanState::Idle)),
            active: AsyncMutex::new(None),
        }
    }

    pub fn camera(&self) -> &Arc<CameraManager> {
        &self.camera
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ScanStatus {
        let (generation, state) = match self.state.lock() {
            Ok(s) => *s,
            Err(poisoned) => *poisoned.into_inner(),
        };
        ScanStatus { generation, state }
    }

    pub fn is_scanning(&self) -> bool {
        self.status().state.is_active()
    }

    /// Record a state for `generation`; ignored if a newer session exists
    fn set_state(&self, generation: u64, state: ScanState) -> bool {
        let mut current = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };
        if generation < current.0 {
            debug!(generation, current = current.0, ?state, "Ignoring stale scan state");
            return false;
        }
        *current = (generation, state);
        true
    }

    /// Start a new session. Any running session is torn down completely
    /// (loop stopped, camera released) before the new one asks for the camera.
    pub async fn start(self: &Arc<Self>) -> ScanHandle {
        let mut active = self.active.lock().await;

        if let Some(previous) = active.take() {
            self.end_session(previous, ScanOutcome::Superseded).await;
        }
        self.camera.stop_all_streams().await;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_state(generation, ScanState::Initializing);

        let (tx, rx) = oneshot::channel();
        let slot = OutcomeSlot::new(tx);
        let cancel = CancellationToken::new();

        info!(generation, "Scan session starting");
        self.bus.publish(BusEvent::ScanStarted { generation });

        let task = tokio::spawn(self.clone().run_session(
            generation,
            cancel.clone(),
            slot.clone(),
        ));

        *active = Some(ActiveSession {
            generation,
            cancel,
            slot,
            task,
        });

        ScanHandle {
            generation,
            outcome: rx,
        }
    }

    /// Cancel the running session. Returns false (and only makes sure the
    /// camera is off) if the session had already produced its outcome.
    pub async fn cancel(&self) -> bool {
        let mut active = self.active.lock().await;
        let cancelled = match active.take() {
            Some(session) => self.end_session(session, ScanOutcome::Cancelled).await,
            None => false,
        };
        self.camera.stop_all_streams().await;
        cancelled
    }

    /// Stop a session's loop and, if nobody delivered its outcome yet,
    /// deliver `outcome`. Returns true if this call delivered it.
    async fn end_session(&self, session: ActiveSession, outcome: ScanOutcome) -> bool {
        let ActiveSession {
            generation,
            cancel,
            slot,
            task,
        } = session;

        let claimed = slot.claim();
        cancel.cancel();
        if let Err(e) = task.await {
            error!(generation, "Scan task ended abnormally: {}", e);
        }
        self.camera.stop_all_streams().await;

        let Some(tx) = claimed else {
            debug!(generation, "Session already finished");
            return false;
        };

        let reason = match &outcome {
            ScanOutcome::Superseded => ScanEndReason::Superseded,
            _ => ScanEndReason::Cancelled,
        };
        self.set_state(generation, ScanState::Cancelled);
        info!(generation, ?reason, "Scan session ended");
        self.bus.publish(BusEvent::ScanEnded { generation, reason });
        let _ = tx.send(outcome);
        true
    }

    async fn run_session(
        self: Arc<Self>,
        generation: u64,
        cancel: CancellationToken,
        slot: OutcomeSlot,
    ) {
        let acquired = tokio::select! {
            _ = cancel.cancelled() => return,
            result = self.camera.acquire() => result,
        };

        let mut stream = match acquired {
            Ok(stream) => stream,
            Err(e) => {
                warn!(generation, "Camera acquisition failed: {}", e);
                self.fail(generation, &slot, e).await;
                return;
            }
        };

        if !self.set_state(generation, ScanState::Scanning) {
            return;
        }
        info!(generation, stream_id = stream.id(), "Scanning");
        self.bus.publish(BusEvent::ScanRunning { generation });

        let mut ticker = interval(self.settings.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        frame = stream.next_frame() => frame,
                    }
                }
            };

            let frame = match frame {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    drop(stream);
                    warn!(generation, "Camera stream failed: {}", e);
                    self.fail(generation, &slot, e).await;
                    return;
                }
            };

            let text = match self.decoder.decode(&frame) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    debug!(generation, "Frame not decodable: {}", e);
                    continue;
                }
            };

            let Some(tx) = slot.claim() else {
                return;
            };

            info!(generation, code = %text, "QR code detected");
            self.set_state(generation, ScanState::Succeeded);

            // Release the hardware before anyone reacts to the result
            self.camera.stop_all_streams().await;
            drop(stream);
            tokio::time::sleep(self.settings.grace).await;

            self.bus.publish(BusEvent::ScanDecoded {
                generation,
                code: text.clone(),
            });
            let _ = tx.send(ScanOutcome::Decoded(text));
            return;
        }
    }

    async fn fail(&self, generation: u64, slot: &OutcomeSlot, err: CameraError) {
        let Some(tx) = slot.claim() else {
            return;
        };
        self.set_state(generation, ScanState::Failed);
        self.camera.stop_all_streams().await;

        let error = err.to_string();
        self.bus.publish(BusEvent::ScanEnded {
            generation,
            reason: ScanEndReason::Failed {
                error: error.clone(),
            },
        });
        let _ = tx.send(ScanOutcome::Failed(error));
    }
}

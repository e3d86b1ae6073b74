//! In-memory camera backend
//!
//! Serves frames pushed by the caller. Used by the test suite and selected
//! with `camera.backend = "memory"` on hosts without capture hardware. It also simulates
//! the two platform behaviours the manager has to cope with: denied access
//! and a device lock held outside any stream the bridge knows about.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::backend::{CameraBackend, CameraError, CaptureStream, Frame};

#[derive(Default)]
struct MemoryState {
    frames: VecDeque<Frame>,
    open_streams: usize,
    opened_total: usize,
    deny: bool,
    fail_stop: bool,
    external_lock: bool,
    release_hints: usize,
}

#[derive(Clone, Default)]
pub struct MemoryCamera {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCamera {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queue a frame for the next reader
    pub fn push_frame(&self, frame: Frame) {
        self.state().frames.push_back(frame);
    }

    /// Make `open` fail with `PermissionDenied`
    pub fn deny_access(&self, deny: bool) {
        self.state().deny = deny;
    }

    /// Make stream `stop` report an error (the stream still closes)
    pub fn fail_on_stop(&self, fail: bool) {
        self.state().fail_stop = fail;
    }

    /// Simulate a device lock held outside the bridge's streams.
    /// Cleared by the next release hint.
    pub fn hold_external_lock(&self) {
        self.state().external_lock = true;
    }

    pub fn open_streams(&self) -> usize {
        self.state().open_streams
    }

    pub fn opened_total(&self) -> usize {
        self.state().opened_total
    }

    pub fn release_hints(&self) -> usize {
        self.state().release_hints
    }
}

struct MemoryStream {
    camera: MemoryCamera,
    stopped: bool,
}

#[async_trait]
impl CaptureStream for MemoryStream {
    async fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        if self.stopped {
            return Err(CameraError::Stopped);
        }
        Ok(self.camera.state().frames.pop_front())
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        let mut state = self.camera.state();
        state.open_streams = state.open_streams.saturating_sub(1);
        if state.fail_stop {
            return Err(CameraError::Unavailable("track refused to stop".to_string()));
        }
        Ok(())
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[async_trait]
impl CameraBackend for MemoryCamera {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn open(&self) -> Result<Box<dyn CaptureStream>, CameraError> {
        {
            let mut state = self.state();
            if state.deny {
                return Err(CameraError::PermissionDenied);
            }
            state.open_streams += 1;
            state.opened_total += 1;
        }
        Ok(Box::new(MemoryStream {
            camera: self.clone(),
            stopped: false,
        }))
    }

    async fn device_in_use(&self) -> bool {
        let state = self.state();
        state.open_streams > 0 || state.external_lock
    }

    async fn release_hint(&self) -> Result<(), CameraError> {
        let mut state = self.state();
        state.release_hints += 1;
        state.external_lock = false;
        Ok(())
    }
}

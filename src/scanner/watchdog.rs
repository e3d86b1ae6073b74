//! CameraWatchdog - periodic leak correction for the capture device
//!
//! While no scan session is running the camera should be off. Every tick the
//! watchdog checks the device and force-releases anything it finds. With
//! scoped stream guards this normally finds nothing; it is there for locks
//! held outside the bridge's own streams.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::Scanner;
use crate::bus::{BusEvent, SharedBus};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

pub struct CameraWatchdog {
    scanner: Arc<Scanner>,
    bus: SharedBus,
    interval: Duration,
}

impl CameraWatchdog {
    pub fn new(scanner: Arc<Scanner>, bus: SharedBus, interval: Duration) -> Self {
        Self {
            scanner,
            bus,
            interval,
        }
    }

    /// Run until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Camera watchdog started");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately; skip it so startup is not a "leak"
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Camera watchdog stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.check_once().await;
                }
            }
        }
    }

    /// One inspection. Returns true if a leaked camera was released.
    pub async fn check_once(&self) -> bool {
        if self.scanner.is_scanning() {
            return false;
        }

        let camera = self.scanner.camera();
        if !camera.is_camera_active().await {
            return false;
        }

        warn!(
            streams = camera.active_streams(),
            "Camera active while idle, forcing release"
        );
        self.bus.publish(BusEvent::CameraLeakDetected);
        camera.stop_all_streams().await;
        true
    }
}

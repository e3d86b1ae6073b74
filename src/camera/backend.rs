//! Camera backend seam
//!
//! The platform capture API sits behind [`CameraBackend`]. A backend hands
//! out [`CaptureStream`]s; the [`CameraManager`](super::CameraManager) owns
//! every stream it opened so it can tear them all down at once.

use async_trait::async_trait;
use thiserror::Error;

/// A single greyscale frame, which is all the QR decoder needs
pub type Frame = image::GrayImage;

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera stream stopped")]
    Stopped,

    #[error("camera I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read frame: {0}")]
    Frame(#[from] image::ImageError),
}

impl CameraError {
    /// Map an I/O error from the device layer, keeping permission failures
    /// distinguishable.
    pub fn from_io(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied
        } else {
            Self::Io(err)
        }
    }
}

/// A live stream from a capture device.
#[async_trait]
pub trait CaptureStream: Send {
    /// Next frame, or `None` when no new frame is ready yet.
    async fn next_frame(&mut self) -> Result<Option<Frame>, CameraError>;

    /// Stop the underlying track. Must be safe to call more than once.
    fn stop(&mut self) -> Result<(), CameraError>;
}

/// Platform camera access.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Request the device and start streaming.
    async fn open(&self) -> Result<Box<dyn CaptureStream>, CameraError>;

    /// Poll the device list: is anything holding the camera right now?
    async fn device_in_use(&self) -> bool;

    /// Zero-length request that makes the platform drop any lingering
    /// hardware lock. Called after streams are stopped.
    async fn release_hint(&self) -> Result<(), CameraError>;
}

//! Frame-directory camera backend
//!
//! The bridge does not talk to V4L/PipeWire itself. A capture helper runs next
//! to it and spools still frames into a directory while the bridge asks for
//! the camera:
//!
//! - `capture.lock` present  -> the helper keeps the device open and writes
//!   `*.png` / `*.jpg` / `*.bmp` frames
//! - `capture.lock` removed  -> the helper closes the device
//!
//! Frames are consumed oldest-first and deleted once read. Helpers should
//! write each frame under a temporary name (`frame-0001.png.part`) and rename
//! it into place; names without a frame extension are ignored. A frame that
//! does not decode yet is left alone until it is [`FRAME_SETTLE`] old, so a
//! helper writing in place is read once the write completes.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use super::backend::{CameraBackend, CameraError, CaptureStream, Frame};

pub const LOCK_FILE: &str = "capture.lock";
const FRAME_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Unreadable frames younger than this may still be being written
pub const FRAME_SETTLE: Duration = Duration::from_millis(500);

pub struct FrameDirCamera {
    dir: PathBuf,
}

impl FrameDirCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }
}

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FRAME_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn remove_lock(path: &Path) -> Result<(), CameraError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CameraError::from_io(e)),
    }
}

/// Oldest spooled frame and its modification time, if any
async fn oldest_frame(dir: &Path) -> Result<Option<(SystemTime, PathBuf)>, CameraError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(CameraError::from_io)?;
    let mut oldest: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !is_frame(&path) {
            continue;
        }
        let modified = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let older = match &oldest {
            Some((t, p)) => (modified, &path) < (*t, p),
            None => true,
        };
        if older {
            oldest = Some((modified, path));
        }
    }

    Ok(oldest)
}

fn is_settled(modified: SystemTime) -> bool {
    modified
        .elapsed()
        .map(|age| age >= FRAME_SETTLE)
        .unwrap_or(false)
}

struct FrameDirStream {
    dir: PathBuf,
    lock: PathBuf,
    stopped: bool,
}

#[async_trait]
impl CaptureStream for FrameDirStream {
    async fn next_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        if self.stopped {
            return Err(CameraError::Stopped);
        }

        let Some((modified, path)) = oldest_frame(&self.dir).await? else {
            return Ok(None);
        };

        let load_path = path.clone();
        let decoded = tokio::task::spawn_blocking(move || image::open(&load_path))
            .await
            .map_err(|e| CameraError::Unavailable(format!("frame loader panicked: {}", e)))?;

        let frame = match decoded {
            Ok(img) => Some(img.to_luma8()),
            Err(e) if !is_settled(modified) => {
                debug!(path = %path.display(), "Frame not readable yet: {}", e);
                return Ok(None);
            }
            Err(e) => {
                debug!(path = %path.display(), "Skipping unreadable frame: {}", e);
                None
            }
        };

        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(path = %path.display(), "Could not remove frame: {}", e);
        }
        Ok(frame)
    }

    fn stop(&mut self) -> Result<(), CameraError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        remove_lock(&self.lock)
    }
}

impl Drop for FrameDirStream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Failed to release frame directory lock: {}", e);
        }
    }
}

#[async_trait]
impl CameraBackend for FrameDirCamera {
    fn name(&self) -> &'static str {
        "frames_dir"
    }

    async fn open(&self) -> Result<Box<dyn CaptureStream>, CameraError> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CameraError::Unavailable(format!(
                    "{} is not a directory",
                    self.dir.display()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CameraError::Unavailable(format!(
                    "frame directory {} not found",
                    self.dir.display()
                )))
            }
            Err(e) => return Err(CameraError::from_io(e)),
        }

        let lock = self.lock_path();
        tokio::fs::write(&lock, b"")
            .await
            .map_err(CameraError::from_io)?;

        debug!(dir = %self.dir.display(), "Frame directory stream opened");
        Ok(Box::new(FrameDirStream {
            dir: self.dir.clone(),
            lock,
            stopped: false,
        }))
    }

    async fn device_in_use(&self) -> bool {
        tokio::fs::try_exists(self.lock_path()).await.unwrap_or(false)
    }

    async fn release_hint(&self) -> Result<(), CameraError> {
        remove_lock(&self.lock_path())
    }
}

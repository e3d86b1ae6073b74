//! Camera resource management (backends, manager, scoped stream guard)

pub mod backend;
pub mod frames_dir;
pub mod manager;
pub mod memory;

pub use backend::{CameraBackend, CameraError, CaptureStream, Frame};
pub use frames_dir::FrameDirCamera;
pub use manager::{CameraManager, StreamGuard};
pub use memory::MemoryCamera;

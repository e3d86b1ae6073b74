//! SSE wire protocol events for the check-in bridge.
//!
//! `CheckinEvent` is the subset of the bridge's internal bus traffic that a
//! front end needs: scan lifecycle, camera housekeeping, the booking shown in
//! the detail view, and toast notifications.

use serde::{Deserialize, Serialize};

use crate::records::Booking;
use crate::status::{EntityKind, Status};

/// Severity of a toast notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    Warning,
}

/// The title/type/message triple every user-visible outcome maps to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: NotificationKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: NotificationKind::Warning,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Why a scan session ended without a decoded payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanEndReason {
    Cancelled,
    Superseded,
    Failed { error: String },
}

/// Events that cross the wire via SSE.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CheckinEvent {
    // =========================================================================
    // Scan Lifecycle Events
    // =========================================================================
    /// A scan session started and is requesting the camera
    ScanStarted { generation: u64 },

    /// The camera is streaming and frames are being decoded
    ScanRunning { generation: u64 },

    /// A payload was decoded; the camera is already released
    ScanDecoded { generation: u64, code: String },

    /// The session ended without a payload
    ScanEnded {
        generation: u64,
        reason: ScanEndReason,
    },

    // =========================================================================
    // Camera Events
    // =========================================================================
    /// All known streams were stopped
    CameraReleased { streams: usize },

    /// The watchdog found a camera active while no scan was running
    CameraLeakDetected,

    // =========================================================================
    // Detail View Events
    // =========================================================================
    /// A booking is now shown in the detail view
    BookingShown { booking: Booking },

    /// The detail view was cleared
    BookingCleared,

    /// A status change was accepted by the backend
    StatusChanged {
        kind: EntityKind,
        id: u64,
        from: Status,
        to: Status,
    },

    // =========================================================================
    // Notifications
    // =========================================================================
    /// Toast for the user
    Notify(Notification),
}

impl CheckinEvent {
    /// Get the event type as a string (for logging/filtering)
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ScanStarted { .. } => "scan_started",
            Self::ScanRunning { .. } => "scan_running",
            Self::ScanDecoded { .. } => "scan_decoded",
            Self::ScanEnded { .. } => "scan_ended",
            Self::CameraReleased { .. } => "camera_released",
            Self::CameraLeakDetected => "camera_leak_detected",
            Self::BookingShown { .. } => "booking_shown",
            Self::BookingCleared => "booking_cleared",
            Self::StatusChanged { .. } => "status_changed",
            Self::Notify(_) => "notify",
        }
    }

    /// Check if this is a scan lifecycle event
    pub fn is_scan_event(&self) -> bool {
        matches!(
            self,
            Self::ScanStarted { .. }
                | Self::ScanRunning { .. }
                | Self::ScanDecoded { .. }
                | Self::ScanEnded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_serializes_as_toast_triple() {
        let toast = Notification::error("Gagal", "Pemesanan kamar tidak ditemukan");
        let json = serde_json::to_value(&toast).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["title"], "Gagal");
        assert_eq!(json["message"], "Pemesanan kamar tidak ditemukan");
    }

    #[test]
    fn test_scan_ended_serialization() {
        let event = CheckinEvent::ScanEnded {
            generation: 4,
            reason: ScanEndReason::Failed {
                error: "permission denied".to_string(),
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ScanEnded"));
        assert!(json.contains("permission denied"));

        let deserialized: CheckinEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
        assert!(deserialized.is_scan_event());
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(CheckinEvent::CameraLeakDetected.event_type(), "camera_leak_detected");
        assert!(!CheckinEvent::BookingCleared.is_scan_event());
    }
}

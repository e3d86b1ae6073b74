//! Booking lookup by scanned or typed code
//!
//! The code prefix decides which backend lookup runs: `RM-`/`KMR-` for room
//! bookings, `FS-`/`FSL-` for facility bookings. Lookups never fail outward;
//! every result is a [`LookupOutcome`] and also goes out as a notification.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{ApiError, BookingService};
use crate::bus::{Notification, SharedBus};
use resort_wire::Booking;

pub const INVALID_FORMAT: &str = "Kode QR tidak valid. Format yang didukung: RM-xxx atau FS-xxx";
pub const EMPTY_CODE: &str = "Kode QR tidak boleh kosong";
pub const LOOKUP_FAILED: &str = "Terjadi kesalahan saat memproses kode QR";

const ROOM_PREFIXES: [&str; 2] = ["RM-", "KMR-"];
const FACILITY_PREFIXES: [&str; 2] = ["FS-", "FSL-"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    Room,
    Facility,
}

impl CodeKind {
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Self::Room => "Pemesanan kamar tidak ditemukan",
            Self::Facility => "Pemesanan fasilitas tidak ditemukan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{}", EMPTY_CODE)]
    Empty,

    #[error("{}", INVALID_FORMAT)]
    UnsupportedFormat(String),
}

/// Classify a code by prefix. Matching is case-sensitive on the trimmed
/// input, so `rm-1` is rejected like any other unknown format.
pub fn classify_code(raw: &str) -> Result<(CodeKind, &str), LookupError> {
    let code = raw.trim();
    if code.is_empty() {
        return Err(LookupError::Empty);
    }
    if ROOM_PREFIXES.iter().any(|p| code.starts_with(p)) {
        Ok((CodeKind::Room, code))
    } else if FACILITY_PREFIXES.iter().any(|p| code.starts_with(p)) {
        Ok((CodeKind::Facility, code))
    } else {
        Err(LookupError::UnsupportedFormat(code.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found { booking: Booking },
    NotFound { kind: CodeKind, message: String },
    Invalid { message: String },
    Failed { message: String },
}

impl LookupOutcome {
    pub fn booking(&self) -> Option<&Booking> {
        match self {
            Self::Found { booking } => Some(booking),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Found { .. } => None,
            Self::NotFound { message, .. } | Self::Invalid { message } | Self::Failed { message } => {
                Some(message.as_str())
            }
        }
    }

    fn notification(&self) -> Notification {
        match self {
            Self::Found { booking } => Notification::success(
                "Berhasil",
                format!("Pemesanan {} ditemukan", booking.code()),
            ),
            Self::NotFound { message, .. } => Notification::error("Tidak ditemukan", message.clone()),
            Self::Invalid { message } => Notification::warning("Kode tidak valid", message.clone()),
            Self::Failed { message } => Notification::error("Error", message.clone()),
        }
    }
}

pub struct BookingLookup {
    service: Arc<dyn BookingService>,
    bus: SharedBus,
}

impl BookingLookup {
    pub fn new(service: Arc<dyn BookingService>, bus: SharedBus) -> Self {
        Self { service, bus }
    }

    pub async fn lookup(&self, raw: &str) -> LookupOutcome {
        let outcome = self.resolve(raw).await;
        self.bus.notify(outcome.notification());
        outcome
    }

    async fn resolve(&self, raw: &str) -> LookupOutcome {
        let (kind, code) = match classify_code(raw) {
            Ok(classified) => classified,
            Err(e) => {
                info!(code = raw.trim(), "Rejected booking code: {}", e);
                return LookupOutcome::Invalid {
                    message: e.to_string(),
                };
            }
        };

        let result = match kind {
            CodeKind::Room => self.service.room_booking_by_code(code).await.map(Booking::Room),
            CodeKind::Facility => self
                .service
                .facility_booking_by_code(code)
                .await
                .map(Booking::Facility),
        };

        match result {
            Ok(booking) => {
                info!(code, id = booking.id(), status = %booking.status(), "Booking found");
                LookupOutcome::Found { booking }
            }
            Err(ApiError::NotFound(_)) => {
                info!(code, ?kind, "Booking not found");
                LookupOutcome::NotFound {
                    kind,
                    message: kind.not_found_message().to_string(),
                }
            }
            Err(e) => {
                warn!(code, "Booking lookup failed: {}", e);
                let message = match e.server_message() {
                    Some(detail) => format!("{}: {}", LOOKUP_FAILED, detail),
                    None => LOOKUP_FAILED.to_string(),
                };
                LookupOutcome::Failed { message }
            }
        }
    }
}

//! Shared wire types for the Resort Terminal 12 check-in bridge.
//!
//! This crate defines the types that cross boundaries between:
//! - the admin REST backend (envelopes and booking/order/payment records)
//! - the check-in bridge (status vocabulary, entity kinds)
//! - the front end listening on the bridge's SSE stream (events, notifications)
//!
//! # Modules
//! - [`status`] - Status vocabulary, payment states and entity kinds
//! - [`records`] - Booking, order and payment records as the backend sends them
//! - [`envelope`] - The `{status, data, message}` response envelope
//! - [`events`] - SSE wire protocol events (CheckinEvent, Notification)

pub mod envelope;
pub mod events;
pub mod records;
pub mod status;

// Re-export commonly used types at crate root
pub use envelope::{Envelope, Outcome};
pub use events::{CheckinEvent, Notification, NotificationKind, ScanEndReason};
pub use records::{
    Booking, Customer, Facility, FacilityBooking, Order, Payment, Room, RoomBooking, RoomType,
};
pub use status::{EntityKind, PaymentMethod, PaymentStatus, Status};

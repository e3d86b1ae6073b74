//! CheckInDesk - the scan / lookup / status-change workflow
//!
//! Owns the one booking currently shown in the detail view and the in-flight
//! flag that blocks duplicate submissions while a backend call is pending.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{ApiError, BookingService};
use crate::bus::{BusEvent, Notification, SharedBus};
use crate::lookup::{BookingLookup, LookupOutcome};
use crate::scanner::{ScanOutcome, ScanStatus, Scanner};
use crate::transitions::{
    allowed_transitions, validate_payment_change, validate_transition, TransitionError,
};
use resort_wire::{Booking, EntityKind, Order, Payment, PaymentMethod, PaymentStatus, Status};

pub const SCAN_FAILED: &str = "Terjadi kesalahan saat memindai QR code";
pub const STATUS_CHANGED: &str = "Status pemesanan berhasil diubah";
pub const STATUS_REJECTED: &str = "Gagal mengubah status pemesanan";
pub const STATUS_ERROR: &str = "Terjadi kesalahan saat mengubah status pemesanan";
pub const NO_BOOKING: &str = "Belum ada pemesanan yang ditampilkan";
pub const REQUEST_PENDING: &str = "Permintaan sebelumnya masih diproses";
pub const ALREADY_PAID: &str = "Pemesanan sudah dibayar";
pub const PAYMENT_ROOM_ONLY: &str = "Pembayaran hanya tersedia untuk pemesanan kamar";

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("no booking is shown")]
    NoBooking,

    #[error("another request is still in progress")]
    Busy,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("booking is already paid")]
    AlreadyPaid,

    #[error("payment processing is only available for room bookings")]
    PaymentNotSupported,
}

impl DeskError {
    /// Toast shown when an action ends with this error
    pub fn notification(&self) -> Notification {
        match self {
            Self::NoBooking => Notification::warning("Pemesanan", NO_BOOKING),
            Self::Busy => Notification::warning("Mohon tunggu", REQUEST_PENDING),
            Self::Transition(e) => Notification::warning("Status tidak valid", e.to_string()),
            Self::Api(e) => Notification::error("Error", e.user_message()),
            Self::AlreadyPaid => Notification::warning("Pembayaran", ALREADY_PAID),
            Self::PaymentNotSupported => Notification::warning("Pembayaran", PAYMENT_ROOM_ONLY),
        }
    }
}

/// Detail view as the front end renders it
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeskView {
    pub booking: Option<Booking>,
    pub last_error: Option<String>,
    pub busy: bool,
}

/// One allowed next status with its button label
#[derive(Debug, Clone, Serialize)]
pub struct StatusAction {
    pub status: Status,
    pub label: &'static str,
}

/// Clears the in-flight flag when the request finishes, however it finishes
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, DeskError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self(flag))
            .map_err(|_| DeskError::Busy)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct ViewState {
    booking: Option<Booking>,
    last_error: Option<String>,
}

pub struct CheckInDesk {
    scanner: Arc<Scanner>,
    lookup: BookingLookup,
    service: Arc<dyn BookingService>,
    bus: SharedBus,
    view: RwLock<ViewState>,
    busy: AtomicBool,
}

impl CheckInDesk {
    pub fn new(scanner: Arc<Scanner>, service: Arc<dyn BookingService>, bus: SharedBus) -> Self {
        Self {
            scanner,
            lookup: BookingLookup::new(service.clone(), bus.clone()),
            service,
            bus,
            view: RwLock::new(ViewState::default()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn scanner(&self) -> &Arc<Scanner> {
        &self.scanner
    }

    pub fn scan_status(&self) -> ScanStatus {
        self.scanner.status()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn view(&self) -> DeskView {
        let view = self.view.read().await;
        DeskView {
            booking: view.booking.clone(),
            last_error: view.last_error.clone(),
            busy: self.is_busy(),
        }
    }

    pub async fn current_booking(&self) -> Option<Booking> {
        self.view.read().await.booking.clone()
    }

    /// Next statuses for the shown booking, in table order
    pub async fn allowed_actions(&self) -> Vec<StatusAction> {
        match self.current_booking().await {
            Some(booking) => allowed_transitions(booking.kind(), booking.status())
                .iter()
                .map(|status| StatusAction {
                    status: status.clone(),
                    label: status.action_label(),
                })
                .collect(),
            None => Vec::new(),
        }
    }

    async fn clear_view(&self) {
        let mut view = self.view.write().await;
        let had_booking = view.booking.take().is_some();
        view.last_error = None;
        if had_booking {
            self.bus.publish(BusEvent::BookingCleared);
        }
    }

    async fn show(&self, booking: Booking) {
        self.view.write().await.booking = Some(booking.clone());
        self.bus.publish(BusEvent::BookingShown { booking });
    }

    async fn set_error(&self, message: impl Into<String>) {
        self.view.write().await.last_error = Some(message.into());
    }

    /// Start scanning. The decoded code, if any, is looked up in the
    /// background; watch the bus for the result. Returns the session's
    /// generation.
    pub async fn start_scan(self: &Arc<Self>) -> u64 {
        self.clear_view().await;
        self.bus
            .notify(Notification::info("Scan QR", "Memulai kamera..."));

        let handle = self.scanner.start().await;
        let generation = handle.generation;

        let desk = self.clone();
        tokio::spawn(async move {
            let outcome = handle.outcome().await;
            desk.on_scan_outcome(generation, outcome).await;
        });

        generation
    }

    async fn on_scan_outcome(&self, generation: u64, outcome: ScanOutcome) {
        if generation != self.scanner.current_generation() {
            debug!(generation, "Dropping outcome of superseded scan");
            return;
        }

        match outcome {
            ScanOutcome::Decoded(code) => {
                if let Err(e) = self.submit_code(&code).await {
                    warn!(code = %code, "Scanned code not processed: {}", e);
                    self.set_error(e.to_string()).await;
                }
            }
            ScanOutcome::Failed(error) => {
                warn!(generation, %error, "Scan failed");
                self.set_error(SCAN_FAILED).await;
                self.bus.notify(Notification::error("Error", SCAN_FAILED));
            }
            ScanOutcome::Cancelled | ScanOutcome::Superseded => {}
        }
    }

    /// Stop scanning. Safe to call at any time.
    pub async fn cancel_scan(&self) -> bool {
        let cancelled = self.scanner.cancel().await;
        if cancelled {
            self.bus
                .notify(Notification::info("Scan QR", "Pemindaian dibatalkan"));
        }
        cancelled
    }

    /// Look up a scanned or typed booking code and show the result
    pub async fn submit_code(&self, raw: &str) -> Result<LookupOutcome, DeskError> {
        let result = self.lookup_code(raw).await;
        self.report(result)
    }

    async fn lookup_code(&self, raw: &str) -> Result<LookupOutcome, DeskError> {
        let _in_flight = InFlight::acquire(&self.busy)?;
        self.clear_view().await;

        let outcome = self.lookup.lookup(raw).await;
        match &outcome {
            LookupOutcome::Found { booking } => self.show(booking.clone()).await,
            other => {
                if let Some(message) = other.message() {
                    self.set_error(message).await;
                }
            }
        }
        Ok(outcome)
    }

    /// Publish the error toast for a failed action
    fn report<T>(&self, result: Result<T, DeskError>) -> Result<T, DeskError> {
        if let Err(e) = &result {
            self.bus.notify(e.notification());
        }
        result
    }

    /// Move the shown booking to `target`
    pub async fn change_status(&self, target: Status) -> Result<Booking, DeskError> {
        let result = self.apply_status(target).await;
        if let Err(e) = &result {
            let notification = match e {
                DeskError::Api(api) => {
                    let message = status_change_message(api);
                    self.set_error(message).await;
                    Notification::error("Error", message)
                }
                other => other.notification(),
            };
            self.bus.notify(notification);
        }
        result
    }

    async fn apply_status(&self, target: Status) -> Result<Booking, DeskError> {
        let booking = self.current_booking().await.ok_or(DeskError::NoBooking)?;
        let kind = booking.kind();
        let from = booking.status().clone();
        validate_transition(kind, &from, &target)?;

        let _in_flight = InFlight::acquire(&self.busy)?;
        info!(%kind, id = booking.id(), %from, to = %target, "Changing booking status");

        let result = match &booking {
            Booking::Room(b) => {
                self.service
                    .update_room_booking_status(b.id, target.clone())
                    .await
            }
            Booking::Facility(b) => {
                self.service
                    .change_facility_booking_status(b.id, target.clone())
                    .await
            }
        };
        if let Err(e) = result {
            warn!(id = booking.id(), "Status change failed: {}", e);
            return Err(e.into());
        }

        let fallback = target.clone();
        let updated = self.refresh(&booking, |b| set_status(b, fallback)).await;
        self.bus.publish(BusEvent::StatusChanged {
            kind,
            id: booking.id(),
            from,
            to: target,
        });
        self.bus
            .notify(Notification::success("Berhasil", STATUS_CHANGED));
        Ok(updated)
    }

    /// Settle an unpaid room booking
    pub async fn process_payment(&self, method: PaymentMethod) -> Result<Booking, DeskError> {
        let result = self.settle_room(method).await;
        self.report(result)
    }

    async fn settle_room(&self, method: PaymentMethod) -> Result<Booking, DeskError> {
        let booking = self.current_booking().await.ok_or(DeskError::NoBooking)?;
        if booking.kind() != EntityKind::RoomBooking {
            return Err(DeskError::PaymentNotSupported);
        }
        if booking.payment_status() != PaymentStatus::BelumDibayar {
            return Err(DeskError::AlreadyPaid);
        }

        let _in_flight = InFlight::acquire(&self.busy)?;
        info!(id = booking.id(), %method, "Processing room payment");

        if let Err(e) = self.service.process_room_payment(booking.id(), method).await {
            warn!(id = booking.id(), "Payment processing failed: {}", e);
            return Err(e.into());
        }

        let updated = self
            .refresh(&booking, |b| {
                if let Booking::Room(room) = b {
                    room.status_pembayaran = PaymentStatus::Dibayar;
                }
            })
            .await;
        self.bus.notify(Notification::success(
            "Berhasil",
            "Pembayaran berhasil diproses",
        ));
        Ok(updated)
    }

    /// Re-fetch the booking by code after a change. If the refresh fails the
    /// local copy is patched with `fallback` instead.
    async fn refresh(&self, booking: &Booking, fallback: impl FnOnce(&mut Booking)) -> Booking {
        let fetched = match booking {
            Booking::Room(b) => self
                .service
                .room_booking_by_code(&b.kode_pemesanan)
                .await
                .map(Booking::Room),
            Booking::Facility(b) => self
                .service
                .facility_booking_by_code(&b.kode_pemesanan)
                .await
                .map(Booking::Facility),
        };

        let updated = match fetched {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(code = booking.code(), "Refresh after update failed: {}", e);
                let mut patched = booking.clone();
                fallback(&mut patched);
                patched
            }
        };
        self.show(updated.clone()).await;
        updated
    }

    pub async fn change_order_status(&self, id: u64, target: Status) -> Result<Order, DeskError> {
        let result = self.apply_order_status(id, target).await;
        self.report(result)
    }

    async fn apply_order_status(&self, id: u64, target: Status) -> Result<Order, DeskError> {
        let _in_flight = InFlight::acquire(&self.busy)?;

        let mut order = self.service.order(id).await?;
        let from = order.status.clone();
        validate_transition(EntityKind::Order, &from, &target)?;

        info!(id, %from, to = %target, "Changing order status");
        self.service.update_order_status(id, target.clone()).await?;

        order.status = target.clone();
        self.bus.publish(BusEvent::StatusChanged {
            kind: EntityKind::Order,
            id,
            from,
            to: target,
        });
        self.bus.notify(Notification::success(
            "Berhasil",
            "Status pesanan berhasil diubah",
        ));
        Ok(order)
    }

    pub async fn change_payment_status(
        &self,
        id: u64,
        target: Status,
    ) -> Result<Payment, DeskError> {
        let result = self.apply_payment_status(id, target).await;
        self.report(result)
    }

    async fn apply_payment_status(&self, id: u64, target: Status) -> Result<Payment, DeskError> {
        let _in_flight = InFlight::acquire(&self.busy)?;

        let mut payment = self.service.payment(id).await?;
        let from = payment.status.clone();
        validate_payment_change(&payment, &target)?;

        info!(id, %from, to = %target, "Changing payment status");
        self.service.update_payment_status(id, target.clone()).await?;

        payment.status = target.clone();
        self.bus.publish(BusEvent::StatusChanged {
            kind: EntityKind::Payment,
            id,
            from,
            to: target,
        });
        self.bus.notify(Notification::success(
            "Berhasil",
            "Status pembayaran berhasil diubah",
        ));
        Ok(payment)
    }
}

/// Booking status changes report transport trouble apart from refusals
fn status_change_message(err: &ApiError) -> &'static str {
    match err {
        ApiError::Transport(_) | ApiError::Decode(_) => STATUS_ERROR,
        _ => STATUS_REJECTED,
    }
}

fn set_status(booking: &mut Booking, status: Status) {
    match booking {
        Booking::Room(b) => b.status = status,
        Booking::Facility(b) => b.status = status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_blocks_second_request() {
        let flag = AtomicBool::new(false);

        let first = InFlight::acquire(&flag).unwrap();
        assert!(matches!(InFlight::acquire(&flag), Err(DeskError::Busy)));

        drop(first);
        assert!(InFlight::acquire(&flag).is_ok());
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_every_error_has_a_toast() {
        let busy = DeskError::Busy.notification();
        assert_eq!(busy.message, REQUEST_PENDING);
        assert!(!busy.is_error());

        let api = DeskError::Api(ApiError::Rejected("Pesanan sudah selesai".to_string()));
        let toast = api.notification();
        assert!(toast.is_error());
        assert_eq!(toast.message, "Pesanan sudah selesai");

        let locked = DeskError::Transition(TransitionError::ManualChangeForbidden(
            PaymentMethod::Midtrans,
        ));
        assert_eq!(locked.notification().title, "Status tidak valid");
    }

    #[test]
    fn test_status_change_message_separates_refusals() {
        assert_eq!(
            status_change_message(&ApiError::Rejected(String::new())),
            STATUS_REJECTED
        );
        assert_eq!(
            status_change_message(&ApiError::Decode("bad json".to_string())),
            STATUS_ERROR
        );
    }
}

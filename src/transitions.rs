//! Status transition guard
//!
//! One declarative table per entity kind. Every status change made from the
//! desk is checked here first; the backend re-validates on its side.

use thiserror::Error;

use resort_wire::{EntityKind, Payment, PaymentMethod, Status};

use Status::*;

type Table = &'static [(Status, &'static [Status])];

const ROOM_BOOKING: Table = &[
    (Menunggu, &[Dikonfirmasi, Dibatalkan]),
    (Dikonfirmasi, &[CheckIn, Dibatalkan]),
    (CheckIn, &[CheckOut]),
    (CheckOut, &[]),
    (Dibatalkan, &[]),
];

const FACILITY_BOOKING: Table = &[
    (Menunggu, &[Dikonfirmasi, Dibatalkan]),
    (Dikonfirmasi, &[Digunakan, Dibatalkan]),
    (Digunakan, &[Dibatalkan]),
    (Dibatalkan, &[]),
];

const ORDER: Table = &[
    (Menunggu, &[Diproses, Dibatalkan]),
    (Diproses, &[Selesai, Dibatalkan]),
    (Selesai, &[]),
    (Dibatalkan, &[]),
];

// Any open payment may move to any other payment status; settled is final.
const PAYMENT: Table = &[
    (Menunggu, &[Selesai, Gagal, Dikembalikan]),
    (Selesai, &[]),
    (Gagal, &[Menunggu, Selesai, Dikembalikan]),
    (Dikembalikan, &[Menunggu, Selesai, Gagal]),
];

fn table(kind: EntityKind) -> Table {
    match kind {
        EntityKind::RoomBooking => ROOM_BOOKING,
        EntityKind::FacilityBooking => FACILITY_BOOKING,
        EntityKind::Order => ORDER,
        EntityKind::Payment => PAYMENT,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("status is already {0}")]
    Unchanged(Status),

    #[error("{status} is not a valid {kind} status")]
    UnknownStatus { kind: EntityKind, status: Status },

    #[error("cannot change {kind} from {from} to {to}")]
    NotAllowed {
        kind: EntityKind,
        from: Status,
        to: Status,
        allowed: Vec<Status>,
    },

    #[error("{0} payments cannot be changed manually")]
    ManualChangeForbidden(PaymentMethod),
}

/// Ordered next statuses for `current`. Empty for terminal and unknown
/// statuses.
pub fn allowed_transitions(kind: EntityKind, current: &Status) -> &'static [Status] {
    table(kind)
        .iter()
        .find(|(status, _)| status == current)
        .map(|(_, next)| *next)
        .unwrap_or(&[])
}

/// Every status the kind can be in
pub fn vocabulary(kind: EntityKind) -> impl Iterator<Item = &'static Status> {
    table(kind).iter().map(|(status, _)| status)
}

pub fn is_terminal(kind: EntityKind, status: &Status) -> bool {
    allowed_transitions(kind, status).is_empty()
}

pub fn validate_transition(
    kind: EntityKind,
    from: &Status,
    to: &Status,
) -> Result<(), TransitionError> {
    for status in [from, to] {
        if !vocabulary(kind).any(|s| s == status) {
            return Err(TransitionError::UnknownStatus {
                kind,
                status: status.clone(),
            });
        }
    }
    if from == to {
        return Err(TransitionError::Unchanged(from.clone()));
    }

    let allowed = allowed_transitions(kind, from);
    if allowed.contains(to) {
        Ok(())
    } else {
        Err(TransitionError::NotAllowed {
            kind,
            from: from.clone(),
            to: to.clone(),
            allowed: allowed.to_vec(),
        })
    }
}

/// Gateway payments are settled by the gateway callback only.
pub fn validate_payment_change(payment: &Payment, to: &Status) -> Result<(), TransitionError> {
    if payment.metode_pembayaran == PaymentMethod::Midtrans {
        return Err(TransitionError::ManualChangeForbidden(
            payment.metode_pembayaran,
        ));
    }
    validate_transition(EntityKind::Payment, &payment.status, to)
}

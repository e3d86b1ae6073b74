//! Admin backend access
//!
//! [`BookingService`] is the seam the desk talks to. [`ResortClient`] is the
//! REST implementation; tests substitute in-memory fakes.

pub mod client;

pub use client::ResortClient;

use async_trait::async_trait;
use thiserror::Error;

use resort_wire::{FacilityBooking, Order, Payment, PaymentMethod, RoomBooking, Status};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// 2xx response whose envelope reports a failure
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend URL: {0}")]
    InvalidBaseUrl(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Message the backend sent along with the failure, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::NotFound(m) | Self::Unauthorized(m) | Self::Rejected(m) => Some(m.as_str()),
            Self::Server { message, .. } => Some(message.as_str()),
            _ => None,
        }
        .filter(|m| !m.is_empty())
    }

    /// Text for a toast: the backend's own message when it sent one
    pub fn user_message(&self) -> String {
        match self.server_message() {
            Some(m) => m.to_string(),
            None => self.to_string(),
        }
    }
}

#[async_trait]
pub trait BookingService: Send + Sync {
    async fn room_booking_by_code(&self, code: &str) -> Result<RoomBooking, ApiError>;

    async fn facility_booking_by_code(&self, code: &str) -> Result<FacilityBooking, ApiError>;

    async fn update_room_booking_status(&self, id: u64, status: Status) -> Result<(), ApiError>;

    async fn change_facility_booking_status(
        &self,
        id: u64,
        status: Status,
    ) -> Result<(), ApiError>;

    async fn process_room_payment(&self, id: u64, method: PaymentMethod) -> Result<(), ApiError>;

    async fn order(&self, id: u64) -> Result<Order, ApiError>;

    async fn update_order_status(&self, id: u64, status: Status) -> Result<(), ApiError>;

    async fn payment(&self, id: u64) -> Result<Payment, ApiError>;

    async fn update_payment_status(&self, id: u64, status: Status) -> Result<(), ApiError>;
}

//! HTTP API handlers
//!
//! Thin JSON layer over the [`CheckInDesk`]. Toasts and scan progress are
//! pushed to the front end over `GET /events`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::debug;

use crate::backend::ApiError;
use crate::bus::SharedBus;
use crate::camera::CameraManager;
use crate::desk::{CheckInDesk, DeskError, DeskView, StatusAction};
use crate::lookup::LookupOutcome;
use crate::scanner::ScanStatus;
use crate::transitions::allowed_transitions;
use resort_wire::{Booking, EntityKind, Order, Payment, PaymentMethod, Status};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub desk: Arc<CheckInDesk>,
    pub camera: Arc<CameraManager>,
    pub bus: SharedBus,
    pub started: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(desk: Arc<CheckInDesk>, bus: SharedBus) -> Self {
        Self {
            camera: desk.scanner().camera().clone(),
            desk,
            bus,
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/scan", get(scan_status_handler))
        .route("/scan/start", post(scan_start_handler))
        .route("/scan/cancel", post(scan_cancel_handler))
        .route("/lookup", post(lookup_handler))
        .route("/booking", get(booking_handler))
        .route("/booking/actions", get(booking_actions_handler))
        .route("/booking/status", post(booking_status_handler))
        .route("/booking/payment", post(booking_payment_handler))
        .route("/orders/{id}/status", post(order_status_handler))
        .route("/payments/{id}/status", post(payment_status_handler))
        .route("/transitions/{kind}/{status}", get(transitions_handler))
        .route("/events", get(events_handler))
        .with_state(state)
}

/// Error body: `{"error": "..."}`
pub struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<DeskError> for AppError {
    fn from(err: DeskError) -> Self {
        let status = match &err {
            DeskError::NoBooking | DeskError::Api(ApiError::NotFound(_)) => StatusCode::NOT_FOUND,
            DeskError::Busy => StatusCode::CONFLICT,
            DeskError::Api(_) => StatusCode::BAD_GATEWAY,
            DeskError::Transition(_)
            | DeskError::AlreadyPaid
            | DeskError::PaymentNotSupported => StatusCode::BAD_REQUEST,
        };
        let message = match &err {
            DeskError::Api(api) => api.user_message(),
            other => other.to_string(),
        };
        Self(status, message)
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, message.into())
}

/// General status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub started_at: DateTime<Utc>,
    pub camera_backend: &'static str,
    pub camera_active: bool,
    pub active_streams: usize,
    pub scan: ScanStatus,
    pub busy: bool,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "resort-checkin",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        started_at: state.started_at,
        camera_backend: state.camera.backend_name(),
        camera_active: state.camera.is_camera_active().await,
        active_streams: state.camera.active_streams(),
        scan: state.desk.scan_status(),
        busy: state.desk.is_busy(),
    })
}

/// GET /scan - Current scan session
pub async fn scan_status_handler(State(state): State<AppState>) -> Json<ScanStatus> {
    Json(state.desk.scan_status())
}

#[derive(Serialize)]
pub struct ScanStarted {
    pub generation: u64,
}

/// POST /scan/start - Start (or restart) scanning
pub async fn scan_start_handler(State(state): State<AppState>) -> Json<ScanStarted> {
    let generation = state.desk.start_scan().await;
    Json(ScanStarted { generation })
}

#[derive(Serialize)]
pub struct ScanCancelled {
    pub cancelled: bool,
}

/// POST /scan/cancel - Stop scanning; idempotent
pub async fn scan_cancel_handler(State(state): State<AppState>) -> Json<ScanCancelled> {
    let cancelled = state.desk.cancel_scan().await;
    Json(ScanCancelled { cancelled })
}

#[derive(Deserialize)]
pub struct LookupRequest {
    pub code: String,
}

/// POST /lookup - Manual code entry
pub async fn lookup_handler(
    State(state): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<LookupOutcome>, AppError> {
    Ok(Json(state.desk.submit_code(&req.code).await?))
}

/// GET /booking - Detail view
pub async fn booking_handler(State(state): State<AppState>) -> Json<DeskView> {
    Json(state.desk.view().await)
}

/// GET /booking/actions - Allowed next statuses for the shown booking
pub async fn booking_actions_handler(State(state): State<AppState>) -> Json<Vec<StatusAction>> {
    Json(state.desk.allowed_actions().await)
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    fn target(&self) -> Result<Status, AppError> {
        match Status::from(self.status.as_str()) {
            Status::Unknown(raw) => Err(bad_request(format!("unknown status: {}", raw))),
            status => Ok(status),
        }
    }
}

/// POST /booking/status - Change the shown booking's status
pub async fn booking_status_handler(
    State(state): State<AppState>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Booking>, AppError> {
    let target = req.target()?;
    Ok(Json(state.desk.change_status(target).await?))
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub metode_pembayaran: String,
}

/// POST /booking/payment - Settle the shown room booking
pub async fn booking_payment_handler(
    State(state): State<AppState>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<Booking>, AppError> {
    let method: PaymentMethod = req.metode_pembayaran.parse().map_err(bad_request)?;
    Ok(Json(state.desk.process_payment(method).await?))
}

/// POST /orders/{id}/status
pub async fn order_status_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Order>, AppError> {
    let target = req.target()?;
    Ok(Json(state.desk.change_order_status(id, target).await?))
}

/// POST /payments/{id}/status
pub async fn payment_status_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Payment>, AppError> {
    let target = req.target()?;
    Ok(Json(state.desk.change_payment_status(id, target).await?))
}

#[derive(Serialize)]
pub struct TransitionsResponse {
    pub kind: EntityKind,
    pub status: Status,
    pub allowed: Vec<StatusAction>,
}

/// GET /transitions/{kind}/{status} - Query the transition table
pub async fn transitions_handler(
    Path((kind, status)): Path<(String, String)>,
) -> Result<Json<TransitionsResponse>, AppError> {
    let kind: EntityKind = kind.parse().map_err(bad_request)?;
    let status = Status::from(status.as_str());
    let allowed = allowed_transitions(kind, &status)
        .iter()
        .map(|s| StatusAction {
            status: s.clone(),
            label: s.action_label(),
        })
        .collect();
    Ok(Json(TransitionsResponse {
        kind,
        status,
        allowed,
    }))
}

/// GET /events - Server-Sent Events stream of bus events
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.bus.subscribe()).filter_map(|msg| match msg {
        Ok(event) => match Event::default().event(event.event_type()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                debug!("Failed to encode SSE event: {}", e);
                None
            }
        },
        // Lagged subscriber; skip ahead
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

//! REST client for the admin backend
//!
//! Every response is a `{status, data, message, error}` envelope. HTTP status
//! is checked first (404 / 401 / other failures), then the envelope itself.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{ApiError, BookingService};
use resort_wire::{
    Envelope, FacilityBooking, Order, Payment, PaymentMethod, RoomBooking, Status,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message the backend uses when a code lookup comes back empty
const MISSING_BOOKING: &str = "Data pemesanan tidak ditemukan";

#[derive(Clone)]
pub struct ResortClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ResortClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidBaseUrl(format!(
                "unsupported scheme {}",
                base_url.scheme()
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.url(path)?;
        debug!(%method, %url, "Backend request");

        let mut request = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Envelope<T>, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = error_message(response).await;
            warn!(status = status.as_u16(), %message, "Backend request failed");
            return Err(match status {
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
                _ => ApiError::Server {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        if !envelope.is_success() {
            return Err(ApiError::Rejected(
                envelope.best_message().unwrap_or_default(),
            ));
        }
        Ok(envelope)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, missing: &str) -> Result<T, ApiError> {
        let envelope = self.send::<T>(self.request(Method::GET, path)?).await?;
        envelope
            .data
            .ok_or_else(|| ApiError::NotFound(missing.to_string()))
    }

    async fn command(&self, method: Method, path: &str, body: Value) -> Result<(), ApiError> {
        let request = self.request(method, path)?.json(&body);
        self.send::<Value>(request).await.map(|_| ())
    }
}

/// Pull a message out of an error body; fall back to the status line.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<Envelope<Value>>(&text)
        .ok()
        .and_then(|e| e.best_message())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

fn code_segment(code: &str) -> String {
    urlencoding::encode(code.trim()).into_owned()
}

#[async_trait]
impl BookingService for ResortClient {
    async fn room_booking_by_code(&self, code: &str) -> Result<RoomBooking, ApiError> {
        self.fetch(
            &format!("pemesanan-kamar/code/{}", code_segment(code)),
            MISSING_BOOKING,
        )
        .await
    }

    async fn facility_booking_by_code(&self, code: &str) -> Result<FacilityBooking, ApiError> {
        self.fetch(
            &format!("pemesanan-fasilitas/code/{}", code_segment(code)),
            MISSING_BOOKING,
        )
        .await
    }

    async fn update_room_booking_status(&self, id: u64, status: Status) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!("pemesanan-kamar/{}/update-status", id),
            json!({ "status": status }),
        )
        .await
    }

    async fn change_facility_booking_status(
        &self,
        id: u64,
        status: Status,
    ) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!("pemesanan-fasilitas/{}/change-status", id),
            json!({ "status": status }),
        )
        .await
    }

    async fn process_room_payment(&self, id: u64, method: PaymentMethod) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!("pemesanan-kamar/{}/process-payment", id),
            json!({ "metode_pembayaran": method }),
        )
        .await
    }

    async fn order(&self, id: u64) -> Result<Order, ApiError> {
        self.fetch(&format!("pesanan/{}/", id), "Pesanan tidak ditemukan")
            .await
    }

    async fn update_order_status(&self, id: u64, status: Status) -> Result<(), ApiError> {
        self.command(
            Method::POST,
            &format!("pesanan/{}/update-status", id),
            json!({ "status": status }),
        )
        .await
    }

    async fn payment(&self, id: u64) -> Result<Payment, ApiError> {
        self.fetch(&format!("pembayaran/{}/", id), "Pembayaran tidak ditemukan")
            .await
    }

    async fn update_payment_status(&self, id: u64, status: Status) -> Result<(), ApiError> {
        self.command(
            Method::PUT,
            &format!("pembayaran/{}/", id),
            json!({ "status": status }),
        )
        .await
    }
}

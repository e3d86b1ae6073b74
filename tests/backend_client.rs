//! ResortClient against a throwaway axum backend on 127.0.0.1:0.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use resort_checkin::backend::{ApiError, BookingService, ResortClient};
use resort_checkin::lookup::{BookingLookup, LookupOutcome};
use resort_checkin::bus::create_bus;
use resort_wire::{PaymentMethod, Status};

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Seen {
    fn push(&self, path: String, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        self.requests.lock().unwrap().push((path, auth, body));
    }

    fn all(&self) -> Vec<(String, Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn room_by_code(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> impl IntoResponse {
    seen.push(format!("room/{}", code), &headers, Value::Null);
    match code.as_str() {
        "RM-1234" => (
            StatusCode::OK,
            Json(json!({
                "status": "berhasil",
                "data": {
                    "id": 7,
                    "kode_pemesanan": "RM-1234",
                    "status": "dikonfirmasi",
                    "status_pembayaran": "belum_dibayar",
                    "tanggal_check_in": "2024-06-01T00:00:00.000000Z",
                    "tanggal_check_out": "2024-06-02T00:00:00.000000Z",
                    "total_harga": "500000.00"
                }
            })),
        ),
        "RM-EMPTY" => (StatusCode::OK, Json(json!({ "status": "berhasil", "data": null }))),
        "RM-500" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Database tidak tersedia" })),
        ),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Pemesanan tidak ditemukan" })),
        ),
    }
}

async fn facility_by_code(Path(code): Path<String>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "error",
            "error": { "message": format!("Kode {} kedaluwarsa", code) }
        })),
    )
}

async fn room_status(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.push(format!("room/{}/update-status", id), &headers, body);
    Json(json!({ "status": "berhasil update status", "data": { "id": id } }))
}

async fn room_payment(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.push(format!("room/{}/process-payment", id), &headers, body);
    Json(json!({ "status": "berhasil proses pembayaran" }))
}

async fn payment(Path(id): Path<u64>) -> Json<Value> {
    Json(json!({
        "data": {
            "id": id,
            "jenis_pembayaran": "pemesanan_kamar",
            "metode_pembayaran": "transfer",
            "jumlah": "500000",
            "status": "gagal"
        }
    }))
}

async fn payment_update(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Json<Value> {
    seen.push(format!("payment/{}", id), &headers, body);
    Json(json!({ "status": "berhasil update" }))
}

async fn spawn_backend() -> (String, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/pemesanan-kamar/code/{code}", get(room_by_code))
        .route("/api/pemesanan-fasilitas/code/{code}", get(facility_by_code))
        .route("/api/pemesanan-kamar/{id}/update-status", post(room_status))
        .route("/api/pemesanan-kamar/{id}/process-payment", post(room_payment))
        .route("/api/pembayaran/{id}/", get(payment).put(payment_update))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api", addr), seen)
}

fn client(base: &str, token: Option<&str>) -> ResortClient {
    ResortClient::new(base, token.map(String::from), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_lookup_by_code_sends_bearer_token() {
    let (base, seen) = spawn_backend().await;
    let client = client(&base, Some("tok-123"));

    let booking = client.room_booking_by_code("RM-1234").await.unwrap();
    assert_eq!(booking.id, 7);
    assert_eq!(booking.status, Status::Dikonfirmasi);
    assert_eq!(booking.total_harga, 500_000.0);

    let requests = seen.all();
    assert_eq!(requests[0].0, "room/RM-1234");
    assert_eq!(requests[0].1.as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn test_no_token_means_no_auth_header() {
    let (base, seen) = spawn_backend().await;
    let client = client(&base, None);

    client.room_booking_by_code("RM-1234").await.unwrap();
    assert_eq!(seen.all()[0].1, None);
}

#[tokio::test]
async fn test_http_404_and_empty_data_are_not_found() {
    let (base, _seen) = spawn_backend().await;
    let client = client(&base, None);

    let err = client.room_booking_by_code("RM-0007").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.user_message(), "Pemesanan tidak ditemukan");

    let err = client.room_booking_by_code("RM-EMPTY").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_server_error_keeps_message() {
    let (base, _seen) = spawn_backend().await;
    let client = client(&base, None);

    match client.room_booking_by_code("RM-500").await.unwrap_err() {
        ApiError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Database tidak tersedia");
        }
        other => panic!("Expected Server, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_envelope_is_rejected() {
    let (base, _seen) = spawn_backend().await;
    let client = client(&base, None);

    match client.facility_booking_by_code("FS-9").await.unwrap_err() {
        ApiError::Rejected(message) => assert_eq!(message, "Kode FS-9 kedaluwarsa"),
        other => panic!("Expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_commands_send_expected_bodies() {
    let (base, seen) = spawn_backend().await;
    let client = client(&base, Some("tok"));

    client
        .update_room_booking_status(7, Status::CheckIn)
        .await
        .unwrap();
    client
        .process_room_payment(7, PaymentMethod::Cash)
        .await
        .unwrap();

    let payment = client.payment(3).await.unwrap();
    assert_eq!(payment.metode_pembayaran, PaymentMethod::Transfer);
    client
        .update_payment_status(3, Status::Selesai)
        .await
        .unwrap();

    let requests = seen.all();
    assert_eq!(requests[0].0, "room/7/update-status");
    assert_eq!(requests[0].2, json!({ "status": "check_in" }));
    assert_eq!(requests[1].0, "room/7/process-payment");
    assert_eq!(requests[1].2, json!({ "metode_pembayaran": "cash" }));
    assert_eq!(requests[2].0, "payment/3");
    assert_eq!(requests[2].2, json!({ "status": "selesai" }));
}

#[tokio::test]
async fn test_unreachable_backend_maps_to_lookup_failure() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let service = Arc::new(client(&format!("http://{}", addr), None));
    let lookup = BookingLookup::new(service, create_bus());

    match lookup.lookup("RM-1").await {
        LookupOutcome::Failed { message } => {
            assert_eq!(message, "Terjadi kesalahan saat memproses kode QR")
        }
        other => panic!("Expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_message_is_appended_to_lookup_failure() {
    let (base, _seen) = spawn_backend().await;
    let lookup = BookingLookup::new(Arc::new(client(&base, None)), create_bus());

    match lookup.lookup("RM-500").await {
        LookupOutcome::Failed { message } => assert_eq!(
            message,
            "Terjadi kesalahan saat memproses kode QR: Database tidak tersedia"
        ),
        other => panic!("Expected Failed, got {:?}", other),
    }
}

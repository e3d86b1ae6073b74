//! Shared fixtures: an in-memory booking service and a fully wired desk.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{GrayImage, Luma};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use resort_checkin::backend::{ApiError, BookingService};
use resort_checkin::bus::{create_bus, BusEvent, SharedBus};
use resort_checkin::camera::{CameraManager, Frame, MemoryCamera};
use resort_checkin::desk::CheckInDesk;
use resort_checkin::scanner::{DecodeError, QrDecoder, Scanner, ScannerSettings};
use resort_wire::{
    FacilityBooking, Order, Payment, PaymentMethod, PaymentStatus, RoomBooking, Status,
};

pub fn room_booking(id: u64, code: &str, status: &str) -> RoomBooking {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "kode_pemesanan": code,
        "status": status,
        "status_pembayaran": "belum_dibayar",
        "tanggal_check_in": "2024-06-01",
        "tanggal_check_out": "2024-06-03",
        "total_harga": "750000.00",
        "kamar": {"no_kamar": "101", "jenis_kamar": {"nm_jenis_kamar": "Deluxe"}},
        "user": {"name": "Sari"}
    }))
    .unwrap()
}

pub fn facility_booking(id: u64, code: &str, status: &str) -> FacilityBooking {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "kode_pemesanan": code,
        "status": status,
        "status_pembayaran": "dibayar",
        "tanggal_pemesanan": "2024-06-10",
        "waktu_mulai": "09:00",
        "waktu_selesai": "11:00",
        "jumlah_orang": 4,
        "total_harga": 200000,
        "fasilitas": {"nm_fasilitas": "Kolam Renang"}
    }))
    .unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RoomStatus(u64, Status),
    FacilityStatus(u64, Status),
    RoomPayment(u64, PaymentMethod),
    OrderStatus(u64, Status),
    PaymentStatus(u64, Status),
}

#[derive(Default)]
struct FakeState {
    rooms: HashMap<String, RoomBooking>,
    facilities: HashMap<String, FacilityBooking>,
    orders: HashMap<u64, Order>,
    payments: HashMap<u64, Payment>,
    calls: Vec<Call>,
    reject_updates: bool,
    delay: Option<Duration>,
}

/// In-memory backend that applies updates to its own records
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_room(&self, booking: RoomBooking) {
        let mut state = self.state.lock().unwrap();
        state.rooms.insert(booking.kode_pemesanan.clone(), booking);
    }

    pub fn add_facility(&self, booking: FacilityBooking) {
        let mut state = self.state.lock().unwrap();
        state.facilities.insert(booking.kode_pemesanan.clone(), booking);
    }

    pub fn add_order(&self, order: Order) {
        self.state.lock().unwrap().orders.insert(order.id, order);
    }

    pub fn add_payment(&self, payment: Payment) {
        self.state.lock().unwrap().payments.insert(payment.id, payment);
    }

    /// Make every update answer with a rejected envelope
    pub fn reject_updates(&self) {
        self.state.lock().unwrap().reject_updates = true;
    }

    /// Delay every update call
    pub fn slow_updates(&self, delay: Duration) {
        self.state.lock().unwrap().delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    async fn record(&self, call: Call) -> Result<(), ApiError> {
        let delay = self.state.lock().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.reject_updates {
            return Err(ApiError::Rejected("Status tidak dapat diubah".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingService for FakeBackend {
    async fn room_booking_by_code(&self, code: &str) -> Result<RoomBooking, ApiError> {
        self.state
            .lock()
            .unwrap()
            .rooms
            .get(code)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Data pemesanan tidak ditemukan".to_string()))
    }

    async fn facility_booking_by_code(&self, code: &str) -> Result<FacilityBooking, ApiError> {
        self.state
            .lock()
            .unwrap()
            .facilities
            .get(code)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Data pemesanan tidak ditemukan".to_string()))
    }

    async fn update_room_booking_status(&self, id: u64, status: Status) -> Result<(), ApiError> {
        self.record(Call::RoomStatus(id, status.clone())).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(b) = state.rooms.values_mut().find(|b| b.id == id) {
            b.status = status;
        }
        Ok(())
    }

    async fn change_facility_booking_status(
        &self,
        id: u64,
        status: Status,
    ) -> Result<(), ApiError> {
        self.record(Call::FacilityStatus(id, status.clone())).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(b) = state.facilities.values_mut().find(|b| b.id == id) {
            b.status = status;
        }
        Ok(())
    }

    async fn process_room_payment(&self, id: u64, method: PaymentMethod) -> Result<(), ApiError> {
        self.record(Call::RoomPayment(id, method)).await?;
        let mut state = self.state.lock().unwrap();
        if let Some(b) = state.rooms.values_mut().find(|b| b.id == id) {
            b.status_pembayaran = PaymentStatus::Dibayar;
        }
        Ok(())
    }

    async fn order(&self, id: u64) -> Result<Order, ApiError> {
        self.state
            .lock()
            .unwrap()
            .orders
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Pesanan tidak ditemukan".to_string()))
    }

    async fn update_order_status(&self, id: u64, status: Status) -> Result<(), ApiError> {
        self.record(Call::OrderStatus(id, status)).await
    }

    async fn payment(&self, id: u64) -> Result<Payment, ApiError> {
        self.state
            .lock()
            .unwrap()
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Pembayaran tidak ditemukan".to_string()))
    }

    async fn update_payment_status(&self, id: u64, status: Status) -> Result<(), ApiError> {
        self.record(Call::PaymentStatus(id, status)).await
    }
}

/// Decodes frames painted by [`code_frame`]: the pixel row spells the code
pub struct PixelDecoder;

impl QrDecoder for PixelDecoder {
    fn decode(&self, frame: &Frame) -> Result<Option<String>, DecodeError> {
        if frame.height() != 1 {
            return Ok(None);
        }
        let bytes: Vec<u8> = frame.pixels().map(|p| p.0[0]).collect();
        Ok(String::from_utf8(bytes).ok())
    }
}

/// A one-row frame whose pixel values are the bytes of `code`
pub fn code_frame(code: &str) -> GrayImage {
    let bytes = code.as_bytes();
    let mut img = GrayImage::new(bytes.len() as u32, 1);
    for (x, b) in bytes.iter().enumerate() {
        img.put_pixel(x as u32, 0, Luma([*b]));
    }
    img
}

pub fn noise_frame() -> GrayImage {
    GrayImage::from_pixel(16, 16, Luma([90]))
}

pub struct Harness {
    pub camera: MemoryCamera,
    pub backend: FakeBackend,
    pub bus: SharedBus,
    pub scanner: Arc<Scanner>,
    pub desk: Arc<CheckInDesk>,
}

impl Harness {
    pub fn new() -> Self {
        let camera = MemoryCamera::new();
        let backend = FakeBackend::new();
        let bus = create_bus();
        let manager = Arc::new(CameraManager::new(Arc::new(camera.clone()), bus.clone()));
        let scanner = Arc::new(Scanner::new(
            manager,
            Arc::new(PixelDecoder),
            bus.clone(),
            ScannerSettings {
                frame_interval: Duration::from_millis(5),
                grace: Duration::from_millis(20),
            },
        ));
        let desk = Arc::new(CheckInDesk::new(
            scanner.clone(),
            Arc::new(backend.clone()),
            bus.clone(),
        ));
        Self {
            camera,
            backend,
            bus,
            scanner,
            desk,
        }
    }
}

/// Wait for the first bus event matching `pred`
pub async fn wait_for<F>(rx: &mut tokio::sync::broadcast::Receiver<BusEvent>, pred: F) -> BusEvent
where
    F: Fn(&BusEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("bus closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for bus event")
}

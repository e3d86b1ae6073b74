//! Booking, order and payment records as the admin backend returns them.
//!
//! Field names follow the backend JSON exactly. The backend is loose about
//! numbers (decimal columns arrive as strings) and dates (plain dates or full
//! timestamps), so those fields go through the lenient deserializers below.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::status::{EntityKind, PaymentMethod, PaymentStatus, Status};

/// Customer attached to a booking or order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoomType {
    #[serde(default)]
    pub nm_jenis_kamar: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Room {
    #[serde(default, deserialize_with = "string_or_number")]
    pub no_kamar: String,
    #[serde(default)]
    pub jenis_kamar: Option<RoomType>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    #[serde(default)]
    pub nm_fasilitas: String,
}

/// Room booking (`pemesanan kamar`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomBooking {
    #[serde(deserialize_with = "id")]
    pub id: u64,
    pub kode_pemesanan: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub status_pembayaran: PaymentStatus,
    #[serde(deserialize_with = "lenient_date")]
    pub tanggal_check_in: NaiveDate,
    #[serde(deserialize_with = "lenient_date")]
    pub tanggal_check_out: NaiveDate,
    #[serde(default, deserialize_with = "amount")]
    pub total_harga: f64,
    #[serde(default)]
    pub catatan: Option<String>,
    #[serde(default)]
    pub kamar: Option<Room>,
    #[serde(default)]
    pub user: Option<Customer>,
}

/// Facility booking (`pemesanan fasilitas`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacilityBooking {
    #[serde(deserialize_with = "id")]
    pub id: u64,
    pub kode_pemesanan: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub status_pembayaran: PaymentStatus,
    #[serde(deserialize_with = "lenient_date")]
    pub tanggal_pemesanan: NaiveDate,
    #[serde(default)]
    pub waktu_mulai: String,
    #[serde(default)]
    pub waktu_selesai: String,
    #[serde(default)]
    pub jumlah_orang: Option<u32>,
    #[serde(default, deserialize_with = "amount")]
    pub total_harga: f64,
    #[serde(default)]
    pub catatan: Option<String>,
    #[serde(default)]
    pub fasilitas: Option<Facility>,
    #[serde(default)]
    pub user: Option<Customer>,
}

/// Product order (`pesanan`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    #[serde(deserialize_with = "id")]
    pub id: u64,
    pub kode_pesanan: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub status_pembayaran: PaymentStatus,
    #[serde(default, deserialize_with = "amount")]
    pub total_jumlah: f64,
    #[serde(default)]
    pub metode_pembayaran: Option<PaymentMethod>,
    #[serde(default)]
    pub catatan: Option<String>,
    #[serde(default)]
    pub user: Option<Customer>,
}

/// Payment record (`pembayaran`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    #[serde(deserialize_with = "id")]
    pub id: u64,
    /// `pesanan`, `pemesanan_kamar` or `pemesanan_fasilitas`
    #[serde(default)]
    pub jenis_pembayaran: String,
    pub metode_pembayaran: PaymentMethod,
    #[serde(default, deserialize_with = "amount")]
    pub jumlah: f64,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub id_transaksi: Option<String>,
}

/// A booking shown at the check-in desk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "booking", rename_all = "snake_case")]
pub enum Booking {
    Room(RoomBooking),
    Facility(FacilityBooking),
}

impl Booking {
    pub fn id(&self) -> u64 {
        match self {
            Self::Room(b) => b.id,
            Self::Facility(b) => b.id,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Room(b) => &b.kode_pemesanan,
            Self::Facility(b) => &b.kode_pemesanan,
        }
    }

    pub fn status(&self) -> &Status {
        match self {
            Self::Room(b) => &b.status,
            Self::Facility(b) => &b.status,
        }
    }

    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Room(b) => b.status_pembayaran,
            Self::Facility(b) => b.status_pembayaran,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Room(_) => EntityKind::RoomBooking,
            Self::Facility(_) => EntityKind::FacilityBooking,
        }
    }
}

// =============================================================================
// Lenient deserializers
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(u64),
    Float(f64),
    Text(String),
}

fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => Ok(n),
        NumberOrString::Float(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        NumberOrString::Float(f) => Err(serde::de::Error::custom(format!("invalid id: {}", f))),
        NumberOrString::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {}", s))),
    }
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(NumberOrString::Int(n)) => Ok(n as f64),
        Some(NumberOrString::Float(f)) => Ok(f),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount: {}", s))),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(n) => n.to_string(),
        NumberOrString::Float(f) => f.to_string(),
        NumberOrString::Text(s) => s,
    })
}

/// Accepts `2024-05-01` as well as `2024-05-01T00:00:00.000000Z`
fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| serde::de::Error::custom(format!("invalid date {:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_booking_from_backend_payload() {
        let json = serde_json::json!({
            "id": "12",
            "kode_pemesanan": "RM-0007",
            "status": "dikonfirmasi",
            "status_pembayaran": "dibayar",
            "tanggal_check_in": "2024-06-01T00:00:00.000000Z",
            "tanggal_check_out": "2024-06-03",
            "total_harga": "1500000.00",
            "kamar": {"no_kamar": 101, "jenis_kamar": {"nm_jenis_kamar": "Deluxe"}},
            "user": {"name": "Budi"}
        });

        let booking: RoomBooking = serde_json::from_value(json).unwrap();
        assert_eq!(booking.id, 12);
        assert_eq!(booking.status, Status::Dikonfirmasi);
        assert_eq!(booking.status_pembayaran, PaymentStatus::Dibayar);
        assert_eq!(
            booking.tanggal_check_in,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert_eq!(booking.total_harga, 1_500_000.0);
        assert_eq!(booking.kamar.unwrap().no_kamar, "101");
    }

    #[test]
    fn test_facility_booking_minimal_payload() {
        let json = serde_json::json!({
            "id": 3,
            "kode_pemesanan": "FS-22",
            "status": "menunggu",
            "tanggal_pemesanan": "2024-06-10",
            "waktu_mulai": "09:00",
            "waktu_selesai": "11:00",
            "total_harga": null
        });

        let booking: FacilityBooking = serde_json::from_value(json).unwrap();
        assert_eq!(booking.total_harga, 0.0);
        assert_eq!(booking.status_pembayaran, PaymentStatus::Unknown);
        assert!(booking.fasilitas.is_none());
    }

    #[test]
    fn test_booking_accessors() {
        let json = serde_json::json!({
            "id": 3,
            "kode_pemesanan": "FSL-1",
            "status": "digunakan",
            "status_pembayaran": "belum_dibayar",
            "tanggal_pemesanan": "2024-06-10",
        });
        let booking = Booking::Facility(serde_json::from_value(json).unwrap());

        assert_eq!(booking.id(), 3);
        assert_eq!(booking.code(), "FSL-1");
        assert_eq!(booking.status(), &Status::Digunakan);
        assert_eq!(booking.payment_status(), PaymentStatus::BelumDibayar);
        assert_eq!(booking.kind(), EntityKind::FacilityBooking);
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        let json = serde_json::json!({
            "id": "abc",
            "kode_pesanan": "PS-1",
        });
        assert!(serde_json::from_value::<Order>(json).is_err());
    }
}

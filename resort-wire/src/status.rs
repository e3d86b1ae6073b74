//! Status vocabulary shared by bookings, orders and payments.
//!
//! The backend speaks Indonesian status literals (`menunggu`, `dikonfirmasi`,
//! ...). They are modelled as one closed vocabulary; which of them is valid
//! for a given record depends on its [`EntityKind`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of a booking, order or payment.
///
/// Unrecognised literals decode to [`Status::Unknown`] instead of failing the
/// whole record, so a new backend status never breaks a lookup. The raw
/// literal is kept and written back out unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Waiting for confirmation (`menunggu`)
    Menunggu,
    /// Confirmed (`dikonfirmasi`)
    Dikonfirmasi,
    /// Guest checked in (`check_in`)
    CheckIn,
    /// Guest checked out (`check_out`)
    CheckOut,
    /// Facility in use (`digunakan`)
    Digunakan,
    /// Order being prepared (`diproses`)
    Diproses,
    /// Finished (`selesai`)
    Selesai,
    /// Cancelled (`dibatalkan`)
    Dibatalkan,
    /// Payment failed (`gagal`)
    Gagal,
    /// Payment refunded (`dikembalikan`)
    Dikembalikan,
    Unknown(String),
}

impl Default for Status {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Menunggu => "menunggu",
            Self::Dikonfirmasi => "dikonfirmasi",
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
            Self::Digunakan => "digunakan",
            Self::Diproses => "diproses",
            Self::Selesai => "selesai",
            Self::Dibatalkan => "dibatalkan",
            Self::Gagal => "gagal",
            Self::Dikembalikan => "dikembalikan",
            Self::Unknown(raw) => raw,
        }
    }

    /// Human label for buttons ("Check In", "Batalkan", ...)
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Menunggu => "Menunggu",
            Self::Dikonfirmasi => "Konfirmasi",
            Self::CheckIn => "Check In",
            Self::CheckOut => "Check Out",
            Self::Digunakan => "Gunakan",
            Self::Diproses => "Proses",
            Self::Selesai => "Selesai",
            Self::Dibatalkan => "Batalkan",
            Self::Gagal => "Gagal",
            Self::Dikembalikan => "Kembalikan",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "menunggu" => Self::Menunggu,
            "dikonfirmasi" => Self::Dikonfirmasi,
            "check_in" | "check-in" | "checkin" => Self::CheckIn,
            "check_out" | "check-out" | "checkout" => Self::CheckOut,
            "digunakan" => Self::Digunakan,
            "diproses" => Self::Diproses,
            "selesai" => Self::Selesai,
            "dibatalkan" => Self::Dibatalkan,
            "gagal" => Self::Gagal,
            "dikembalikan" => Self::Dikembalikan,
            _ => Self::Unknown(s.to_string()),
        }
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Payment state carried on bookings and orders (`status_pembayaran`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    BelumDibayar,
    Dibayar,
    Dikembalikan,
    #[default]
    Unknown,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BelumDibayar => "belum_dibayar",
            Self::Dibayar => "dibayar",
            Self::Dikembalikan => "dikembalikan",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PaymentStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "belum_dibayar" => Self::BelumDibayar,
            "dibayar" => Self::Dibayar,
            "dikembalikan" => Self::Dikembalikan,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

/// How a payment was (or will be) settled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    /// Gateway payments; their status is owned by the gateway callback
    Midtrans,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
            Self::Midtrans => "midtrans",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "tunai" => Ok(Self::Cash),
            "transfer" => Ok(Self::Transfer),
            "midtrans" => Ok(Self::Midtrans),
            other => Err(format!("unknown payment method: {}", other)),
        }
    }
}

/// The kinds of record whose status can be changed from the desk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    RoomBooking,
    FacilityBooking,
    Order,
    Payment,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        Self::RoomBooking,
        Self::FacilityBooking,
        Self::Order,
        Self::Payment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoomBooking => "room_booking",
            Self::FacilityBooking => "facility_booking",
            Self::Order => "order",
            Self::Payment => "payment",
        }
    }

    /// Indonesian noun used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::RoomBooking => "Pemesanan kamar",
            Self::FacilityBooking => "Pemesanan fasilitas",
            Self::Order => "Pesanan",
            Self::Payment => "Pembayaran",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "room_booking" | "room" | "pemesanan_kamar" => Ok(Self::RoomBooking),
            "facility_booking" | "facility" | "pemesanan_fasilitas" => Ok(Self::FacilityBooking),
            "order" | "pesanan" => Ok(Self::Order),
            "payment" | "pembayaran" => Ok(Self::Payment),
            other => Err(format!("unknown entity kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_literals_match_backend() {
        let status: Status = serde_json::from_str("\"check_in\"").unwrap();
        assert_eq!(status, Status::CheckIn);
        assert_eq!(serde_json::to_string(&Status::Dibatalkan).unwrap(), "\"dibatalkan\"");
    }

    #[test]
    fn test_unrecognised_status_keeps_raw_literal() {
        let status: Status = serde_json::from_str("\"pending_review\"").unwrap();
        assert_eq!(status, Status::Unknown("pending_review".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"pending_review\"");
    }

    #[test]
    fn test_refunded_payment_status() {
        let status: Status = serde_json::from_str("\"dikembalikan\"").unwrap();
        assert_eq!(status, Status::Dikembalikan);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"dikembalikan\"");
    }

    #[test]
    fn test_payment_status_from_backend() {
        let status: PaymentStatus = serde_json::from_str("\"belum_dibayar\"").unwrap();
        assert_eq!(status, PaymentStatus::BelumDibayar);
    }

    #[test]
    fn test_entity_kind_parses_aliases() {
        assert_eq!("room".parse::<EntityKind>().unwrap(), EntityKind::RoomBooking);
        assert_eq!(
            "pemesanan-fasilitas".parse::<EntityKind>().unwrap(),
            EntityKind::FacilityBooking
        );
        assert_eq!("pesanan".parse::<EntityKind>().unwrap(), EntityKind::Order);
        assert!("invoice".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_payment_method_accepts_tunai() {
        assert_eq!("Tunai".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
    }
}

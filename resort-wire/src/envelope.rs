//! Response envelope of the admin backend.
//!
//! Every endpoint answers `{status, data, message, error}`. The `status`
//! literals (`berhasil`, `berhasil update`, ...) name outcome categories and
//! are matched literally by callers, so they are modelled as [`Outcome`].

use serde::{Deserialize, Serialize};

/// Outcome category carried in the envelope's `status` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    /// `berhasil`
    Success,
    /// `berhasil tambah`
    Created,
    /// `berhasil update`
    Updated,
    /// `berhasil update status`
    StatusUpdated,
    /// `berhasil hapus`
    Deleted,
    /// `berhasil proses pembayaran`
    PaymentProcessed,
    /// `error`
    Error,
    /// Any other literal, kept verbatim
    Other(String),
}

impl Outcome {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "berhasil",
            Self::Created => "berhasil tambah",
            Self::Updated => "berhasil update",
            Self::StatusUpdated => "berhasil update status",
            Self::Deleted => "berhasil hapus",
            Self::PaymentProcessed => "berhasil proses pembayaran",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }

    /// Every `berhasil*` literal counts as success; so does the English
    /// `success` some auth endpoints send.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Error => false,
            Self::Other(s) => {
                let s = s.to_lowercase();
                s.starts_with("berhasil") || s == "success"
            }
            _ => true,
        }
    }
}

impl From<&str> for Outcome {
    fn from(s: &str) -> Self {
        match s.trim() {
            "berhasil" => Self::Success,
            "berhasil tambah" => Self::Created,
            "berhasil update" => Self::Updated,
            "berhasil update status" => Self::StatusUpdated,
            "berhasil hapus" => Self::Deleted,
            "berhasil proses pembayaran" => Self::PaymentProcessed,
            "error" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Outcome {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Outcome> for String {
    fn from(outcome: Outcome) -> Self {
        outcome.as_str().to_string()
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<Outcome>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl<T> Envelope<T> {
    /// Best-effort human message: `message`, then `error.message`, then a
    /// string `error`.
    pub fn best_message(&self) -> Option<String> {
        if let Some(message) = self.message.as_ref().filter(|m| !m.is_empty()) {
            return Some(message.clone());
        }
        match &self.error {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Object(map)) => map
                .get("message")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            _ => None,
        }
    }

    /// An envelope is successful unless it says `error` or carries an error
    /// payload. A missing `status` is treated as success.
    pub fn is_success(&self) -> bool {
        let status_ok = self.status.as_ref().map(|s| s.is_success()).unwrap_or(true);
        let error_free = self.error.as_ref().map(|e| e.is_null()).unwrap_or(true);
        status_ok && error_free
    }
}

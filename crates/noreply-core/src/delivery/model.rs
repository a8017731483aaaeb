//! Delivery log entries.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Accepted by the SMTP server.
    Sent,
    /// Every attempt failed, or the email was rejected before sending.
    Failed,
}

impl DeliveryStatus {
    /// Returns the stored form of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

/// One row of the delivery log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// User the notification was for.
    pub user_id: i64,
    /// Notification kind, e.g. `welcome`.
    pub email_type: String,
    /// Outcome.
    pub status: DeliveryStatus,
    /// Error text for failed deliveries.
    pub error_message: Option<String>,
    /// When the outcome was known.
    pub timestamp: DateTime<Utc>,
}

impl DeliveryRecord {
    /// Records a successful delivery now.
    #[must_use]
    pub fn sent(user_id: i64, email_type: impl Into<String>) -> Self {
        Self {
            user_id,
            email_type: email_type.into(),
            status: DeliveryStatus::Sent,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    /// Records a failed delivery now.
    #[must_use]
    pub fn failed(user_id: i64, email_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            user_id,
            email_type: email_type.into(),
            status: DeliveryStatus::Failed,
            error_message: Some(error.into()),
            timestamp: Utc::now(),
        }
    }
}

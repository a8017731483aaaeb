//! User record as stored by the application.

use serde::{Deserialize, Serialize};

/// A user that notifications are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: i64,
    /// Delivery address.
    pub email: String,
    /// Name used in greetings.
    pub name: String,
    /// Free-form subscription state, e.g. `active` or `frozen`.
    pub subscription_status: Option<String>,
    /// Date of the last successful payment, as stored.
    pub last_payment_date: Option<String>,
}

impl User {
    /// Creates a user with no subscription data.
    #[must_use]
    pub fn new(id: i64, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
            subscription_status: None,
            last_payment_date: None,
        }
    }

    /// Sets the subscription status.
    #[must_use]
    pub fn with_subscription_status(mut self, status: impl Into<String>) -> Self {
        self.subscription_status = Some(status.into());
        self
    }

    /// Sets the last payment date.
    #[must_use]
    pub fn with_last_payment_date(mut self, date: impl Into<String>) -> Self {
        self.last_payment_date = Some(date.into());
        self
    }
}

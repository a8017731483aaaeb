//! Sending notifications for application events.

use crate::delivery::{DeliveryLog, DeliveryRecord};
use crate::error::{Error, Result};
use crate::mailer::Mailer;
use crate::templates::Notification;
use crate::transport::{SmtpTransport, Transport};
use crate::users::{User, UserRepository};

/// Renders notifications, sends them, and records the outcome.
#[derive(Debug)]
pub struct Notifier<T = SmtpTransport> {
    mailer: Mailer<T>,
    log: Option<DeliveryLog>,
}

impl<T: Transport> Notifier<T> {
    /// Creates a notifier that keeps no delivery log.
    #[must_use]
    pub const fn new(mailer: Mailer<T>) -> Self {
        Self { mailer, log: None }
    }

    /// Records every outcome in `log`.
    #[must_use]
    pub fn with_log(mut self, log: DeliveryLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Returns the mailer.
    #[must_use]
    pub const fn mailer(&self) -> &Mailer<T> {
        &self.mailer
    }

    /// Returns the delivery log, if one is attached.
    #[must_use]
    pub const fn log(&self) -> Option<&DeliveryLog> {
        self.log.as_ref()
    }

    /// Sends a notification to a user.
    ///
    /// The outcome is recorded before the send result is returned. A failure
    /// to write the log is reported only when the send itself succeeded.
    ///
    /// # Errors
    ///
    /// Returns the send error, or a database error from the log.
    pub async fn notify(&self, user: &User, notification: &Notification) -> Result<()> {
        let email = notification.render(user).into_email(user.email.as_str());
        let kind = notification.kind();

        tracing::info!(user_id = user.id, kind, "Sending notification");
        let outcome = self.mailer.send(&email).await;

        if let Some(log) = &self.log {
            let record = match &outcome {
                Ok(()) => DeliveryRecord::sent(user.id, kind),
                Err(e) => DeliveryRecord::failed(user.id, kind, e.to_string()),
            };
            if let Err(e) = log.record(&record).await {
                tracing::error!(user_id = user.id, kind, error = %e, "Cannot record delivery");
                outcome?;
                return Err(e);
            }
        }

        outcome
    }

    /// Looks up a user and sends them a notification.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UserNotFound`] if no user has this id, otherwise the
    /// same errors as [`Notifier::notify`].
    pub async fn notify_user(
        &self,
        users: &UserRepository,
        user_id: i64,
        notification: &Notification,
    ) -> Result<()> {
        let user = users
            .get_user(user_id)
            .await?
            .ok_or(Error::UserNotFound(user_id))?;
        self.notify(&user, notification).await
    }
}

//! Sending with retries.
//!
//! A [`Mailer`] composes a message once and hands it to its transport,
//! retrying transport failures with linear backoff: the wait after attempt
//! `n` is `backoff * n`. Validation failures are returned before any
//! attempt is made.

use std::time::Duration;

use tracing::Instrument;

use crate::compose::{ComposedMessage, compose};
use crate::config::{SenderIdentity, TransportConfig};
use crate::error::{Result, TransportError};
use crate::transport::{SmtpTransport, Transport};

/// How often and how patiently a send is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per send, including the first. Zero behaves like one.
    pub max_retries: u32,
    /// Base wait, multiplied by the number of the failed attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Default number of attempts.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Default base backoff.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Creates a policy that makes a single attempt.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Returns the number of attempts a send will make.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Returns the wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RETRIES, Self::DEFAULT_BACKOFF)
    }
}

/// An email to send, before composition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
    /// Plain-text body; derived from the HTML when absent or empty.
    pub plain_body: Option<String>,
}

impl OutgoingEmail {
    /// Creates an email with no recipients.
    #[must_use]
    pub fn new(subject: impl Into<String>, html_body: impl Into<String>) -> Self {
        Self {
            to: Vec::new(),
            subject: subject.into(),
            html_body: html_body.into(),
            plain_body: None,
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Sets an explicit plain-text body.
    #[must_use]
    pub fn plain_body(mut self, text: impl Into<String>) -> Self {
        self.plain_body = Some(text.into());
        self
    }
}

/// Sends no-reply email through one transport.
///
/// A mailer holds no mutable state, so a shared reference can be used by
/// many tasks at once.
#[derive(Debug)]
pub struct Mailer<T = SmtpTransport> {
    identity: SenderIdentity,
    transport: T,
    policy: RetryPolicy,
    span: tracing::Span,
}

impl Mailer {
    /// Creates a mailer that delivers over SMTP.
    #[must_use]
    pub fn new(identity: SenderIdentity, config: TransportConfig) -> Self {
        Self::with_transport(identity, SmtpTransport::new(config))
    }
}

impl<T: Transport> Mailer<T> {
    /// Creates a mailer with a custom transport.
    #[must_use]
    pub fn with_transport(identity: SenderIdentity, transport: T) -> Self {
        let span = tracing::info_span!("mailer", sender = %identity.address());
        Self {
            identity,
            transport,
            policy: RetryPolicy::default(),
            span,
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the span all send logs are recorded in.
    #[must_use]
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Returns the sender identity.
    #[must_use]
    pub const fn identity(&self) -> &SenderIdentity {
        &self.identity
    }

    /// Returns the transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Composes and sends an email using the mailer's retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) if the email
    /// is malformed, or [`Error::Transport`](crate::Error::Transport) with
    /// the last failure once every attempt has failed.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.send_with_policy(email, self.policy).await
    }

    /// Composes and sends an email with a one-off retry policy.
    ///
    /// # Errors
    ///
    /// Same as [`Mailer::send`].
    pub async fn send_with_policy(&self, email: &OutgoingEmail, policy: RetryPolicy) -> Result<()> {
        let message = compose(
            &self.identity,
            &email.to,
            &email.subject,
            &email.html_body,
            email.plain_body.as_deref(),
        )?;

        self.deliver(&message, policy)
            .instrument(self.span.clone())
            .await
            .map_err(Into::into)
    }

    /// Delivers an already composed message, retrying transport failures.
    ///
    /// # Errors
    ///
    /// Returns the last transport failure once every attempt has failed.
    pub async fn deliver(
        &self,
        message: &ComposedMessage,
        policy: RetryPolicy,
    ) -> std::result::Result<(), TransportError> {
        let max_retries = policy.attempts();
        let recipients = message.to().join(", ");
        let mut attempt = 1;

        loop {
            match self.transport.deliver(message).await {
                Ok(()) => {
                    tracing::info!(
                        %recipients,
                        message_id = message.message_id(),
                        attempt,
                        "Email sent"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_retries,
                        permanent = e.is_permanent(),
                        transient = e.is_transient(),
                        error = %e,
                        "Email send attempt failed"
                    );
                    if attempt >= max_retries {
                        tracing::error!(
                            %recipients,
                            attempts = attempt,
                            error = %e,
                            "Giving up on email"
                        );
                        return Err(e);
                    }
                    tokio::time::sleep(policy.delay_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

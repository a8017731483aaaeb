//! Error types for the core library.
//!
//! Three kinds of failure are kept apart so that only transport failures
//! ever reach the retry loop:
//!
//! - [`ConfigurationError`]: a setting is absent or invalid. Raised while
//!   building the sender identity or transport configuration.
//! - [`ValidationError`]: a single send call was given bad input.
//! - [`TransportError`]: the SMTP session failed. Retried by the mailer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Required setting absent or invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A required setting was not provided.
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// A setting was provided but cannot be used.
    #[error("Invalid value for {name}: {reason}")]
    Invalid {
        /// Setting name, e.g. `SMTP_PORT`.
        name: &'static str,
        /// What is wrong with the value.
        reason: String,
    },

    /// The sender address does not start with `no-reply`.
    #[error("Sender address must be a no-reply address: {0}")]
    NotNoReply(String),

    /// The sender address is not a usable mailbox.
    #[error("Invalid sender address {address}: {reason}")]
    InvalidSender {
        /// The rejected address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A settings file could not be read or parsed.
    #[error("Cannot load settings from {path}: {reason}")]
    File {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying I/O or parse error.
        reason: String,
    },
}

impl ConfigurationError {
    /// Returns the name of the setting this error relates to.
    #[must_use]
    pub const fn setting(&self) -> Option<&'static str> {
        match self {
            Self::Missing(name) | Self::Invalid { name, .. } => Some(*name),
            Self::NotNoReply(_) | Self::InvalidSender { .. } => Some("FROM_EMAIL"),
            Self::File { .. } => None,
        }
    }
}

/// Malformed input to a single send call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The recipient list is empty.
    #[error("At least one recipient required")]
    NoRecipients,

    /// A recipient is not a bare `local@domain` address.
    #[error("Invalid recipient {address}: {reason}")]
    InvalidRecipient {
        /// The rejected recipient.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The message could not be encoded.
    #[error("Message encoding failed: {0}")]
    Encoding(String),
}

/// Failure of one SMTP session.
///
/// Each variant names the step that failed and carries the protocol cause.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection or the initial greeting/EHLO failed.
    #[error("Connection failed: {0}")]
    Connection(#[source] noreply_smtp::Error),

    /// STARTTLS negotiation failed.
    #[error("TLS upgrade failed: {0}")]
    Upgrade(#[source] noreply_smtp::Error),

    /// The server rejected the credentials or offered no usable mechanism.
    #[error("Authentication failed: {0}")]
    Authentication(#[source] noreply_smtp::Error),

    /// The envelope or message data was rejected.
    #[error("Transmission failed: {0}")]
    Transmission(#[source] noreply_smtp::Error),

    /// The session did not finish within the configured time.
    #[error("Session timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Returns the protocol error behind this failure, if any.
    #[must_use]
    pub const fn cause(&self) -> Option<&noreply_smtp::Error> {
        match self {
            Self::Connection(e) | Self::Upgrade(e) | Self::Authentication(e) | Self::Transmission(e) => {
                Some(e)
            }
            Self::Timeout(_) => None,
        }
    }

    /// Returns true if the server answered with a permanent (5xx) reply.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.cause().is_some_and(noreply_smtp::Error::is_permanent)
    }

    /// Returns true if the server asked to try again later (4xx) or the
    /// session timed out.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            _ => self.cause().is_some_and(noreply_smtp::Error::is_transient),
        }
    }
}

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Send input was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Delivery failed after all retries.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No user row exists for the id.
    #[error("User not found: {0}")]
    UserNotFound(i64),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

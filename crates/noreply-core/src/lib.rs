//! # noreply-core
//!
//! Composition, delivery and retry of no-reply transactional email.
//!
//! This crate provides:
//! - **Configuration** - a validated no-reply [`SenderIdentity`] and SMTP [`TransportConfig`]
//! - **Composition** - `multipart/alternative` messages with automated-mail headers
//! - **Transport** - one SMTP session per attempt, with STARTTLS or implicit TLS and login
//! - **Retries** - linear backoff over transport failures in [`Mailer`]
//! - **Notifications** - templates, user lookup and a delivery log (`SQLite`)
//!
//! ## Example
//!
//! ```ignore
//! use noreply_core::{Mailer, MailerSettings, OutgoingEmail};
//!
//! let (identity, config) = MailerSettings::from_env()?.validate()?;
//! let mailer = Mailer::new(identity, config);
//!
//! let email = OutgoingEmail::new("Welcome", "<p>Hello!</p>").to("user@example.com");
//! mailer.send(&email).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod compose;
pub mod config;
pub mod delivery;
mod error;
pub mod mailer;
pub mod notify;
pub mod templates;
pub mod transport;
pub mod users;

pub use compose::{ComposedMessage, compose};
pub use config::{MailerSettings, Security, SenderIdentity, TransportConfig};
pub use delivery::{DeliveryLog, DeliveryRecord, DeliveryStatus};
pub use error::{ConfigurationError, Error, Result, TransportError, ValidationError};
pub use mailer::{Mailer, OutgoingEmail, RetryPolicy};
pub use notify::Notifier;
pub use templates::{Notification, RenderedEmail};
pub use transport::{Connector, SmtpTransport, TcpConnector, Transport};
pub use users::{User, UserRepository};

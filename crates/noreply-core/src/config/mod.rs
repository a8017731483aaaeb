//! Sender identity, SMTP endpoint and settings loading.

mod identity;
mod settings;
mod smtp;

pub use identity::SenderIdentity;
pub use settings::MailerSettings;
pub use smtp::{DEFAULT_TIMEOUT, Security, TransportConfig};

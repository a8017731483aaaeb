//! The sender every message is sent as.

use noreply_mime::Headers;
use noreply_smtp::Address;

use crate::error::ConfigurationError;

/// Required prefix of every sender address.
const NO_REPLY_PREFIX: &str = "no-reply";

/// Characters that force a display name into a quoted-string.
const SPECIALS: &str = "()<>[]:;@\\,.\"";

/// The no-reply sender address and optional display name.
///
/// Validated once at construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderIdentity {
    address: String,
    display_name: Option<String>,
}

impl SenderIdentity {
    /// Creates a sender identity.
    ///
    /// The address must start with `no-reply` (case-insensitive) and be a
    /// valid mailbox. An empty display name is treated as absent; control
    /// characters in it are replaced by spaces.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the address is empty, not a
    /// no-reply address, or malformed.
    pub fn new(
        address: impl Into<String>,
        display_name: Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let address = address.into();

        if address.is_empty() {
            return Err(ConfigurationError::Missing("FROM_EMAIL"));
        }

        if !address.to_lowercase().starts_with(NO_REPLY_PREFIX) {
            return Err(ConfigurationError::NotNoReply(address));
        }

        if let Err(e) = Address::new(address.as_str()) {
            return Err(ConfigurationError::InvalidSender {
                reason: e.to_string(),
                address,
            });
        }

        let display_name = display_name
            .map(|name| name.replace(char::is_control, " ").trim().to_string())
            .filter(|name| !name.is_empty());

        Ok(Self {
            address,
            display_name,
        })
    }

    /// Returns the sender address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the part of the address after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.address
            .rsplit_once('@')
            .map_or(self.address.as_str(), |(_, domain)| domain)
    }

    /// Formats the `From` header value.
    ///
    /// `Name <address>` when a display name is set, otherwise the bare address.
    #[must_use]
    pub fn mailbox(&self) -> String {
        match &self.display_name {
            None => self.address.clone(),
            Some(name) if !name.is_ascii() => {
                format!("{} <{}>", Headers::encode_value(name), self.address)
            }
            Some(name) if name.contains(|c: char| SPECIALS.contains(c)) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\" <{}>", self.address)
            }
            Some(name) => format!("{name} <{}>", self.address),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn accepts_no_reply_addresses() {
        let identity = SenderIdentity::new("no-reply@example.com", None).unwrap();
        assert_eq!(identity.address(), "no-reply@example.com");
        assert_eq!(identity.domain(), "example.com");
        assert_eq!(identity.mailbox(), "no-reply@example.com");
    }

    #[test]
    fn prefix_check_ignores_case() {
        assert!(SenderIdentity::new("No-Reply@Example.com", None).is_ok());
        assert!(SenderIdentity::new("no-reply-billing@example.com", None).is_ok());
    }

    #[test]
    fn rejects_other_senders() {
        let err = SenderIdentity::new("user@example.com", None).unwrap_err();
        assert_eq!(err, ConfigurationError::NotNoReply("user@example.com".into()));
        assert!(matches!(
            SenderIdentity::new("support-no-reply@example.com", None),
            Err(ConfigurationError::NotNoReply(_))
        ));
    }

    #[test]
    fn rejects_empty_and_malformed_addresses() {
        assert_eq!(
            SenderIdentity::new("", None).unwrap_err(),
            ConfigurationError::Missing("FROM_EMAIL")
        );
        assert!(matches!(
            SenderIdentity::new("no-reply", None),
            Err(ConfigurationError::InvalidSender { .. })
        ));
        assert!(matches!(
            SenderIdentity::new("no-reply@example.com\r\nBcc: x@example.com", None),
            Err(ConfigurationError::InvalidSender { .. })
        ));
    }

    #[test]
    fn mailbox_with_display_name() {
        let identity =
            SenderIdentity::new("no-reply@example.com", Some("Example App".into())).unwrap();
        assert_eq!(identity.display_name(), Some("Example App"));
        assert_eq!(identity.mailbox(), "Example App <no-reply@example.com>");
    }

    #[test]
    fn display_name_with_specials_is_quoted() {
        let identity =
            SenderIdentity::new("no-reply@example.com", Some("Example, Inc.".into())).unwrap();
        assert_eq!(identity.mailbox(), "\"Example, Inc.\" <no-reply@example.com>");
    }

    #[test]
    fn non_ascii_display_name_is_encoded() {
        let identity =
            SenderIdentity::new("no-reply@example.com", Some("Zürich Billing".into())).unwrap();
        let mailbox = identity.mailbox();
        assert!(mailbox.starts_with("=?utf-8?B?"));
        assert!(mailbox.ends_with(" <no-reply@example.com>"));
    }

    #[test]
    fn empty_or_injected_display_names_are_cleaned() {
        let identity = SenderIdentity::new("no-reply@example.com", Some(String::new())).unwrap();
        assert_eq!(identity.display_name(), None);

        let identity =
            SenderIdentity::new("no-reply@example.com", Some("App\r\nBcc: x".into())).unwrap();
        assert_eq!(identity.display_name(), Some("App  Bcc: x"));
    }
}

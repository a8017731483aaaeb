//! Building the outgoing `multipart/alternative` message.

use chrono::{Local, Utc};
use noreply_mime::html::html_to_text;
use noreply_mime::{Headers, Message, Part};
use noreply_smtp::Address;
use uuid::Uuid;

use crate::config::SenderIdentity;
use crate::error::ValidationError;

/// A fully-built message, ready to be handed to a transport.
///
/// `Date` and `Message-ID` are fixed when the message is composed, so every
/// delivery attempt of the same message carries the same identity.
#[derive(Debug, Clone)]
pub struct ComposedMessage {
    subject: String,
    from: SenderIdentity,
    to: Vec<String>,
    text_part: String,
    html_part: String,
    message: Message,
    wire: String,
}

impl ComposedMessage {
    /// Returns the subject as given to [`compose`].
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns the sender.
    #[must_use]
    pub const fn from(&self) -> &SenderIdentity {
        &self.from
    }

    /// Returns the recipients in the order they were given.
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.message.headers
    }

    /// Returns the plain-text body.
    #[must_use]
    pub fn text_part(&self) -> &str {
        &self.text_part
    }

    /// Returns the HTML body.
    #[must_use]
    pub fn html_part(&self) -> &str {
        &self.html_part
    }

    /// Returns the `Message-ID` header value.
    #[must_use]
    pub fn message_id(&self) -> &str {
        self.message.message_id().unwrap_or_default()
    }

    /// Returns the message in RFC 5322 wire format with CRLF line endings.
    #[must_use]
    pub fn to_rfc5322(&self) -> &str {
        &self.wire
    }
}

/// Composes a no-reply message.
///
/// When `plain_body` is absent or empty, the plain-text part is derived from
/// `html_body`. The result carries the headers that mark it as automated
/// mail (`Auto-Submitted`, `X-Auto-Response-Suppress`, `Precedence`) and
/// points `Reply-To` and `Return-Path` at the sender.
///
/// # Errors
///
/// Returns [`ValidationError::NoRecipients`] if `to` is empty,
/// [`ValidationError::InvalidRecipient`] if a recipient is not a bare
/// address, and [`ValidationError::Encoding`] if the message cannot be
/// rendered.
pub fn compose(
    identity: &SenderIdentity,
    to: &[String],
    subject: &str,
    html_body: &str,
    plain_body: Option<&str>,
) -> Result<ComposedMessage, ValidationError> {
    if to.is_empty() {
        return Err(ValidationError::NoRecipients);
    }

    for recipient in to {
        Address::new(recipient.as_str()).map_err(|e| ValidationError::InvalidRecipient {
            address: recipient.clone(),
            reason: e.to_string(),
        })?;
    }

    let text_part = match plain_body {
        Some(plain) if !plain.is_empty() => plain.to_string(),
        _ => html_to_text(html_body),
    };

    let subject_line = subject.replace(['\r', '\n'], " ");

    let mut headers = Headers::new();
    headers.add("From", identity.mailbox());
    headers.add("To", to.join(", "));
    headers.add("Subject", Headers::encode_value(&subject_line));
    headers.add("Date", Local::now().to_rfc2822());
    headers.add("Message-ID", message_id(identity.domain()));
    headers.add("Reply-To", identity.address());
    headers.add("Auto-Submitted", "auto-generated");
    headers.add("X-Auto-Response-Suppress", "All");
    headers.add("Precedence", "bulk");
    headers.add("Return-Path", identity.address());

    let boundary = format!("=_noreply_{}", Uuid::new_v4().simple());
    let message = Message::alternative(
        headers,
        &boundary,
        Part::text_plain(&text_part),
        Part::text_html(html_body),
    );
    let wire = message
        .render()
        .map_err(|e| ValidationError::Encoding(e.to_string()))?;

    Ok(ComposedMessage {
        subject: subject.to_string(),
        from: identity.clone(),
        to: to.to_vec(),
        text_part,
        html_part: html_body.to_string(),
        message,
        wire,
    })
}

fn message_id(domain: &str) -> String {
    let timestamp = Utc::now().timestamp_micros();
    let unique = Uuid::new_v4().simple();
    format!("<{timestamp}.{unique}@{domain}>")
}

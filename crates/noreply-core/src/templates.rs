//! Notification templates.
//!
//! Each [`Notification`] renders to a subject, an HTML body and a plain-text
//! body. User-supplied values are escaped in the HTML body only.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::mailer::OutgoingEmail;
use crate::users::User;

/// Closing lines shared by every template.
const SIGNATURE_HTML: &str = "<p>Best regards,<br>The Team</p>";
const SIGNATURE_TEXT: &str = "Best regards,\nThe Team";

/// An application event that triggers an email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// Registration completed.
    Welcome,
    /// A payment was received.
    PaymentConfirmation {
        /// Amount paid, in the account currency.
        amount: f64,
        /// Date of the payment, shown as given.
        payment_date: String,
    },
    /// An expected payment did not arrive.
    PaymentFailed {
        /// Date the payment was due, shown as given.
        due_date: String,
    },
    /// The subscription was frozen for unresolved payment issues.
    SubscriptionFrozen,
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Plain-text body.
    pub plain: String,
}

impl RenderedEmail {
    /// Turns the rendered notification into an email for one recipient.
    #[must_use]
    pub fn into_email(self, to: impl Into<String>) -> OutgoingEmail {
        OutgoingEmail::new(self.subject, self.html)
            .to(to)
            .plain_body(self.plain)
    }
}

impl Notification {
    /// Returns the stable name used in logs and the delivery log.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::PaymentConfirmation { .. } => "payment_confirmation",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::SubscriptionFrozen => "subscription_frozen",
        }
    }

    /// Returns the subject line.
    #[must_use]
    pub const fn subject(&self) -> &'static str {
        match self {
            Self::Welcome => "Welcome to Our Platform",
            Self::PaymentConfirmation { .. } => "Payment Confirmation",
            Self::PaymentFailed { .. } => "Payment Not Received",
            Self::SubscriptionFrozen => "Subscription Frozen",
        }
    }

    /// Renders the notification for a user.
    #[must_use]
    pub fn render(&self, user: &User) -> RenderedEmail {
        let name = user.name.as_str();
        let (heading, paragraphs) = match self {
            Self::Welcome => (
                format!("Welcome, {name}!"),
                vec![
                    "Your registration was successful. Your account is now active and you have full access to our platform.".to_string(),
                    "If you have any questions, please contact our support team.".to_string(),
                ],
            ),
            Self::PaymentConfirmation {
                amount,
                payment_date,
            } => (
                "Payment Received".to_string(),
                vec![
                    format!("Dear {name},"),
                    format!("We have received your payment of ${amount:.2} on {payment_date}."),
                    "Your subscription remains active. Thank you for your continued trust.".to_string(),
                ],
            ),
            Self::PaymentFailed { due_date } => (
                "Payment Not Received".to_string(),
                vec![
                    format!("Dear {name},"),
                    format!("We were unable to process your recent payment due on {due_date}."),
                    "Please check your payment method. If unresolved, your service may be impacted.".to_string(),
                    "To avoid interruption, please update your payment information at your earliest convenience.".to_string(),
                ],
            ),
            Self::SubscriptionFrozen => (
                "Subscription Frozen".to_string(),
                vec![
                    format!("Dear {name},"),
                    "Your subscription has been temporarily frozen due to unresolved payment issues.".to_string(),
                    "Some platform features are currently limited. Once payment is resolved, your subscription will be fully reactivated.".to_string(),
                    "If you need assistance, please contact support.".to_string(),
                ],
            ),
        };

        RenderedEmail {
            subject: self.subject().to_string(),
            html: render_html(&heading, &paragraphs),
            plain: render_plain(&heading, &paragraphs),
        }
    }
}

fn render_html(heading: &str, paragraphs: &[String]) -> String {
    let mut html = String::from("<html><body>\n");
    let _ = writeln!(html, "<h2>{}</h2>", escape_html(heading));
    for paragraph in paragraphs {
        let _ = writeln!(html, "<p>{}</p>", escape_html(paragraph));
    }
    html.push_str(SIGNATURE_HTML);
    html.push_str("\n</body></html>\n");
    html
}

fn render_plain(heading: &str, paragraphs: &[String]) -> String {
    let mut plain = format!("{heading}\n\n");
    for paragraph in paragraphs {
        plain.push_str(paragraph);
        plain.push_str("\n\n");
    }
    plain.push_str(SIGNATURE_TEXT);
    plain.push('\n');
    plain
}

/// Escapes text for use in HTML element content and attribute values.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

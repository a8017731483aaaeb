//! # noreply-mime
//!
//! MIME building blocks for outgoing transactional email.
//!
//! ## Features
//!
//! - **Headers**: Ordered, case-insensitive header collection with folding
//! - **Content types**: `text/plain`, `text/html`, `multipart/alternative`
//! - **Encoding/Decoding**: Base64, Quoted-Printable, RFC 2047 header encoding
//! - **Multipart**: Render and read back `multipart/alternative` messages
//! - **HTML to text**: Plain-text fallback bodies derived from HTML
//!
//! ## Quick Start
//!
//! ### Building a multipart/alternative message
//!
//! ```ignore
//! use noreply_mime::{Headers, Message, Part};
//!
//! let mut headers = Headers::new();
//! headers.add("From", "no-reply@example.com");
//! headers.add("To", "user@example.com");
//! headers.add("Subject", "Welcome");
//!
//! let message = Message::alternative(
//!     headers,
//!     "boundary-1234",
//!     Part::text_plain("Hello!"),
//!     Part::text_html("<p>Hello!</p>"),
//! );
//!
//! let wire = message.render()?;
//! ```
//!
//! ### Plain-text fallback
//!
//! ```ignore
//! use noreply_mime::html::html_to_text;
//!
//! assert_eq!(html_to_text("<p>Hello&nbsp;<b>there</b></p>"), "Hello there");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;

pub mod encoding;
pub mod html;

pub use content_type::ContentType;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};

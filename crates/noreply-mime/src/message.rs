//! MIME message structure and handling.

use crate::content_type::ContentType;
use crate::encoding::{decode_base64, decode_quoted_printable, encode_quoted_printable};
use crate::error::{Error, Result};
use crate::header::Headers;
use std::fmt;
use std::fmt::Write as _;

/// Longest line allowed in a 7bit body (RFC 5322 §2.1.1).
const MAX_7BIT_LINE: usize = 998;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }

    /// Picks the encoding used for an outgoing text body.
    #[must_use]
    pub fn for_text(text: &str) -> Self {
        if text.is_ascii() && text.lines().all(|line| line.len() <= MAX_7BIT_LINE) {
            Self::SevenBit
        } else {
            Self::QuotedPrintable
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// MIME message part.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Part body (encoded bytes as they appear on the wire).
    pub body: Vec<u8>,
}

impl Part {
    /// Creates a new part.
    #[must_use]
    pub const fn new(headers: Headers, body: Vec<u8>) -> Self {
        Self { headers, body }
    }

    /// Creates a text part, choosing 7bit or quoted-printable as needed.
    ///
    /// Line breaks are normalized first, so a lone `\r` ends a line like
    /// `\n` or `\r\n` does and never reaches the wire on its own.
    #[must_use]
    pub fn text(content_type: &ContentType, text: &str) -> Self {
        let text = normalize_line_breaks(text);
        let encoding = TransferEncoding::for_text(&text);
        let body = match encoding {
            TransferEncoding::QuotedPrintable => encode_quoted_printable(&text),
            _ => to_crlf(&text),
        };

        let mut headers = Headers::new();
        headers.add("Content-Type", content_type.to_string());
        headers.add("Content-Transfer-Encoding", encoding.to_string());
        Self::new(headers, body.into_bytes())
    }

    /// Creates a `text/plain; charset=utf-8` part.
    #[must_use]
    pub fn text_plain(text: &str) -> Self {
        Self::text(&ContentType::text_plain(), text)
    }

    /// Creates a `text/html; charset=utf-8` part.
    #[must_use]
    pub fn text_html(html: &str) -> Self {
        Self::text(&ContentType::text_html(), html)
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Gets the transfer encoding.
    #[must_use]
    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse)
    }

    /// Decodes the body according to the transfer encoding.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_body(&self) -> Result<Vec<u8>> {
        decode(&self.body, self.transfer_encoding())
    }

    /// Gets the decoded body as a string.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or UTF-8 conversion fails.
    pub fn body_text(&self) -> Result<String> {
        let decoded = self.decode_body()?;
        String::from_utf8(decoded).map_err(Into::into)
    }
}

/// MIME message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message headers.
    pub headers: Headers,
    /// Message parts (empty for single-part messages).
    pub parts: Vec<Part>,
    /// Body for single-part messages.
    pub body: Option<Vec<u8>>,
}

impl Message {
    /// Creates a single-part message.
    #[must_use]
    pub const fn single_part(headers: Headers, body: Vec<u8>) -> Self {
        Self {
            headers,
            parts: Vec::new(),
            body: Some(body),
        }
    }

    /// Creates a multipart message.
    #[must_use]
    pub const fn multipart(headers: Headers, parts: Vec<Part>) -> Self {
        Self {
            headers,
            parts,
            body: None,
        }
    }

    /// Creates a `multipart/alternative` message.
    ///
    /// The plain-text part comes first so that clients prefer the HTML part.
    #[must_use]
    pub fn alternative(mut headers: Headers, boundary: &str, text: Part, html: Part) -> Self {
        headers.set("MIME-Version", "1.0");
        headers.set(
            "Content-Type",
            ContentType::multipart_alternative(boundary).to_string(),
        );
        Self::multipart(headers, vec![text, html])
    }

    /// Gets the content type.
    ///
    /// # Errors
    ///
    /// Returns an error if content type header is invalid.
    pub fn content_type(&self) -> Result<ContentType> {
        self.headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)
    }

    /// Checks if this is a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if content type cannot be determined.
    pub fn is_multipart(&self) -> Result<bool> {
        Ok(self.content_type()?.is_multipart())
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers.get("to")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers.get("subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers.get("message-id")
    }

    /// Gets the body as text for single-part messages.
    ///
    /// # Errors
    ///
    /// Returns an error if this is a multipart message or decoding fails.
    pub fn body_text(&self) -> Result<String> {
        if !self.parts.is_empty() {
            return Err(Error::InvalidMultipart(
                "Use parts for multipart messages".to_string(),
            ));
        }

        let body = self
            .body
            .as_ref()
            .ok_or_else(|| Error::Parse("No body".to_string()))?;

        let transfer_encoding = self
            .headers
            .get("content-transfer-encoding")
            .map_or(TransferEncoding::SevenBit, TransferEncoding::parse);

        String::from_utf8(decode(body, transfer_encoding)?).map_err(Into::into)
    }

    /// Finds the first text/plain part in a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if no text part is found or decoding fails.
    pub fn text_part(&self) -> Result<String> {
        self.find_part("text", "plain")?.body_text()
    }

    /// Finds the first text/html part in a multipart message.
    ///
    /// # Errors
    ///
    /// Returns an error if no HTML part is found or decoding fails.
    pub fn html_part(&self) -> Result<String> {
        self.find_part("text", "html")?.body_text()
    }

    fn find_part(&self, main_type: &str, sub_type: &str) -> Result<&Part> {
        for part in &self.parts {
            if part.content_type()?.is(main_type, sub_type) {
                return Ok(part);
            }
        }

        Err(Error::Parse(format!(
            "No {main_type}/{sub_type} part found"
        )))
    }

    /// Renders the message in RFC 5322 wire format with CRLF line endings.
    ///
    /// # Errors
    ///
    /// Returns an error if a multipart message has no boundary.
    pub fn render(&self) -> Result<String> {
        let mut out = self.headers.to_string();
        out.push_str("\r\n");

        if self.parts.is_empty() {
            if let Some(body) = &self.body {
                out.push_str(&String::from_utf8_lossy(body));
            }
            return Ok(out);
        }

        let content_type = self.content_type()?;
        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;

        for part in &self.parts {
            let _ = write!(out, "--{boundary}\r\n{}\r\n", part.headers);
            out.push_str(&String::from_utf8_lossy(&part.body));
            out.push_str("\r\n");
        }
        let _ = write!(out, "--{boundary}--\r\n");

        Ok(out)
    }

    /// Parses a message, splitting multipart bodies into parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is invalid or a multipart body
    /// is missing its boundary or closing delimiter.
    pub fn parse(raw: &str) -> Result<Self> {
        let (head, body) = split_head_body(raw);
        let headers = Headers::parse(head);

        let content_type = headers
            .get("content-type")
            .map_or_else(|| Ok(ContentType::text_plain()), ContentType::parse)?;

        if !content_type.is_multipart() {
            return Ok(Self::single_part(headers, body.as_bytes().to_vec()));
        }

        let boundary = content_type.boundary().ok_or(Error::MissingBoundary)?;
        let delimiter = format!("--{boundary}");

        let mut parts = Vec::new();
        let mut closed = false;
        // The first section is the preamble
        for section in body.split(delimiter.as_str()).skip(1) {
            if section.starts_with("--") {
                closed = true;
                break;
            }

            let section = section
                .strip_prefix("\r\n")
                .or_else(|| section.strip_prefix('\n'))
                .unwrap_or(section);
            // The line break before a delimiter belongs to the delimiter
            let section = section
                .strip_suffix("\r\n")
                .or_else(|| section.strip_suffix('\n'))
                .unwrap_or(section);

            let (part_head, part_body) = split_head_body(section);
            parts.push(Part::new(
                Headers::parse(part_head),
                part_body.as_bytes().to_vec(),
            ));
        }

        if !closed {
            return Err(Error::InvalidMultipart(format!(
                "Missing closing delimiter {delimiter}--"
            )));
        }

        Ok(Self::multipart(headers, parts))
    }
}

/// Splits raw text at the first empty line.
fn split_head_body(text: &str) -> (&str, &str) {
    if let Some(i) = text.find("\r\n\r\n") {
        return (&text[..i + 2], &text[i + 4..]);
    }
    if let Some(i) = text.find("\n\n") {
        return (&text[..=i], &text[i + 2..]);
    }
    (text, "")
}

/// Rewrites `\r\n` and lone `\r` as `\n`.
fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn to_crlf(text: &str) -> String {
    normalize_line_breaks(text).replace('\n', "\r\n")
}

fn decode(body: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    let body_str = String::from_utf8_lossy(body);
    match encoding {
        TransferEncoding::Base64 => {
            // Remove whitespace for lenient parsing
            let cleaned: String = body_str.chars().filter(|c| !c.is_whitespace()).collect();
            decode_base64(&cleaned)
        }
        TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&body_str)?.into_bytes()),
        _ => Ok(body_str.replace("\r\n", "\n").into_bytes()),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    fn sample_headers() -> Headers {
        let mut headers = Headers::new();
        headers.add("From", "no-reply@example.com");
        headers.add("To", "recipient@example.com");
        headers.add("Subject", "Test");
        headers
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("Quoted-Printable"),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_transfer_encoding_for_text() {
        assert_eq!(TransferEncoding::for_text("Hi"), TransferEncoding::SevenBit);
        assert_eq!(
            TransferEncoding::for_text("Grüße"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::for_text(&"a".repeat(1200)),
            TransferEncoding::QuotedPrintable
        );
    }

    #[test]
    fn test_text_part_headers() {
        let part = Part::text_html("<b>Hi</b>");
        assert_eq!(
            part.headers.get("Content-Type"),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(part.headers.get("Content-Transfer-Encoding"), Some("7bit"));
        assert_eq!(part.body_text().unwrap(), "<b>Hi</b>");
    }

    #[test]
    fn test_text_part_lone_cr_becomes_crlf() {
        let part = Part::text_plain("line1\rline2\r\nline3\nend");
        assert_eq!(part.transfer_encoding(), TransferEncoding::SevenBit);
        assert_eq!(part.body, b"line1\r\nline2\r\nline3\r\nend");

        let part = Part::text_plain("Grüße\rzwei");
        assert_eq!(part.transfer_encoding(), TransferEncoding::QuotedPrintable);
        assert_eq!(part.body, b"Gr=C3=BC=C3=9Fe\r\nzwei");
    }

    #[test]
    fn test_text_part_non_ascii_is_quoted_printable() {
        let part = Part::text_plain("Grüße");
        assert_eq!(part.transfer_encoding(), TransferEncoding::QuotedPrintable);
        assert_eq!(part.body, b"Gr=C3=BC=C3=9Fe");
        assert_eq!(part.body_text().unwrap(), "Grüße");
    }

    #[test]
    fn test_single_part_body_text() {
        let message = Message::single_part(sample_headers(), b"Hello, World!".to_vec());
        assert_eq!(message.subject(), Some("Test"));
        assert_eq!(message.body_text().unwrap(), "Hello, World!");
        assert!(!message.is_multipart().unwrap());
    }

    #[test]
    fn test_alternative_render_layout() {
        let message = Message::alternative(
            sample_headers(),
            "b-123",
            Part::text_plain("Hi"),
            Part::text_html("<b>Hi</b>"),
        );
        let rendered = message.render().unwrap();

        assert!(rendered.starts_with("From: no-reply@example.com\r\n"));
        assert!(rendered.contains("MIME-Version: 1.0\r\n"));
        assert!(rendered.contains("Content-Type: multipart/alternative; boundary=b-123\r\n"));

        let plain_at = rendered.find("text/plain").unwrap();
        let html_at = rendered.find("text/html").unwrap();
        assert!(plain_at < html_at);
        assert!(rendered.ends_with("--b-123--\r\n"));
    }

    #[test]
    fn test_render_then_parse_parts() {
        let message = Message::alternative(
            sample_headers(),
            "b-456",
            Part::text_plain("Line one\nLine two"),
            Part::text_html("<p>Grüße</p>"),
        );
        let parsed = Message::parse(&message.render().unwrap()).unwrap();

        assert!(parsed.is_multipart().unwrap());
        assert_eq!(parsed.parts.len(), 2);
        assert_eq!(parsed.to(), Some("recipient@example.com"));
        assert_eq!(parsed.text_part().unwrap(), "Line one\nLine two");
        assert_eq!(parsed.html_part().unwrap(), "<p>Grüße</p>");
    }

    #[test]
    fn test_parse_missing_closing_delimiter() {
        let raw = "Content-Type: multipart/alternative; boundary=x\r\n\r\n--x\r\nContent-Type: text/plain\r\n\r\nHi\r\n";
        assert!(matches!(
            Message::parse(raw),
            Err(Error::InvalidMultipart(_))
        ));
    }

    #[test]
    fn test_render_multipart_without_boundary() {
        let message = Message::multipart(Headers::new(), vec![Part::text_plain("Hi")]);
        assert!(message.render().is_err());
    }
}

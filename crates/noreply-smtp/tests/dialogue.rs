//! Integration tests for the SMTP client.
//!
//! A scripted stream plays the server side of each session and records
//! everything the client writes.

#![allow(clippy::unwrap_used)]

use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use noreply_smtp::{Address, AuthMechanism, Client, Error, TlsUpgrade};

/// Mock stream that returns predefined replies one line per read.
struct ScriptedStream {
    replies: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
    upgraded: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// Handles the test keeps after the client takes the stream.
struct Probe {
    sent: Arc<Mutex<Vec<u8>>>,
    upgraded: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl Probe {
    fn transcript(&self) -> String {
        String::from_utf8(self.sent.lock().unwrap().clone()).unwrap()
    }

    fn upgraded(&self) -> bool {
        self.upgraded.load(Ordering::SeqCst)
    }

    fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn scripted(replies: &str) -> (ScriptedStream, Probe) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let upgraded = Arc::new(AtomicBool::new(false));
    let closed = Arc::new(AtomicBool::new(false));
    let stream = ScriptedStream {
        replies: Cursor::new(replies.as_bytes().to_vec()),
        sent: Arc::clone(&sent),
        upgraded: Arc::clone(&upgraded),
        closed: Arc::clone(&closed),
    };
    (
        stream,
        Probe {
            sent,
            upgraded,
            closed,
        },
    )
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pos = usize::try_from(self.replies.position()).unwrap();
        let data = self.replies.get_ref();
        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }

        // Never hand out more than one line, so nothing is buffered across STARTTLS
        let remaining = &data[pos..];
        let line_len = remaining
            .iter()
            .position(|&b| b == b'\n')
            .map_or(remaining.len(), |i| i + 1);
        let to_read = line_len.min(buf.remaining());
        buf.put_slice(&remaining[..to_read]);
        self.replies.set_position((pos + to_read) as u64);

        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl TlsUpgrade for ScriptedStream {
    async fn upgrade_to_tls(self, _hostname: &str) -> noreply_smtp::Result<Self> {
        self.upgraded.store(true, Ordering::SeqCst);
        Ok(self)
    }
}

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

#[tokio::test]
async fn full_session_with_auth_plain() {
    let (stream, probe) = scripted(concat!(
        "220 mx.example.com ESMTP ready\r\n",
        "250-mx.example.com\r\n",
        "250-PIPELINING\r\n",
        "250 AUTH PLAIN LOGIN\r\n",
        "235 2.7.0 Authentication successful\r\n",
        "250 2.1.0 Ok\r\n",
        "250 2.1.5 Ok\r\n",
        "250 2.1.5 Ok\r\n",
        "354 End data with <CR><LF>.<CR><LF>\r\n",
        "250 2.0.0 Ok: queued as 12345\r\n",
        "221 2.0.0 Bye\r\n",
    ));

    let client = Client::from_stream(stream).await.unwrap();
    let client = client.ehlo("localhost").await.unwrap();
    assert_eq!(
        client.server_info().auth_mechanisms(),
        vec![AuthMechanism::Plain, AuthMechanism::Login]
    );

    let client = client.auth_plain("user", "secret").await.unwrap();
    let client = client
        .mail_from(addr("no-reply@example.com"), None)
        .await
        .unwrap();
    let client = client.rcpt_to(addr("a@example.com")).await.unwrap();
    let client = client.rcpt_to(addr("b@example.com")).await.unwrap();
    let client = client.data().await.unwrap();
    let client = client
        .send_message(b"Subject: Hi\r\n\r\n.leading dot\r\nbye\r\n")
        .await
        .unwrap();
    client.quit().await.unwrap();

    assert_eq!(
        probe.transcript(),
        concat!(
            "EHLO localhost\r\n",
            "AUTH PLAIN AHVzZXIAc2VjcmV0\r\n",
            "MAIL FROM:<no-reply@example.com>\r\n",
            "RCPT TO:<a@example.com>\r\n",
            "RCPT TO:<b@example.com>\r\n",
            "DATA\r\n",
            "Subject: Hi\r\n\r\n..leading dot\r\nbye\r\n.\r\n",
            "QUIT\r\n",
        )
    );
    assert!(probe.closed());
}

#[tokio::test]
async fn auth_login_answers_both_challenges() {
    let (stream, probe) = scripted(concat!(
        "220 mx.example.com ESMTP\r\n",
        "250-mx.example.com\r\n",
        "250 AUTH LOGIN\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 Authentication successful\r\n",
    ));

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    client.auth_login("user", "secret").await.unwrap();

    assert_eq!(
        probe.transcript(),
        "EHLO localhost\r\nAUTH LOGIN\r\ndXNlcg==\r\nc2VjcmV0\r\n"
    );
}

#[tokio::test]
async fn rejected_credentials_drop_the_session() {
    let (stream, probe) = scripted(concat!(
        "220 mx.example.com ESMTP\r\n",
        "250-mx.example.com\r\n",
        "250 AUTH PLAIN\r\n",
        "535 5.7.8 Authentication credentials invalid\r\n",
    ));

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    let err = client.auth_plain("user", "wrong").await.unwrap_err();

    assert!(matches!(err, Error::SmtpError { code: 535, .. }));
    assert!(probe.closed());
}

#[tokio::test]
async fn starttls_upgrades_then_repeats_ehlo() {
    let (stream, probe) = scripted(concat!(
        "220 mx.example.com ESMTP\r\n",
        "250-mx.example.com\r\n",
        "250 STARTTLS\r\n",
        "220 2.0.0 Ready to start TLS\r\n",
        "250-mx.example.com\r\n",
        "250 AUTH PLAIN\r\n",
    ));

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    assert!(!client.server_info().supports_auth());

    let client = client.starttls("mx.example.com").await.unwrap();
    assert!(probe.upgraded());
    assert!(!client.server_info().supports_starttls());
    assert_eq!(
        client.server_info().auth_mechanisms(),
        vec![AuthMechanism::Plain]
    );
    assert_eq!(
        probe.transcript(),
        "EHLO localhost\r\nSTARTTLS\r\nEHLO localhost\r\n"
    );
}

#[tokio::test]
async fn starttls_requires_the_extension() {
    let (stream, probe) = scripted(concat!(
        "220 mx.example.com ESMTP\r\n",
        "250 mx.example.com\r\n",
    ));

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    let err = client.starttls("mx.example.com").await.unwrap_err();

    assert!(matches!(err, Error::NotSupported(_)));
    assert!(!probe.upgraded());
    assert_eq!(probe.transcript(), "EHLO localhost\r\n");
}

#[tokio::test]
async fn rejected_recipient_surfaces_reply() {
    let (stream, probe) = scripted(concat!(
        "220 mx.example.com ESMTP\r\n",
        "250 mx.example.com\r\n",
        "250 Ok\r\n",
        "550 5.1.1 <nobody@example.com>: Recipient address rejected\r\n",
    ));

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    let client = client
        .mail_from(addr("no-reply@example.com"), None)
        .await
        .unwrap();
    let err = client.rcpt_to(addr("nobody@example.com")).await.unwrap_err();

    assert!(err.is_permanent());
    assert!(err.to_string().contains("Recipient address rejected"));
    assert!(probe.closed());
}

#[tokio::test]
async fn server_hangup_mid_session_is_reported() {
    let (stream, _probe) = scripted(concat!(
        "220 mx.example.com ESMTP\r\n",
        "250 mx.example.com\r\n",
    ));

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    let err = client
        .mail_from(addr("no-reply@example.com"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionClosed));
}

#[tokio::test]
async fn size_parameter_sent_when_advertised() {
    let (stream, probe) = scripted(concat!(
        "220 mx.example.com ESMTP\r\n",
        "250-mx.example.com\r\n",
        "250 SIZE 10240000\r\n",
        "250 Ok\r\n",
    ));

    let client = Client::from_stream(stream)
        .await
        .unwrap()
        .ehlo("localhost")
        .await
        .unwrap();
    client
        .mail_from(addr("no-reply@example.com"), Some(2048))
        .await
        .unwrap();

    assert_eq!(
        probe.transcript(),
        "EHLO localhost\r\nMAIL FROM:<no-reply@example.com> SIZE=2048\r\n"
    );
}

//! Scripted SMTP server for integration tests.
//!
//! Each [`ScriptedStream`] replays one session's worth of server replies and
//! records what the client wrote. [`ScriptedConnector`] hands out one stream
//! per connection attempt.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use noreply_core::{Connector, SenderIdentity, TransportConfig};
use noreply_smtp::TlsUpgrade;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Replies of a server that accepts one message without authentication.
pub const ACCEPTING_SERVER: &str = concat!(
    "220 mx.test.local ESMTP\r\n",
    "250-mx.test.local\r\n",
    "250 8BITMIME\r\n",
    "250 2.1.0 Ok\r\n",
    "250 2.1.5 Ok\r\n",
    "354 End data with <CR><LF>.<CR><LF>\r\n",
    "250 2.0.0 Ok: queued\r\n",
    "221 2.0.0 Bye\r\n",
);

pub struct ScriptedStream {
    replies: Cursor<Vec<u8>>,
    stall: bool,
    probe: Probe,
}

/// Handles the test keeps after the transport takes the stream.
#[derive(Clone, Default)]
pub struct Probe {
    sent: Arc<Mutex<Vec<u8>>>,
    upgraded: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl Probe {
    pub fn transcript(&self) -> String {
        String::from_utf8(self.sent.lock().unwrap().clone()).unwrap()
    }

    /// Lines the client sent, with the DATA payload left out.
    pub fn commands(&self) -> Vec<String> {
        let transcript = self.transcript();
        let mut commands = Vec::new();
        let mut in_data = false;
        for line in transcript.split("\r\n").filter(|l| !l.is_empty()) {
            if in_data {
                in_data = line != ".";
                continue;
            }
            in_data = line == "DATA";
            commands.push(line.to_string());
        }
        commands
    }

    pub fn upgraded(&self) -> bool {
        self.upgraded.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ScriptedStream {
    pub fn new(replies: &str) -> (Self, Probe) {
        let probe = Probe::default();
        let stream = Self {
            replies: Cursor::new(replies.as_bytes().to_vec()),
            stall: false,
            probe: probe.clone(),
        };
        (stream, probe)
    }

    /// A stream that never answers once its replies run out.
    pub fn stalling(replies: &str) -> (Self, Probe) {
        let (mut stream, probe) = Self::new(replies);
        stream.stall = true;
        (stream, probe)
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
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
            if self.stall {
                return Poll::Pending;
            }
            return Poll::Ready(Ok(()));
        }

        // One line per read, so nothing is buffered across STARTTLS
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
        self.probe.sent.lock().unwrap().extend_from_slice(buf);
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
        self.probe.upgraded.store(true, Ordering::SeqCst);
        Ok(self)
    }
}

/// Hands out scripted streams in order; refuses connections once they run out.
#[derive(Default)]
pub struct ScriptedConnector {
    sessions: Mutex<VecDeque<ScriptedStream>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(sessions: impl IntoIterator<Item = ScriptedStream>) -> Self {
        Self {
            sessions: Mutex::new(sessions.into_iter().collect()),
            connects: AtomicUsize::new(0),
        }
    }

    pub fn single(replies: &str) -> (Self, Probe) {
        let (stream, probe) = ScriptedStream::new(replies);
        (Self::new([stream]), probe)
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;

    async fn connect(&self, _config: &TransportConfig) -> noreply_smtp::Result<ScriptedStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.sessions.lock().unwrap().pop_front().ok_or_else(|| {
            noreply_smtp::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        })
    }
}

pub fn identity() -> SenderIdentity {
    SenderIdentity::new("no-reply@test.local", Some("Test App".into())).unwrap()
}

pub fn config() -> TransportConfig {
    TransportConfig::new("mx.test.local", 25).unwrap()
}

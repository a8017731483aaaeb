//! Type-state SMTP client.

use super::{ServerInfo, TlsUpgrade};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::marker::PhantomData;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Type-state marker for connected state.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for authenticated state.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker for recipient added.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
///
/// Generic over the underlying stream so the same state machine runs over
/// [`SmtpStream`](super::SmtpStream) and in-memory test streams. Dropping a
/// client in any state closes its stream.
pub struct Client<S, State> {
    stream: BufReader<S>,
    server_info: ServerInfo,
    client_hostname: String,
    _state: PhantomData<State>,
}

impl<S, State> fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("server_info", &self.server_info)
            .field("client_hostname", &self.client_hostname)
            .field("state", &std::any::type_name::<State>())
            .finish_non_exhaustive()
    }
}

impl<S, State> Client<S, State> {
    /// Returns the server information.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    fn transition<Next>(self) -> Client<S, Next> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            client_hostname: self.client_hostname,
            _state: PhantomData,
        }
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut client = Self {
            stream: BufReader::new(stream),
            server_info: ServerInfo::default(),
            client_hostname: String::new(),
            _state: PhantomData,
        };

        let greeting = client.read_reply().await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(greeting.into_error());
        }

        // First word of the greeting text is the server's name
        client.server_info.hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        tracing::debug!(server = %client.server_info.hostname, "SMTP greeting received");
        Ok(client)
    }

    /// Sends EHLO and discovers server capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        client_hostname.clone_into(&mut self.client_hostname);
        self.refresh_extensions().await?;
        Ok(self)
    }

    /// Authenticates using the PLAIN mechanism with an initial response.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the credentials.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let credentials = format!("\0{username}\0{password}");
        self.execute(Command::Auth {
            mechanism: AuthMechanism::Plain,
            initial_response: Some(STANDARD.encode(credentials)),
        })
        .await?;

        Ok(self.transition())
    }

    /// Authenticates using the LOGIN mechanism.
    ///
    /// The username and password are each sent in answer to a 334 challenge.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange is out of order or the server rejects
    /// the credentials.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let challenge = self
            .send_command(&Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            })
            .await?;
        expect_challenge(challenge)?;

        let challenge = self
            .send_command(&Command::AuthResponse(STANDARD.encode(username)))
            .await?;
        expect_challenge(challenge)?;

        self.execute(Command::AuthResponse(STANDARD.encode(password)))
            .await?;

        Ok(self.transition())
    }

    /// Starts a mail transaction without authentication (if server allows).
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(
        self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<S, MailTransaction>> {
        self.start_transaction(from, size).await
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin + TlsUpgrade,
{
    /// Upgrades the connection to TLS using STARTTLS.
    ///
    /// The server certificate is verified against `server_name`. EHLO is
    /// repeated afterwards because capabilities may change under TLS.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not supported or if the upgrade fails.
    pub async fn starttls(mut self, server_name: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.execute(Command::StartTls).await?;

        // Anything buffered before the handshake is discarded
        let stream = self.stream.into_inner().upgrade_to_tls(server_name).await?;
        self.stream = BufReader::new(stream);
        tracing::debug!(server = server_name, "connection upgraded to TLS");

        self.refresh_extensions().await?;
        Ok(self)
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(
        self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<S, MailTransaction>> {
        self.start_transaction(from, size).await
    }
}

impl<S> Client<S, MailTransaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<S, RecipientAdded>> {
        self.execute(Command::RcptTo { to }).await?;
        Ok(self.transition())
    }
}

impl<S> Client<S, RecipientAdded>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        self.execute(Command::RcptTo { to }).await?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the DATA command fails.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        let reply = self.send_command(&Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(reply.into_error());
        }
        Ok(self.transition())
    }
}

impl<S> Client<S, Data>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed, and the terminating `.` line is added.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Connected>> {
        let payload = dot_stuff(message);
        self.write(&payload).await?;

        let reply = self.read_reply().await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }

        tracing::debug!(reply = %reply, "message accepted");
        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn start_transaction(
        mut self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<S, MailTransaction>> {
        let size = match (size, self.server_info.max_message_size()) {
            (Some(size), Some(limit)) if limit > 0 && size > limit => {
                return Err(Error::MessageTooLarge { size, limit });
            }
            // SIZE= is only valid when the server advertised the extension
            (Some(size), _) if self.server_info.supports_size() => Some(size),
            _ => None,
        };

        self.execute(Command::MailFrom { from, size }).await?;
        Ok(self.transition())
    }

    async fn refresh_extensions(&mut self) -> Result<()> {
        let reply = self
            .execute(Command::Ehlo {
                hostname: self.client_hostname.clone(),
            })
            .await?;

        // First line is the server greeting, the rest are extensions
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(String::as_str)
            .map(Extension::parse)
            .collect();
        Ok(())
    }

    /// Sends a command and requires a 2xx reply.
    async fn execute(&mut self, cmd: Command) -> Result<Reply> {
        let reply = self.send_command(&cmd).await?;
        if reply.is_success() {
            Ok(reply)
        } else {
            Err(reply.into_error())
        }
    }

    async fn send_command(&mut self, cmd: &Command) -> Result<Reply> {
        tracing::trace!(command = %cmd.redacted(), "C:");
        self.write(&cmd.serialize()).await?;
        self.read_reply().await
    }

    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_reply(&mut self) -> Result<Reply> {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if self.stream.read_line(&mut line).await? == 0 {
                return Err(Error::ConnectionClosed);
            }

            let line = line.trim_end().to_string();
            if line.is_empty() {
                continue;
            }

            let is_last = is_last_reply_line(&line);
            lines.push(line);
            if is_last {
                break;
            }
        }

        let reply = parse_reply(&lines)?;
        tracing::trace!(reply = %reply, "S:");
        Ok(reply)
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(&Command::Quit).await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        let _ = self.stream.get_mut().shutdown().await;
        Ok(())
    }
}

fn expect_challenge(reply: Reply) -> Result<()> {
    if reply.code == ReplyCode::AUTH_CONTINUE {
        Ok(())
    } else {
        Err(reply.into_error())
    }
}

/// Prepares a message for the DATA phase.
///
/// Every line ends in CRLF on the wire; `\n`, `\r\n` and a lone `\r` all
/// count as line breaks.
fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 64 + 8);
    let mut push_line = |line: &[u8]| {
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    };

    let mut start = 0;
    let mut i = 0;
    while i < message.len() {
        match message[i] {
            b'\r' | b'\n' => {
                push_line(&message[start..i]);
                if message[i] == b'\r' && message.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < message.len() {
        push_line(&message[start..]);
    }

    out.extend_from_slice(b".\r\n");
    out
}

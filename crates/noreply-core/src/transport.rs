//! One SMTP session per delivery.
//!
//! [`SmtpTransport`] drives the session through its steps (connect, optional
//! STARTTLS, optional login, envelope and data, QUIT) and maps the failing
//! step to a [`TransportError`] variant. It makes exactly one attempt;
//! retrying is the caller's concern.

use std::future::Future;

use noreply_smtp::{
    Address, AuthMechanism, Authenticated, Client, Connected, SmtpStream, TlsUpgrade,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::compose::ComposedMessage;
use crate::config::{Security, TransportConfig};
use crate::error::TransportError;

/// Hostname announced in EHLO unless overridden.
const DEFAULT_CLIENT_HOSTNAME: &str = "localhost";

/// Delivers a composed message.
pub trait Transport: Send + Sync {
    /// Makes a single delivery attempt.
    fn deliver(
        &self,
        message: &ComposedMessage,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Opens the byte stream an SMTP session runs over.
pub trait Connector: Send + Sync {
    /// Stream type produced by this connector.
    type Stream: AsyncRead + AsyncWrite + Unpin + TlsUpgrade + Send;

    /// Connects to the configured server.
    fn connect(
        &self,
        config: &TransportConfig,
    ) -> impl Future<Output = noreply_smtp::Result<Self::Stream>> + Send;
}

/// Connects over TCP, with implicit TLS when the configuration asks for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = SmtpStream;

    async fn connect(&self, config: &TransportConfig) -> noreply_smtp::Result<SmtpStream> {
        match config.security() {
            Security::Tls => noreply_smtp::connection::connect_tls(config.host(), config.port()).await,
            Security::StartTls | Security::None => {
                noreply_smtp::connection::connect(config.host(), config.port()).await
            }
        }
    }
}

/// SMTP transport for a single endpoint.
#[derive(Debug, Clone)]
pub struct SmtpTransport<C = TcpConnector> {
    config: TransportConfig,
    connector: C,
    client_hostname: String,
}

impl SmtpTransport {
    /// Creates a transport that connects over TCP.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }
}

impl<C: Connector> SmtpTransport<C> {
    /// Creates a transport that opens its streams through `connector`.
    #[must_use]
    pub fn with_connector(config: TransportConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            client_hostname: DEFAULT_CLIENT_HOSTNAME.to_string(),
        }
    }

    /// Sets the hostname announced in EHLO.
    #[must_use]
    pub fn with_client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }

    /// Returns the endpoint configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the connector.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    async fn session(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        let config = &self.config;
        tracing::debug!(
            host = config.host(),
            port = config.port(),
            security = config.security().display_name(),
            "Opening SMTP session"
        );

        // Connect
        let stream = self
            .connector
            .connect(config)
            .await
            .map_err(TransportError::Connection)?;
        let client = Client::from_stream(stream)
            .await
            .map_err(TransportError::Connection)?
            .ehlo(&self.client_hostname)
            .await
            .map_err(TransportError::Connection)?;

        // Upgrade
        let client = if config.security() == Security::StartTls {
            client
                .starttls(config.host())
                .await
                .map_err(TransportError::Upgrade)?
        } else {
            client
        };

        // Authenticate and open the envelope
        let from = Address::new(message.from().address()).map_err(TransportError::Transmission)?;
        let size = Some(message.to_rfc5322().len());
        let client = match config.credentials() {
            Some((username, password)) => {
                authenticate(client, username, password)
                    .await
                    .map_err(TransportError::Authentication)?
                    .mail_from(from, size)
                    .await
            }
            None => client.mail_from(from, size).await,
        }
        .map_err(TransportError::Transmission)?;

        // Transmit
        let (first, rest) = message.to().split_first().ok_or_else(|| {
            TransportError::Transmission(noreply_smtp::Error::Protocol(
                "message has no recipients".into(),
            ))
        })?;
        let mut client = client
            .rcpt_to(recipient(first)?)
            .await
            .map_err(TransportError::Transmission)?;
        for to in rest {
            client = client
                .rcpt_to(recipient(to)?)
                .await
                .map_err(TransportError::Transmission)?;
        }
        let client = client
            .data()
            .await
            .map_err(TransportError::Transmission)?
            .send_message(message.to_rfc5322().as_bytes())
            .await
            .map_err(TransportError::Transmission)?;

        // The server has accepted the message at this point
        if let Err(e) = client.quit().await {
            tracing::warn!(error = %e, "QUIT failed after message was accepted");
        }

        Ok(())
    }
}

impl<C: Connector> Transport for SmtpTransport<C> {
    async fn deliver(&self, message: &ComposedMessage) -> Result<(), TransportError> {
        let limit = self.config.timeout();
        tokio::time::timeout(limit, self.session(message))
            .await
            .map_err(|_| TransportError::Timeout(limit))?
    }
}

/// Logs in with PLAIN, or with LOGIN when the server offers LOGIN but not PLAIN.
async fn authenticate<S>(
    client: Client<S, Connected>,
    username: &str,
    password: &str,
) -> noreply_smtp::Result<Client<S, Authenticated>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let info = client.server_info();
    if !info.supports_auth() {
        return Err(noreply_smtp::Error::NotSupported("AUTH".into()));
    }

    let mechanisms = info.auth_mechanisms();
    if mechanisms.contains(&AuthMechanism::Plain) {
        client.auth_plain(username, password).await
    } else if mechanisms.contains(&AuthMechanism::Login) {
        client.auth_login(username, password).await
    } else {
        Err(noreply_smtp::Error::NotSupported("AUTH PLAIN or LOGIN".into()))
    }
}

fn recipient(to: &str) -> Result<Address, TransportError> {
    Address::new(to).map_err(TransportError::Transmission)
}

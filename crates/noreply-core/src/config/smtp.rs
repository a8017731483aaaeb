//! SMTP endpoint configuration.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigurationError;

/// Default bound on one SMTP session, connect to QUIT.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Encryption mode of an SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// No encryption.
    None,
    /// Implicit TLS (connect directly with TLS).
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    /// Get display name for the security mode.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "None (insecure)",
            Self::Tls => "SSL/TLS",
            Self::StartTls => "STARTTLS",
        }
    }
}

/// Connection settings for the single SMTP endpoint.
///
/// Immutable once built. `use_ssl` takes precedence over `use_tls`.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportConfig {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    use_tls: bool,
    use_ssl: bool,
    timeout: Duration,
}

impl TransportConfig {
    /// Creates a plaintext configuration for `host:port`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the host is empty or the port is 0.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ConfigurationError> {
        let host = host.into();
        let host = host.trim();
        if host.is_empty() {
            return Err(ConfigurationError::Missing("SMTP_HOST"));
        }
        if port == 0 {
            return Err(ConfigurationError::Invalid {
                name: "SMTP_PORT",
                reason: "port must be 1-65535".into(),
            });
        }

        Ok(Self {
            host: host.to_string(),
            port,
            username: None,
            password: None,
            use_tls: false,
            use_ssl: false,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Sets login credentials. Empty values count as absent.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        self.username = username.filter(|u| !u.is_empty());
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    /// Enables the STARTTLS upgrade.
    #[must_use]
    pub const fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// Enables implicit TLS for the whole session.
    #[must_use]
    pub const fn with_ssl(mut self, use_ssl: bool) -> Self {
        self.use_ssl = use_ssl;
        self
    }

    /// Bounds the duration of one session.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the server hostname.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the server port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Returns the session timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the username, if set.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Returns true if STARTTLS was requested.
    #[must_use]
    pub const fn use_tls(&self) -> bool {
        self.use_tls
    }

    /// Returns true if implicit TLS was requested.
    #[must_use]
    pub const fn use_ssl(&self) -> bool {
        self.use_ssl
    }

    /// Derives the effective encryption mode.
    #[must_use]
    pub const fn security(&self) -> Security {
        if self.use_ssl {
            Security::Tls
        } else if self.use_tls {
            Security::StartTls
        } else {
            Security::None
        }
    }

    /// Returns the credentials when both username and password are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.username.as_deref().zip(self.password.as_deref())
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("use_tls", &self.use_tls)
            .field("use_ssl", &self.use_ssl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

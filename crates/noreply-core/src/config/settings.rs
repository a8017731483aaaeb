//! Raw mailer settings from the environment or a JSON file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{SenderIdentity, TransportConfig};
use crate::error::ConfigurationError;
use crate::mailer::RetryPolicy;

/// Unvalidated mailer settings.
///
/// Field names follow the environment variables they are read from
/// (`SMTP_HOST` becomes `smtp_host`). Call [`MailerSettings::validate`] to
/// obtain the typed configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailerSettings {
    /// SMTP server hostname.
    pub smtp_host: Option<String>,
    /// SMTP server port.
    pub smtp_port: Option<u16>,
    /// Login username.
    pub smtp_username: Option<String>,
    /// Login password.
    #[serde(skip_serializing)]
    pub smtp_password: Option<String>,
    /// Upgrade the session with STARTTLS.
    pub smtp_use_tls: bool,
    /// Wrap the whole session in TLS.
    pub smtp_use_ssl: bool,
    /// Sender address; must start with `no-reply`.
    pub from_email: Option<String>,
    /// Sender display name.
    pub from_name: Option<String>,
    /// Attempts per send, including the first.
    pub max_retries: Option<u32>,
    /// Base backoff in seconds, multiplied by the attempt number.
    pub backoff_seconds: Option<f64>,
    /// Bound on one SMTP session in seconds.
    pub timeout_seconds: Option<u64>,
}

impl MailerSettings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `SMTP_PORT` is set but not a valid port number.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its value.
    ///
    /// Empty values count as unset. Boolean flags are true only for
    /// `true` in any letter case.
    ///
    /// # Errors
    ///
    /// Returns an error if `SMTP_PORT` is set but not a valid port number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let flag = |name: &str| get(name).is_some_and(|value| value.eq_ignore_ascii_case("true"));

        let smtp_port = get("SMTP_PORT")
            .map(|raw| {
                raw.trim()
                    .parse::<u16>()
                    .map_err(|e| ConfigurationError::Invalid {
                        name: "SMTP_PORT",
                        reason: format!("{raw:?} is not a port number ({e})"),
                    })
            })
            .transpose()?;

        Ok(Self {
            smtp_host: get("SMTP_HOST"),
            smtp_port,
            smtp_username: get("SMTP_USERNAME"),
            smtp_password: get("SMTP_PASSWORD"),
            smtp_use_tls: flag("SMTP_USE_TLS"),
            smtp_use_ssl: flag("SMTP_USE_SSL"),
            from_email: get("FROM_EMAIL"),
            from_name: get("FROM_NAME"),
            ..Self::default()
        })
    }

    /// Loads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let file_error = |reason: String| ConfigurationError::File {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| file_error(e.to_string()))
    }

    /// Fills every unset field from `other`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            smtp_host: self.smtp_host.or(other.smtp_host),
            smtp_port: self.smtp_port.or(other.smtp_port),
            smtp_username: self.smtp_username.or(other.smtp_username),
            smtp_password: self.smtp_password.or(other.smtp_password),
            smtp_use_tls: self.smtp_use_tls || other.smtp_use_tls,
            smtp_use_ssl: self.smtp_use_ssl || other.smtp_use_ssl,
            from_email: self.from_email.or(other.from_email),
            from_name: self.from_name.or(other.from_name),
            max_retries: self.max_retries.or(other.max_retries),
            backoff_seconds: self.backoff_seconds.or(other.backoff_seconds),
            timeout_seconds: self.timeout_seconds.or(other.timeout_seconds),
        }
    }

    /// Validates the settings into a sender identity and transport configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] naming the first missing or invalid setting.
    pub fn validate(&self) -> Result<(SenderIdentity, TransportConfig), ConfigurationError> {
        let host = self
            .smtp_host
            .as_deref()
            .ok_or(ConfigurationError::Missing("SMTP_HOST"))?;
        let port = self
            .smtp_port
            .ok_or(ConfigurationError::Missing("SMTP_PORT"))?;
        let from_email = self
            .from_email
            .as_deref()
            .ok_or(ConfigurationError::Missing("FROM_EMAIL"))?;

        let identity = SenderIdentity::new(from_email, self.from_name.clone())?;

        let mut config = TransportConfig::new(host, port)?
            .with_credentials(self.smtp_username.clone(), self.smtp_password.clone())
            .with_tls(self.smtp_use_tls)
            .with_ssl(self.smtp_use_ssl);
        match self.timeout_seconds {
            Some(0) => {
                return Err(ConfigurationError::Invalid {
                    name: "timeout_seconds",
                    reason: "must be at least one second".into(),
                });
            }
            Some(seconds) => config = config.with_timeout(Duration::from_secs(seconds)),
            None => {}
        }

        Ok((identity, config))
    }

    /// Builds the retry policy, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `backoff_seconds` is negative or not finite.
    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigurationError> {
        let defaults = RetryPolicy::default();
        let backoff = match self.backoff_seconds {
            Some(seconds) => {
                Duration::try_from_secs_f64(seconds).map_err(|e| ConfigurationError::Invalid {
                    name: "backoff_seconds",
                    reason: e.to_string(),
                })?
            }
            None => defaults.backoff,
        };

        Ok(RetryPolicy::new(
            self.max_retries.unwrap_or(defaults.max_retries),
            backoff,
        ))
    }
}

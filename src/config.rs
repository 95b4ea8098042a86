// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

//! Runtime configuration.
//!
//! Precedence is explicit builder call > environment variable > default, matching the order a
//! caller would expect: [`Builder::from_env`] only fills in fields that haven't already been set
//! explicitly.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default bind port for the OpenFlow 1.0 listener (`OFP_TCP_PORT` in the wire spec).
pub const DEFAULT_LISTEN_PORT: u16 = 6633;

/// Default request/reply timeout used by [`crate::correlator::Correlator`] when the caller
/// doesn't supply one.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

const ENV_LISTEN_HOST: &str = "OFP_LISTEN_HOST";
const ENV_LISTEN_PORT: &str = "OFP_TCP_LISTEN_PORT";
const ENV_REQUEST_TIMEOUT: &str = "OFP_REQUEST_TIMEOUT_DEFAULT";

/// Immutable controller configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    listen_host: String,
    listen_port: u16,
    request_timeout_default: Duration,
}

impl Configuration {
    /// Host/interface the acceptor binds to. Empty string means all interfaces.
    pub fn listen_host(&self) -> &str {
        &self.listen_host
    }

    /// TCP port the acceptor binds to.
    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    /// Default timeout applied to `send_request`/`send_stats_request` when the caller doesn't
    /// override it.
    pub fn request_timeout_default(&self) -> Duration {
        self.request_timeout_default
    }

    pub fn builder() -> Builder {
        Builder::default()
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Builder::default().build()
    }
}

/// Builds a [`Configuration`] field by field, with `from_env` filling in anything not already
/// set explicitly.
#[derive(Clone, Debug, Default)]
pub struct Builder {
    listen_host: Option<String>,
    listen_port: Option<u16>,
    request_timeout_default: Option<Duration>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listen_host(mut self, host: impl Into<String>) -> Self {
        self.listen_host = Some(host.into());
        self
    }

    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = Some(port);
        self
    }

    pub fn with_request_timeout_default(mut self, timeout: Duration) -> Self {
        self.request_timeout_default = Some(timeout);
        self
    }

    /// Fills in any field not already set explicitly from the corresponding environment
    /// variable. Malformed values are reported rather than silently ignored.
    pub fn from_env(mut self) -> Result<Self> {
        if self.listen_host.is_none() {
            if let Ok(host) = std::env::var(ENV_LISTEN_HOST) {
                self.listen_host = Some(host);
            }
        }

        if self.listen_port.is_none() {
            if let Ok(raw) = std::env::var(ENV_LISTEN_PORT) {
                let port = raw.parse().map_err(|_| {
                    Error::Config(format!("{ENV_LISTEN_PORT}={raw:?} is not a valid u16 port"))
                })?;
                self.listen_port = Some(port);
            }
        }

        if self.request_timeout_default.is_none() {
            if let Ok(raw) = std::env::var(ENV_REQUEST_TIMEOUT) {
                let secs: f64 = raw.parse().map_err(|_| {
                    Error::Config(format!(
                        "{ENV_REQUEST_TIMEOUT}={raw:?} is not a valid number of seconds"
                    ))
                })?;
                self.request_timeout_default = Some(Duration::from_secs_f64(secs));
            }
        }

        Ok(self)
    }

    pub fn build(self) -> Configuration {
        Configuration {
            listen_host: self.listen_host.unwrap_or_default(),
            listen_port: self.listen_port.unwrap_or(DEFAULT_LISTEN_PORT),
            request_timeout_default: self
                .request_timeout_default
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Configuration::default();
        assert_eq!(cfg.listen_host(), "");
        assert_eq!(cfg.listen_port(), DEFAULT_LISTEN_PORT);
        assert_eq!(cfg.request_timeout_default(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn explicit_builder_values_round_trip() {
        let cfg = Configuration::builder()
            .with_listen_host("127.0.0.1")
            .with_listen_port(16633)
            .with_request_timeout_default(Duration::from_millis(250))
            .build();
        assert_eq!(cfg.listen_host(), "127.0.0.1");
        assert_eq!(cfg.listen_port(), 16633);
        assert_eq!(cfg.request_timeout_default(), Duration::from_millis(250));
    }
}

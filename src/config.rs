use std::fmt;
use std::time::Duration;

use clap::ValueEnum;

use crate::error::Error;

/// How the endpoint is addressed: through cluster topology discovery or as a
/// single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Cluster,
    Standalone,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Cluster => write!(f, "cluster"),
            Mode::Standalone => write!(f, "standalone"),
        }
    }
}

/// Connection settings for a single run. Built once at startup and consumed by
/// the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    host: String,
    port: u16,
    tls: bool,
    mode: Mode,
    connect_timeout: Duration,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 6379;
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Result<Self, Error> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(Error::Config("port must be between 1 and 65535".to_string()));
        }

        Ok(Self {
            host,
            port,
            tls,
            mode: Mode::Cluster,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Result<Self, Error> {
        if timeout.is_zero() {
            return Err(Error::Config("connect timeout must be greater than zero".to_string()));
        }
        self.connect_timeout = timeout;
        Ok(self)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tls(&self) -> bool {
        self.tls
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Connection URL understood by the `redis` crate. TLS switches the scheme
    /// to `rediss`.
    pub fn url(&self) -> String {
        let scheme = if self.tls() { "rediss" } else { "redis" };
        format!("{}://{}:{}/", scheme, self.host(), self.port())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} ({}, tls {})",
            self.host(),
            self.port(),
            self.mode(),
            if self.tls() { "on" } else { "off" }
        )
    }
}

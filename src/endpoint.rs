use crate::error::{Error, Result};
use crate::DEFAULT_PORT;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;
use url::Url;

const SCHEME: &str = "tcp://";

/// Network address of a matrix switch.
///
/// Accepted string forms:
/// tcp://host\[:port\]
/// or the bare form:
/// host\[:port\]
///
/// IPv6 addresses take a port only in brackets (`[::1]:5000`); a bare
/// literal such as `::1` uses the default port.
///
/// The port defaults to [`DEFAULT_PORT`] when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from its parts
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(Error::Endpoint("Host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(Error::Endpoint("Port must be between 1 and 65535".to_string()));
        }
        Ok(Self { host, port })
    }

    /// Parse an endpoint string
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        // Try parsing as URL first
        if let Ok(endpoint) = Self::parse_as_url(input) {
            return Ok(endpoint);
        }

        // Fall back to plain host:port parsing
        Self::parse_plain(input)
    }

    /// Host name or address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parse as a URL (tcp://host:port)
    fn parse_as_url(input: &str) -> Result<Self> {
        let input = if input.starts_with(SCHEME) {
            input.to_string()
        } else {
            format!("{}{}", SCHEME, input)
        };

        let url = Url::parse(&input)
            .map_err(|_| Error::Endpoint("Invalid endpoint format".to_string()))?;

        let host = url
            .host_str()
            .ok_or_else(|| Error::Endpoint("Invalid host in endpoint".to_string()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        Self::new(host, url.port().unwrap_or(DEFAULT_PORT))
    }

    /// Parse as host[:port]
    fn parse_plain(input: &str) -> Result<Self> {
        let input = input.strip_prefix(SCHEME).unwrap_or(input);
        if input.contains('/') || input.contains('@') {
            return Err(Error::Endpoint(format!("Unexpected characters in {:?}", input)));
        }

        // A bare IPv6 literal has no room for a port
        if input.parse::<Ipv6Addr>().is_ok() {
            return Self::new(input, DEFAULT_PORT);
        }

        match input.rfind(':') {
            Some(idx) => {
                let host = &input[..idx];
                if host.contains(':') {
                    return Err(Error::Endpoint(format!(
                        "IPv6 addresses with a port must be bracketed: {:?}",
                        input
                    )));
                }
                let port = input[idx + 1..]
                    .parse::<u16>()
                    .map_err(|_| Error::Endpoint("Invalid port format".to_string()))?;
                Self::new(host, port)
            }
            None => Self::new(input, DEFAULT_PORT),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}

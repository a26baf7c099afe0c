use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// Validating public resolvers; the AD bit is only meaningful from these
pub const DEFAULT_UPSTREAM_SERVERS: [SocketAddr; 2] = [
    SocketAddr::new(IpAddr::V4(std::net::Ipv4Addr::new(8, 8, 8, 8)), 53),
    SocketAddr::new(IpAddr::V4(std::net::Ipv4Addr::new(1, 1, 1, 1)), 53),
];
pub const DEFAULT_PAYLOAD_SIZE: u16 = 1420;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);
const MAX_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Servers asked in order until one gives a usable answer
    pub upstream_servers: Vec<SocketAddr>,

    /// Overall lifetime of one resolution, across all servers and retries
    pub timeout: Duration,

    /// How long to wait for a single server to answer
    pub attempt_timeout: Duration,

    /// Extra attempts per server after a transport failure
    pub max_retries: u8,

    /// EDNS0 UDP payload size advertised in queries
    pub edns_payload_size: u16,

    pub recursion_desired: bool,

    /// Set AD in queries, asking for the AD bit in answers (RFC 6840 §5.7)
    pub authenticated_data: bool,

    /// Set the EDNS DNSSEC OK bit
    pub dnssec_ok: bool,

    /// Re-ask over TCP when a UDP answer is truncated
    pub tcp_fallback: bool,

    /// Move on to the next server after SERVFAIL or REFUSED
    pub try_next_on_servfail: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            upstream_servers: DEFAULT_UPSTREAM_SERVERS.to_vec(),
            timeout: DEFAULT_TIMEOUT,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_retries: 1,
            edns_payload_size: DEFAULT_PAYLOAD_SIZE,
            recursion_desired: true,
            authenticated_data: true,
            dnssec_ok: true,
            tcp_fallback: true,
            try_next_on_servfail: true,
        }
    }
}

/// On-disk form of the configuration; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    servers: Option<Vec<String>>,
    timeout: Option<f64>,
    attempt_timeout: Option<f64>,
    max_retries: Option<u8>,
    payload: Option<u16>,
    recursion_desired: Option<bool>,
    authenticated_data: Option<bool>,
    dnssec_ok: Option<bool>,
    tcp_fallback: Option<bool>,
    try_next_on_servfail: Option<bool>,
}

impl ResolverConfig {
    /// Defaults, then the optional TOML file, then `BLACKLIES_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = path {
            config.apply_file(path)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Loading resolver configuration from {}", path.display());
        self.apply_toml(&text)
    }

    pub fn apply_toml(&mut self, text: &str) -> Result<(), ConfigError> {
        let file: FileConfig =
            toml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(servers) = file.servers {
            self.upstream_servers = servers
                .iter()
                .map(|s| parse_server(s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(secs) = file.timeout {
            self.timeout = seconds(secs)?;
        }
        if let Some(secs) = file.attempt_timeout {
            self.attempt_timeout = seconds(secs)?;
        }
        if let Some(retries) = file.max_retries {
            self.max_retries = retries;
        }
        if let Some(payload) = file.payload {
            self.edns_payload_size = payload;
        }
        if let Some(rd) = file.recursion_desired {
            self.recursion_desired = rd;
        }
        if let Some(ad) = file.authenticated_data {
            self.authenticated_data = ad;
        }
        if let Some(dnssec_ok) = file.dnssec_ok {
            self.dnssec_ok = dnssec_ok;
        }
        if let Some(tcp_fallback) = file.tcp_fallback {
            self.tcp_fallback = tcp_fallback;
        }
        if let Some(try_next) = file.try_next_on_servfail {
            self.try_next_on_servfail = try_next;
        }
        Ok(())
    }

    /// Override settings from `BLACKLIES_*` variables found through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(servers) = lookup("BLACKLIES_SERVERS") {
            let servers = servers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_server)
                .collect::<Result<Vec<_>, _>>()?;
            if servers.is_empty() {
                return Err(ConfigError::InvalidUpstreamServer(
                    "No valid upstream servers provided".to_string(),
                ));
            }
            self.upstream_servers = servers;
        }

        if let Some(timeout) = lookup("BLACKLIES_TIMEOUT") {
            self.timeout = parse_seconds(&timeout)?;
        }

        if let Some(timeout) = lookup("BLACKLIES_ATTEMPT_TIMEOUT") {
            self.attempt_timeout = parse_seconds(&timeout)?;
        }

        if let Some(retries) = lookup("BLACKLIES_MAX_RETRIES") {
            self.max_retries = retries.trim().parse::<u8>().map_err(|_| {
                ConfigError::ParseError(format!("Invalid max retries: {}", retries))
            })?;
        }

        if let Some(payload) = lookup("BLACKLIES_PAYLOAD") {
            self.edns_payload_size = payload
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPayloadSize(payload.clone()))?;
        }

        if let Some(tcp_fallback) = lookup("BLACKLIES_TCP_FALLBACK") {
            self.tcp_fallback = parse_bool(&tcp_fallback, self.tcp_fallback);
        }

        if let Some(try_next) = lookup("BLACKLIES_TRY_NEXT_ON_SERVFAIL") {
            self.try_next_on_servfail = parse_bool(&try_next, self.try_next_on_servfail);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_servers.is_empty() {
            return Err(ConfigError::InvalidUpstreamServer(
                "At least one upstream server is required".to_string(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        if self.timeout > MAX_TIMEOUT {
            return Err(ConfigError::InvalidTimeout(
                "Timeout too large (max 300 seconds)".to_string(),
            ));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "Attempt timeout must be greater than 0".to_string(),
            ));
        }

        if self.edns_payload_size < crate::dns::edns::MIN_UDP_PAYLOAD {
            return Err(ConfigError::InvalidPayloadSize(format!(
                "{} is below the 512 byte minimum",
                self.edns_payload_size
            )));
        }

        Ok(())
    }
}

/// Parse `IP`, `IP:port` or `[IPv6]:port`; a bare address means port 53
pub fn parse_server(s: &str) -> Result<SocketAddr, ConfigError> {
    let s = s.trim();
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, 53))
        .map_err(|_| ConfigError::InvalidUpstreamServer(s.to_string()))
}

/// Parse a positive, possibly fractional, number of seconds
pub fn parse_seconds(s: &str) -> Result<Duration, ConfigError> {
    let secs = s
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidTimeout(s.to_string()))?;
    seconds(secs)
}

fn seconds(secs: f64) -> Result<Duration, ConfigError> {
    if secs <= 0.0 {
        return Err(ConfigError::InvalidTimeout(
            "Timeout must be greater than 0".to_string(),
        ));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidTimeout(e.to_string()))
}

/// Parse a boolean from a string, with a default value for invalid input
fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

//! Options and logging setup shared by `blrcode` and `blrcode-batch`.

use std::path::PathBuf;

use clap::{ArgAction, Args};
use tracing_subscriber::EnvFilter;

use crate::config::{ResolverConfig, parse_seconds, parse_server};
use crate::error::ConfigError;

#[derive(Args, Debug, Clone, Default)]
pub struct ResolverArgs {
    /// Upstream resolver as IP or IP:port, repeat for more than one
    #[arg(short, long = "server", value_name = "ADDRESS")]
    pub servers: Vec<String>,

    /// Overall query timeout in seconds
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<String>,

    /// EDNS UDP payload size to advertise
    #[arg(long, value_name = "BYTES")]
    pub payload: Option<u16>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Do not retry truncated answers over TCP
    #[arg(long)]
    pub no_tcp: bool,

    /// Log more to stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl ResolverArgs {
    /// Defaults, then the config file, then `BLACKLIES_*`, then these flags
    pub fn to_config(&self) -> Result<ResolverConfig, ConfigError> {
        let mut config = ResolverConfig::load(self.config.as_deref())?;

        if !self.servers.is_empty() {
            config.upstream_servers = self
                .servers
                .iter()
                .map(|s| parse_server(s))
                .collect::<Result<_, _>>()?;
        }
        if let Some(timeout) = &self.timeout {
            config.timeout = parse_seconds(timeout)?;
        }
        if let Some(payload) = self.payload {
            config.edns_payload_size = payload;
        }
        if self.no_tcp {
            config.tcp_fallback = false;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Log to stderr. `RUST_LOG` wins over the verbosity count.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

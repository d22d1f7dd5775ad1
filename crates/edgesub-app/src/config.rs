//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use edgesub_server::{ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
use edgesub_sources::{SourcesConfig, DEFAULT_LIST_URL, DEFAULT_V4_URL, DEFAULT_V6_URL};

/// Edgesub - proxy subscription aggregator
#[derive(Parser, Debug, Clone)]
#[command(name = "edgesub", version, about)]
pub struct Args {
    /// Host to bind to
    #[arg(long, env = "EDGESUB_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind to
    #[arg(long, env = "EDGESUB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Default remote list location (requests may override it with `piu`)
    #[arg(long, env = "EDGESUB_REMOTE_LIST_URL", default_value = DEFAULT_LIST_URL)]
    pub remote_list_url: String,

    /// IPv4 address table page
    #[arg(long, env = "EDGESUB_SCRAPE_V4_URL", default_value = DEFAULT_V4_URL)]
    pub scrape_v4_url: String,

    /// IPv6 address table page
    #[arg(long, env = "EDGESUB_SCRAPE_V6_URL", default_value = DEFAULT_V6_URL)]
    pub scrape_v6_url: String,

    /// Timeout for every outbound source fetch, in seconds
    #[arg(long, env = "EDGESUB_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, env = "EDGESUB_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write daily-rotated log files to this directory
    #[arg(long, env = "EDGESUB_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Args {
    /// The effective log level.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.log_level
        }
    }

    /// Server bind settings.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default()
            .with_host(&self.host)
            .with_port(self.port)
    }

    /// Source locations and fetch bound.
    pub fn sources_config(&self) -> SourcesConfig {
        SourcesConfig {
            remote_list_url: self.remote_list_url.clone(),
            scrape_v4_url: self.scrape_v4_url.clone(),
            scrape_v6_url: self.scrape_v6_url.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
        }
    }
}

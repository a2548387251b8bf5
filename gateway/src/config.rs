//! Configuration module for command line and environment parsing.
//!
//! Every option can be given as a flag or through its `SMTP2HTTP_*`
//! environment variable; flags win.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use thiserror::Error;
use url::Url;

/// Configuration problems detected before anything is bound.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),

    #[error("invalid webhook URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// How much the process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    /// Default `EnvFilter` directive for this level, used when `RUST_LOG` is unset.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Silent => "error",
            Verbosity::Normal => "warn,smtp2http=info",
            Verbosity::Verbose => "info,smtp2http=debug",
            Verbosity::Debug => "debug,smtp2http=trace",
        }
    }

    /// Whether full request and response bodies should be logged.
    pub fn dumps_traffic(self) -> bool {
        self >= Verbosity::Debug
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "smtp2http", version, about = "Receive mail over SMTP and POST it to a webhook as JSON")]
pub struct Config {
    /// Webhook URL every received message is posted to
    #[arg(long, env = "SMTP2HTTP_URL")]
    pub url: String,

    /// Address to accept SMTP connections on
    #[arg(long, env = "SMTP2HTTP_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// SMTP port
    #[arg(long, env = "SMTP2HTTP_PORT", default_value_t = 25)]
    pub port: u16,

    /// File descriptor that receives a newline (and is closed) once listening
    #[arg(long, env = "SMTP2HTTP_NOTIFY_FD")]
    pub notify_fd: Option<i32>,

    /// Name announced in the SMTP greeting (defaults to the system hostname)
    #[arg(long, env = "SMTP2HTTP_HOSTNAME")]
    pub hostname: Option<String>,

    /// Webhook request timeout in seconds (no timeout when unset)
    #[arg(long, env = "SMTP2HTTP_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Only log errors
    #[arg(short, long, conflicts_with_all = ["verbose", "debug"])]
    pub quiet: bool,

    /// More output; repeat for debug output
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Debug output, including full webhook requests and responses
    #[arg(long)]
    pub debug: bool,

    /// Log output format
    #[arg(long, env = "SMTP2HTTP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    /// Selected verbosity from the `-q`, `-v` and `--debug` flags.
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Silent
        } else if self.debug || self.verbose >= 2 {
            Verbosity::Debug
        } else if self.verbose == 1 {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Parsed webhook URL; only absolute http(s) URLs are accepted.
    pub fn webhook_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason,
        };

        let url = Url::parse(self.url.trim()).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme {other:?}"))),
        }
    }

    /// Webhook request timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Greeting hostname: the configured one, or whatever the system reports.
    pub fn greeting_hostname(&self) -> String {
        self.hostname
            .clone()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(system_hostname)
    }
}

/// The local hostname, or `localhost` if it cannot be determined.
pub fn system_hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

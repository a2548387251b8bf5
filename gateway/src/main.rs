//! smtp2http - SMTP to webhook gateway.
//!
//! Accepts mail over SMTP and posts each message as JSON to the configured
//! URL. Delivery happens on a dedicated thread so webhook latency never
//! reaches the SMTP clients.

mod server;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use smtp2http::{Config, Dispatcher, LogFormat, Verbosity, WebhookClient};

fn main() -> Result<()> {
    let config = Config::parse();
    let verbosity = config.verbosity();

    init_logging(verbosity, config.log_format);

    tracing::info!("gateway_starting");

    let url = config.webhook_url()?;
    let addr = config.socket_addr()?;
    tracing::info!(
        url = %url,
        address = %addr,
        notify_fd = ?config.notify_fd,
        timeout_secs = ?config.timeout_secs,
        verbosity = ?verbosity,
        "config_loaded"
    );

    // The blocking client must be built outside the async runtime; the worker
    // thread owns it from here on.
    let client = WebhookClient::new(url, config.timeout(), verbosity)
        .context("Failed to create HTTP client")?;
    let dispatcher = Dispatcher::start(client).context("Failed to start dispatcher")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let result = runtime.block_on(server::run(&config, addr, dispatcher.handle()));
    drop(runtime);

    dispatcher.stop();

    result?;
    tracing::info!("gateway_shutdown_complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbosity: Verbosity, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
}

//! TCP accept loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::connection::Connection;
use super::session::Session;
use crate::queue::MessageHandler;

/// Pause after a failed accept so a persistent error (e.g. out of file
/// descriptors) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Accepts SMTP connections and spawns one task per connection.
pub struct Listener<H> {
    listener: TcpListener,
    hostname: Arc<str>,
    handler: H,
}

impl<H> Listener<H>
where
    H: MessageHandler + Clone + Send + 'static,
{
    /// Bind `addr`. Every session greets with `hostname` and hands completed
    /// messages to a clone of `handler`.
    pub async fn bind(addr: SocketAddr, hostname: &str, handler: H) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, hostname, handler))
    }

    /// Wrap an already bound listener.
    pub fn from_listener(listener: TcpListener, hostname: &str, handler: H) -> Self {
        Self {
            listener,
            hostname: Arc::from(hostname),
            handler,
        }
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever. Failed accepts are logged and skipped.
    pub async fn serve(self) {
        info!(
            address = ?self.listener.local_addr().ok(),
            hostname = %self.hostname,
            "smtp_listening"
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "smtp_connection_accepted");
                    let session = Session::new(&*self.hostname, self.handler.clone());
                    tokio::spawn(Connection::new(stream, peer, session).run());
                }
                Err(e) => {
                    warn!(error = %e, "smtp_accept_failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }
}

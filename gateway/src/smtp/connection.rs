//! One SMTP connection: socket reads, line reassembly, replies.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::lines::LineBuffer;
use super::session::{Reply, Session};
use crate::queue::MessageHandler;

/// Size of the per-connection read buffer.
pub const READ_BUFFER_SIZE: usize = 8192;

/// Drives a single [`Session`] over a byte stream.
///
/// Reads and writes strictly alternate: every reply produced by a chunk of
/// input is written before the next read is issued.
pub struct Connection<Stream, H> {
    stream: Stream,
    peer: SocketAddr,
    session: Session<H>,
    lines: LineBuffer,
}

impl<Stream, H> Connection<Stream, H>
where
    Stream: AsyncRead + AsyncWrite + Unpin,
    H: MessageHandler,
{
    pub fn new(stream: Stream, peer: SocketAddr, session: Session<H>) -> Self {
        Self {
            stream,
            peer,
            session,
            lines: LineBuffer::new(),
        }
    }

    /// Serve the connection until the client quits, disconnects or errors.
    ///
    /// Transport errors end this connection only and are not reported further.
    pub async fn run(mut self) {
        match self.serve().await {
            Ok(()) => debug!(peer = %self.peer, "smtp_connection_closed"),
            Err(e) => debug!(peer = %self.peer, error = %e, "smtp_connection_error"),
        }
    }

    async fn serve(&mut self) -> io::Result<()> {
        let mut replies = Vec::new();
        self.session.start(&mut replies);
        if self.write_replies(&mut replies).await? {
            return self.close().await;
        }

        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                debug!(
                    peer = %self.peer,
                    unterminated_bytes = self.lines.pending(),
                    "smtp_peer_disconnected"
                );
                return Ok(());
            }

            for line in self.lines.feed(&buf[..n]) {
                self.session.receive(&line, &mut replies);
                if replies.iter().any(Reply::closes) {
                    // Anything the client pipelined after QUIT is ignored.
                    break;
                }
            }

            if self.write_replies(&mut replies).await? {
                return self.close().await;
            }
        }
    }

    /// Write and flush every pending reply in order. Returns `true` when one
    /// of them asked for the connection to be closed.
    async fn write_replies(&mut self, replies: &mut Vec<Reply>) -> io::Result<bool> {
        if replies.is_empty() {
            return Ok(false);
        }

        let mut out = String::new();
        let mut close = false;
        for reply in replies.drain(..) {
            out.push_str(reply.text());
            out.push_str("\r\n");
            if reply.closes() {
                close = true;
                break;
            }
        }

        self.stream.write_all(out.as_bytes()).await?;
        self.stream.flush().await?;
        Ok(close)
    }

    async fn close(&mut self) -> io::Result<()> {
        // The peer may already be gone; the socket is dropped either way.
        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "smtp_shutdown_failed");
        }
        Ok(())
    }
}

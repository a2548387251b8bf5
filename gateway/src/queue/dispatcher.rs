//! Message dispatcher: a FIFO queue drained by one dedicated worker thread.
//!
//! Connections enqueue completed messages without ever waiting on HTTP; the
//! worker pops them in order and delivers them one at a time.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use super::types::Message;
use crate::delivery::Deliver;

/// Accepts completed messages from an SMTP session.
pub trait MessageHandler {
    fn handle(&self, message: Message);
}

/// Hands messages to an in-process consumer instead of the webhook.
impl MessageHandler for std::sync::mpsc::Sender<Message> {
    fn handle(&self, message: Message) {
        if let Err(e) = self.send(message) {
            debug!(from = ?e.0.from, "message_receiver_gone");
        }
    }
}

struct QueueState {
    messages: VecDeque<Message>,
    stop_requested: bool,
}

struct Shared {
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap, cloneable producer side of the dispatcher queue.
#[derive(Clone)]
pub struct DispatchHandle {
    shared: Arc<Shared>,
}

impl DispatchHandle {
    /// Append a message to the queue and wake the worker. Never blocks on delivery.
    pub fn enqueue(&self, message: Message) {
        let depth = {
            let mut state = self.shared.lock();
            state.messages.push_back(message);
            state.messages.len()
        };
        self.shared.ready.notify_one();

        debug!(queue_depth = depth, "dispatch_enqueued");
    }

    /// Number of messages waiting for the worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().messages.len()
    }
}

impl MessageHandler for DispatchHandle {
    fn handle(&self, message: Message) {
        self.enqueue(message);
    }
}

/// Owner of the worker thread.
///
/// Stopping drains whatever is still queued before the worker exits.
/// Dropping a dispatcher that was never stopped stops it the same way.
pub struct Dispatcher {
    handle: DispatchHandle,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn the worker thread, which owns `deliverer` for its whole life.
    pub fn start<D: Deliver>(deliverer: D) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                messages: VecDeque::new(),
                stop_requested: false,
            }),
            ready: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("smtp2http-dispatch".to_string())
            .spawn(move || run_worker(&worker_shared, deliverer))?;

        info!("dispatcher_started");

        Ok(Self {
            handle: DispatchHandle { shared },
            worker: Some(worker),
        })
    }

    /// A producer handle for sessions.
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Request shutdown, wait for the queue to drain and join the worker.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        let pending = {
            let mut state = self.handle.shared.lock();
            state.stop_requested = true;
            state.messages.len()
        };
        self.handle.shared.ready.notify_all();

        info!(pending = pending, "dispatcher_stopping");

        if worker.join().is_err() {
            error!("dispatcher_worker_panicked");
        }

        info!("dispatcher_stopped");
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker<D: Deliver>(shared: &Shared, mut deliverer: D) {
    loop {
        let message = {
            let mut state = shared
                .ready
                .wait_while(shared.lock(), |state| {
                    state.messages.is_empty() && !state.stop_requested
                })
                .unwrap_or_else(PoisonError::into_inner);

            match state.messages.pop_front() {
                Some(message) => message,
                // Only reachable once stop was requested and the queue is empty.
                None => break,
            }
        };

        if let Err(e) = deliverer.deliver(&message) {
            error!(
                error = %e,
                from = ?message.from,
                recipients = message.to.len(),
                "webhook_delivery_failed"
            );
        }
    }

    debug!("dispatcher_worker_exiting");
}

// src/events/service.rs

use std::collections::VecDeque;
use std::io::Write;
use std::net::{Ipv4Addr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::errors::fatal;
use crate::events::wire;

/// Default TCP port consumers connect to for asset-compiled events.
pub const DEFAULT_EVENT_PORT: u16 = 6789;

/// How long the sender thread sleeps between shutdown-flag checks while
/// waiting for a connection or for messages. Bounds the shutdown latency.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Sink for "this output asset was just recompiled" announcements.
///
/// The pipeline talks to the notification channel through this trait so
/// tests can substitute a recorder for the real TCP service.
pub trait AssetEventSink: Send + Sync {
    fn notify_asset_compiled(&self, path: &str);
}

struct Shared {
    queue: Mutex<VecDeque<Vec<u8>>>,
    available: Condvar,
    shutdown: AtomicBool,
}

/// Out-of-process notification channel for recompiled assets.
///
/// A dedicated sender thread owns a loopback TCP listener and serves at
/// most one consumer connection at a time. Producers append encoded
/// frames to an unbounded in-memory queue and never block; frames stay
/// queued until a consumer connection accepts the whole backlog, in
/// order. Delivery failures silently drop the connection and wait for the
/// next consumer; nothing is ever discarded on the producer side.
pub struct AssetEventService {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl AssetEventService {
    /// Bind the listener and start the sender thread.
    pub fn spawn(port: u16) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("asset-events".to_string())
            .spawn(move || sender_loop(thread_shared, port))
            .unwrap_or_else(|err| fatal(&format!("spawning asset-event thread: {err}")));

        Self {
            shared,
            thread: Some(thread),
        }
    }
}

impl AssetEventSink for AssetEventService {
    fn notify_asset_compiled(&self, path: &str) {
        let frame = wire::encode_asset_compiled(path);
        let mut queue = self.shared.queue.lock();
        queue.push_back(frame);
        self.shared.available.notify_all();
    }
}

impl Drop for AssetEventService {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.available.notify_all();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn sender_loop(shared: Arc<Shared>, port: u16) {
    let listener = match TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
        Ok(listener) => listener,
        Err(err) => fatal(&format!("binding asset-event listener on port {port}: {err}")),
    };
    if let Err(err) = listener.set_nonblocking(true) {
        fatal(&format!("configuring asset-event listener: {err}"));
    }

    info!(port, "asset-event service listening");

    while !shared.shutdown.load(Ordering::SeqCst) {
        let stream = match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "asset-event consumer connected");
                stream
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
            Err(err) => {
                warn!(error = %err, "asset-event accept failed");
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
        };

        if stream.set_nonblocking(false).is_err() {
            continue;
        }
        // A stalled consumer must not pin the thread past shutdown.
        let _ = stream.set_write_timeout(Some(Duration::from_millis(250)));

        serve_connection(&shared, stream);
    }

    debug!("asset-event service stopped");
}

/// Flush queued frames to one consumer until it disconnects or shutdown
/// is requested.
fn serve_connection(shared: &Shared, mut stream: TcpStream) {
    loop {
        {
            let mut queue = shared.queue.lock();
            while queue.is_empty() {
                if shared.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                let _ = shared.available.wait_for(&mut queue, POLL_INTERVAL);
            }
        }

        loop {
            if shared.shutdown.load(Ordering::SeqCst) {
                return;
            }
            let Some(frame) = shared.queue.lock().pop_front() else {
                break;
            };
            if let Err(err) = stream.write_all(&frame) {
                debug!(error = %err, "asset-event consumer lost; keeping backlog");
                // The consumer is gone; keep the undelivered frame for the
                // next connection.
                shared.queue.lock().push_front(frame);
                return;
            }
        }
    }
}

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use palmlink_protocol::PeerMessage;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use tungstenite::handshake::{HandshakeError, HandshakeRole};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

pub const EVENT_CAP: usize = 256;
pub const OUTBOUND_CAP: usize = 256;

const READ_TIMEOUT: Duration = Duration::from_millis(30);
const WRITE_TIMEOUT: Duration = Duration::from_millis(200);
const IDLE_SLEEP: Duration = Duration::from_millis(25);
const HANDSHAKE_RETRY: Duration = Duration::from_millis(5);
const HANDSHAKE_ATTEMPTS: usize = 200;

/// Link lifecycle and inbound traffic, delivered to the main loop.
#[derive(Debug)]
pub enum LinkEvent {
    Opened,
    Closed,
    Inbound(PeerMessage),
}

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("connect failed to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
}

pub fn event_channel() -> (Sender<LinkEvent>, Receiver<LinkEvent>) {
    bounded(EVENT_CAP)
}

/// Cheap handle for queueing outbound peer messages from the pipeline
/// thread. Sends are non-blocking and best-effort.
#[derive(Clone)]
pub struct PeerHandle {
    tx: Sender<PeerMessage>,
}

impl PeerHandle {
    /// Returns false when the queue is full or the link thread is gone;
    /// the message is dropped either way.
    pub fn send(&self, message: PeerMessage) -> bool {
        let sent = self.tx.try_send(message).is_ok();
        if !sent {
            debug!("outbound peer queue unavailable, message dropped");
        }
        sent
    }
}

/// Outbound queue endpoints: the handle for producers and the receiver
/// the link thread drains.
pub fn outbound_channel() -> (PeerHandle, Receiver<PeerMessage>) {
    let (tx, rx) = bounded(OUTBOUND_CAP);
    (PeerHandle { tx }, rx)
}

/// Host side of the peer link: accepts one controller and keeps it as the
/// sole active session. While a session is active, later connections are
/// closed immediately; when the active peer drops, the next accept wins.
pub struct HostLink {
    listen_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl HostLink {
    pub fn spawn(addr: &str, events: Sender<LinkEvent>) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).map_err(|source| NetError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let listen_addr = listener.local_addr().map_err(|source| NetError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let _ = listener.set_nonblocking(true);

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);
        let join_handle = thread::spawn(move || run_host(listener, events, shutdown_for_thread));

        info!(%listen_addr, "host link listening");
        Ok(Self {
            listen_addr,
            shutdown,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Ok(mut handle) = self.join_handle.lock() {
            if let Some(handle) = handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for HostLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_host(listener: TcpListener, events: Sender<LinkEvent>, shutdown: Arc<AtomicBool>) {
    let mut active: Option<WebSocket<TcpStream>> = None;

    while !shutdown.load(Ordering::Relaxed) {
        // Accept pass. Single-session policy: first connection wins.
        loop {
            match listener.accept() {
                Ok((stream, peer_addr)) => {
                    if active.is_some() {
                        debug!(%peer_addr, "refusing controller, session already active");
                        drop(stream);
                        continue;
                    }
                    let _ = stream.set_nodelay(true);
                    let _ = stream.set_read_timeout(Some(READ_TIMEOUT));
                    let _ = stream.set_write_timeout(Some(WRITE_TIMEOUT));

                    match blocking_handshake(tungstenite::accept(stream)) {
                        Ok(ws) => {
                            info!(%peer_addr, "controller connected");
                            let _ = events.try_send(LinkEvent::Opened);
                            active = Some(ws);
                        }
                        Err(err) => warn!(%peer_addr, "websocket handshake failed: {err}"),
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }

        // Read at most one message per pass; the short socket timeout
        // keeps the loop moving.
        if let Some(ws) = active.as_mut() {
            match ws.read() {
                Ok(Message::Text(text)) => match serde_json::from_str::<PeerMessage>(&text) {
                    Ok(message) => {
                        let _ = events.try_send(LinkEvent::Inbound(message));
                    }
                    Err(err) => debug!("ignoring malformed peer payload: {err}"),
                },
                Ok(Message::Ping(payload)) => {
                    let _ = ws.send(Message::Pong(payload));
                }
                Ok(Message::Close(_)) => close_active(&mut active, &events),
                Ok(_) => {}
                Err(tungstenite::Error::Io(e))
                    if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
                Err(_) => close_active(&mut active, &events),
            }
        } else {
            thread::sleep(IDLE_SLEEP);
        }
    }

    if let Some(mut ws) = active {
        let _ = ws.close(None);
    }
}

fn close_active(active: &mut Option<WebSocket<TcpStream>>, events: &Sender<LinkEvent>) {
    if let Some(mut ws) = active.take() {
        let _ = ws.close(None);
    }
    let _ = events.try_send(LinkEvent::Closed);
}

/// Controller side of the peer link: one connection to the
/// host-published address. When the link drops it stays down; later
/// sends are dropped, and no reconnection is attempted.
pub struct ControllerLink {
    handle: PeerHandle,
    shutdown: Arc<AtomicBool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ControllerLink {
    pub fn spawn(addr: &str, events: Sender<LinkEvent>) -> Result<Self, NetError> {
        let stream = TcpStream::connect(addr).map_err(|source| NetError::Connect {
            addr: addr.to_string(),
            source,
        })?;
        let _ = stream.set_nodelay(true);
        let _ = stream.set_read_timeout(Some(READ_TIMEOUT));
        let _ = stream.set_write_timeout(Some(WRITE_TIMEOUT));

        let (ws, _response) = blocking_handshake(tungstenite::client(format!("ws://{addr}"), stream))
            .map_err(NetError::Handshake)?;

        let (handle, outbound_rx) = outbound_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);

        let _ = events.try_send(LinkEvent::Opened);
        let join_handle =
            thread::spawn(move || run_controller(ws, outbound_rx, events, shutdown_for_thread));

        info!(%addr, "connected to host");
        Ok(Self {
            handle,
            shutdown,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn handle(&self) -> PeerHandle {
        self.handle.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Ok(mut handle) = self.join_handle.lock() {
            if let Some(handle) = handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for ControllerLink {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_controller(
    mut ws: WebSocket<TcpStream>,
    outbound: Receiver<PeerMessage>,
    events: Sender<LinkEvent>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        // Drain queued sends.
        loop {
            match outbound.try_recv() {
                Ok(message) => {
                    let Ok(payload) = serde_json::to_string(&message) else {
                        continue;
                    };
                    if ws.send(Message::Text(payload.into())).is_err() {
                        let _ = events.try_send(LinkEvent::Closed);
                        return;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }

        // Commands only flow controller→host; reads answer pings and
        // notice the link dropping. The timeout paces the loop.
        match ws.read() {
            Ok(Message::Ping(payload)) => {
                let _ = ws.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => {
                let _ = events.try_send(LinkEvent::Closed);
                return;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(_) => {
                let _ = events.try_send(LinkEvent::Closed);
                return;
            }
        }
    }

    let _ = ws.close(None);
}

/// Complete a tungstenite handshake over a socket with a read timeout:
/// `Interrupted` just means the other side has not answered yet.
fn blocking_handshake<R: HandshakeRole>(
    result: Result<R::FinalResult, HandshakeError<R>>,
) -> Result<R::FinalResult, String> {
    let mut pending = match result {
        Ok(done) => return Ok(done),
        Err(HandshakeError::Failure(err)) => return Err(err.to_string()),
        Err(HandshakeError::Interrupted(mid)) => mid,
    };
    for _ in 0..HANDSHAKE_ATTEMPTS {
        thread::sleep(HANDSHAKE_RETRY);
        match pending.handshake() {
            Ok(done) => return Ok(done),
            Err(HandshakeError::Failure(err)) => return Err(err.to_string()),
            Err(HandshakeError::Interrupted(mid)) => pending = mid,
        }
    }
    Err("handshake timed out".to_string())
}

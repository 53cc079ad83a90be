//! Client transport: handshake, receiver thread, main loop.
//!
//! Mirrors the server's threading shape at a smaller scale. A receiver
//! thread blocks on the socket and pushes each decoded batch onto a
//! bounded stack guarded by a mutex/condvar pair; the main loop waits on
//! the condvar, drains the stack, applies the messages to the world and
//! hands a snapshot to the renderer. Outbound traffic is always a
//! 1-message batch.

use crate::game::ClientWorld;
use crate::ui::{InputEvent, InputSource, Renderer, WorldSnapshot};
use log::{info, warn};
use parking_lot::{Condvar, Mutex};
use shared::batch::{MessageBatch, MAX_DATAGRAM_LEN};
use shared::map::Map;
use shared::protocol::{CodecError, Message, MessageBody};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

/// Handshake retransmissions before giving up.
pub const CONNECT_ATTEMPTS: u32 = 5;

/// How long each handshake attempt waits for the reply.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Receive timeout once connected; bounds the receiver's shutdown lag.
const RECV_TIMEOUT: Duration = Duration::from_millis(20);

/// Batches buffered between main-loop wakeups before the oldest traffic
/// is dropped.
const INBOUND_CAPACITY: usize = 8;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("socket error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed handshake reply: {0}")]
    Codec(#[from] CodecError),
    #[error("server at {0} is full")]
    Rejected(SocketAddr),
    #[error("no reply from {0} after {1} attempts")]
    NoReply(SocketAddr, u32),
}

/// Batches decoded by the receiver thread, newest on top.
#[derive(Default)]
struct Inbound {
    batches: Mutex<Vec<MessageBatch>>,
    ready: Condvar,
}

/// A connected session.
pub struct Client {
    socket: UdpSocket,
    server: SocketAddr,
    pub world: ClientWorld,
    seq: u32,
    inbound: Arc<Inbound>,
    shutdown: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl Client {
    /// Connects with the default retry policy, loading the map the
    /// server names from `map_dir`.
    pub fn connect(server: &str, nick: &str, map_dir: &Path) -> Result<Self, ConnectError> {
        Self::connect_with(server, nick, map_dir, CONNECT_ATTEMPTS, CONNECT_TIMEOUT)
    }

    /// Connect handshake: send `ConnectRequest`, wait for the reply
    /// batch, retransmit on timeout. The reply batch also carries the
    /// spawn position and the starter weapon grant; both are applied
    /// before this returns.
    pub fn connect_with(
        server: &str,
        nick: &str,
        map_dir: &Path,
        attempts: u32,
        timeout: Duration,
    ) -> Result<Self, ConnectError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        // Hostname or IP literal; resolved once, here. The socket is
        // IPv4, so prefer an IPv4 resolution.
        let server: SocketAddr = server
            .to_socket_addrs()?
            .find(|addr| addr.is_ipv4())
            .ok_or_else(|| {
                io::Error::new(ErrorKind::InvalidInput, "server address did not resolve")
            })?;
        socket.set_read_timeout(Some(timeout))?;

        let request = Message {
            seq: 1,
            player: 0,
            body: MessageBody::ConnectRequest {
                nick: nick.to_string(),
            },
        };
        let mut outgoing = MessageBatch::new();
        outgoing
            .push(&request)
            .expect("a fresh batch holds one message");

        let mut buf = [0u8; MAX_DATAGRAM_LEN];
        for attempt in 0..attempts {
            socket.send_to(outgoing.as_datagram(), server)?;

            let (len, from) = match socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    info!("handshake attempt {} timed out", attempt + 1);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if from != server {
                continue;
            }

            let mut batch = MessageBatch::from_datagram(&buf[..len])?;
            let Some((id, map_name, extras)) = take_handshake(&mut batch) else {
                warn!("handshake reply carried no ConnectReply, retrying");
                continue;
            };
            let Some(id) = id else {
                return Err(ConnectError::Rejected(server));
            };

            let mut world = ClientWorld::new(id, nick);
            world.map = load_map(map_dir, &map_name);
            world.begin_batch();
            for message in &extras {
                world.apply(message);
            }
            world.end_batch();
            info!("connected to {} as id {} on map '{}'", server, id, map_name);

            socket.set_read_timeout(Some(RECV_TIMEOUT))?;
            let inbound = Arc::new(Inbound::default());
            let shutdown = Arc::new(AtomicBool::new(false));
            let receiver = {
                let socket = socket.try_clone()?;
                let inbound = Arc::clone(&inbound);
                let shutdown = Arc::clone(&shutdown);
                std::thread::Builder::new()
                    .name("client-receiver".to_string())
                    .spawn(move || receiver_loop(socket, server, inbound, shutdown))?
            };

            return Ok(Client {
                socket,
                server,
                world,
                seq: 1,
                inbound,
                shutdown,
                receiver: Some(receiver),
            });
        }

        Err(ConnectError::NoReply(server, attempts))
    }

    /// Sends one message as its own batch, stamping id and sequence.
    fn send(&mut self, body: MessageBody) -> io::Result<()> {
        self.seq += 1;
        let message = Message {
            seq: self.seq,
            player: self.world.id,
            body,
        };
        let mut batch = MessageBatch::new();
        batch
            .push(&message)
            .expect("a fresh batch holds one message");
        self.socket.send_to(batch.as_datagram(), self.server)?;
        Ok(())
    }

    /// Drains any batches the receiver has buffered, applying each as
    /// one unit so the enemy snapshot stays batch-consistent. Waits up
    /// to `timeout` for the first batch.
    pub fn pump(&mut self, timeout: Duration) {
        let drained = {
            let mut batches = self.inbound.batches.lock();
            if batches.is_empty() {
                let _ = self.inbound.ready.wait_for(&mut batches, timeout);
            }
            std::mem::take(&mut *batches)
        };

        for mut batch in drained {
            self.world.begin_batch();
            while let Some(message) = batch.pop() {
                self.world.apply(&message);
            }
            self.world.end_batch();
        }
    }

    /// Main loop: forward input, apply server batches, render. Returns
    /// when the player quits or the server goes away.
    pub fn run<U: Renderer + InputSource>(&mut self, ui: &mut U) -> io::Result<()> {
        loop {
            while let Some(event) = ui.poll() {
                match event {
                    InputEvent::Walk(direction) => {
                        self.world.try_walk(direction);
                        self.send(MessageBody::Walk { direction })?;
                    }
                    InputEvent::Shoot(weapon) => self.send(MessageBody::Shoot { weapon })?,
                    InputEvent::Quit => {
                        self.send(MessageBody::ClientQuit)?;
                        return Ok(());
                    }
                }
            }

            self.pump(RECV_TIMEOUT * 2);
            ui.render(&WorldSnapshot::of(&self.world));

            if self.world.server_gone {
                return Ok(());
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
    }
}

/// Pulls the `ConnectReply` out of the handshake batch. Returns the
/// assigned id (`None` on a negative ack), the map name, and every other
/// message the batch carried, in push order.
#[allow(clippy::type_complexity)]
fn take_handshake(batch: &mut MessageBatch) -> Option<(Option<u8>, String, Vec<Message>)> {
    let mut reply = None;
    let mut extras = Vec::new();
    while let Some(message) = batch.pop() {
        match message.body {
            MessageBody::ConnectReply { ok, id, map_name } => {
                reply = Some((ok, id, map_name));
            }
            _ => extras.push(message),
        }
    }
    extras.reverse();

    let (ok, id, map_name) = reply?;
    let id = (ok != 0).then_some(id);
    Some((id, map_name, extras))
}

/// Loads the named map for movement prediction. Failure is tolerated:
/// the client still plays, it just never predicts a move.
fn load_map(map_dir: &Path, name: &str) -> Option<Map> {
    let path: PathBuf = map_dir.join(format!("{}.map", name));
    match Map::load(&path) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!("could not load map '{}': {}; prediction disabled", name, e);
            None
        }
    }
}

fn receiver_loop(
    socket: UdpSocket,
    server: SocketAddr,
    inbound: Arc<Inbound>,
    shutdown: Arc<AtomicBool>,
) {
    let mut buf = [0u8; MAX_DATAGRAM_LEN];
    while !shutdown.load(Ordering::SeqCst) {
        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => {
                warn!("receive failed: {}", e);
                continue;
            }
        };
        if from != server {
            continue;
        }

        match MessageBatch::from_datagram(&buf[..len]) {
            Ok(batch) => {
                let mut batches = inbound.batches.lock();
                if batches.len() == INBOUND_CAPACITY {
                    warn!("inbound buffer full, dropping oldest batch");
                    batches.remove(0);
                }
                batches.push(batch);
                inbound.ready.notify_one();
            }
            Err(e) => warn!("dropping malformed datagram: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    /// Minimal scripted peer: answers the first datagram with the given
    /// messages as one batch.
    fn fake_server(replies: Vec<Message>) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();
        thread::spawn(move || {
            let mut buf = [0u8; MAX_DATAGRAM_LEN];
            let (_, from) = socket.recv_from(&mut buf).unwrap();
            let mut batch = MessageBatch::new();
            for message in &replies {
                batch.push(message).unwrap();
            }
            socket.send_to(batch.as_datagram(), from).unwrap();
        });
        addr
    }

    fn reply(ok: u8, id: u8) -> Message {
        Message {
            seq: 1,
            player: id,
            body: MessageBody::ConnectReply {
                ok,
                id,
                map_name: "nowhere".to_string(),
            },
        }
    }

    #[test]
    fn handshake_applies_the_whole_first_batch() {
        let addr = fake_server(vec![
            reply(1, 3),
            Message {
                seq: 2,
                player: 3,
                body: MessageBody::PlayerPosition { x: 4, y: 5 },
            },
            Message {
                seq: 3,
                player: 3,
                body: MessageBody::OnBonus { kind: 0, index: 0 },
            },
        ]);

        let client = Client::connect_with(
            &addr.to_string(),
            "tester",
            Path::new("no-such-dir"),
            3,
            Duration::from_millis(500),
        )
        .unwrap();

        assert_eq!(client.world.id, 3);
        assert_eq!((client.world.x, client.world.y), (4, 5));
        // The named map does not exist locally; prediction is off.
        assert!(client.world.map.is_none());
    }

    #[test]
    fn hostname_server_address_resolves() {
        let addr = fake_server(vec![reply(1, 0)]);

        let client = Client::connect_with(
            &format!("localhost:{}", addr.port()),
            "tester",
            Path::new("no-such-dir"),
            3,
            Duration::from_millis(500),
        )
        .unwrap();

        assert_eq!(client.world.id, 0);
    }

    #[test]
    fn negative_ack_is_a_rejection() {
        let addr = fake_server(vec![reply(0, 0)]);

        let result = Client::connect_with(
            &addr.to_string(),
            "tester",
            Path::new("no-such-dir"),
            3,
            Duration::from_millis(500),
        );

        assert!(matches!(result, Err(ConnectError::Rejected(_))));
    }

    #[test]
    fn silent_server_exhausts_the_retries() {
        // Bound but never read: every attempt times out.
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = socket.local_addr().unwrap();

        let result = Client::connect_with(
            &addr.to_string(),
            "tester",
            Path::new("no-such-dir"),
            2,
            Duration::from_millis(50),
        );

        assert!(matches!(result, Err(ConnectError::NoReply(_, 2))));
    }
}

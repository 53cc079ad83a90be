//! Shared server state and lock ownership.
//!
//! Every piece of state touched by both threads lives here behind its
//! own mutex; free functions receive the context explicitly instead of
//! reaching for globals. The queue mutex doubles as the lock paired
//! with the tick condvar. Lock order when several are held: map, then
//! registry, then bullets, then bonuses.

use crate::ballistics::Bullet;
use crate::bonuses::BonusList;
use crate::queue::MessageQueue;
use crate::registry::PlayerRegistry;
use log::error;
use parking_lot::{Condvar, Mutex};
use shared::batch::MessageBatch;
use shared::map::Map;
use shared::tick;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocking receive waits before rechecking the tick clock
/// and the shutdown flag.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(20);

pub struct ServerContext {
    socket: UdpSocket,
    pub registry: Mutex<PlayerRegistry>,
    pub map: Mutex<Map>,
    pub bullets: Mutex<Vec<Bullet>>,
    pub bonuses: Mutex<BonusList>,
    /// Inbound queue; its mutex is the one the tick condvar waits on.
    pub queue: Mutex<MessageQueue>,
    pub tick: Condvar,
    pub tick_interval: Duration,
    shutdown: AtomicBool,
}

impl ServerContext {
    /// Binds the server socket and assembles the shared state.
    ///
    /// A bind failure is fatal at startup; the caller aborts.
    pub fn bind(addr: &str, map: Map, tick_rate: u32) -> io::Result<Arc<Self>> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;

        Ok(Arc::new(ServerContext {
            socket,
            registry: Mutex::new(PlayerRegistry::new()),
            map: Mutex::new(map),
            bullets: Mutex::new(Vec::new()),
            bonuses: Mutex::new(BonusList::new()),
            queue: Mutex::new(MessageQueue::new()),
            tick: Condvar::new(),
            tick_interval: tick::tick_interval(tick_rate),
            shutdown: AtomicBool::new(false),
        }))
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Flushes one batch as a single datagram. Send failures are logged
    /// and absorbed; the protocol tolerates loss.
    pub fn send_batch(&self, batch: &MessageBatch, addr: SocketAddr) {
        if let Err(e) = self.socket.send_to(batch.as_datagram(), addr) {
            error!("failed to send batch to {}: {}", addr, e);
        }
    }

    /// Flags both threads to wind down and wakes the simulator.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.tick.notify_all();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

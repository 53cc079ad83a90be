//! The receiver and simulation threads.
//!
//! The receiver owns the socket read side and the tick clock: it blocks
//! on `recv_from` with a short timeout, decodes each datagram into the
//! shared queue, and signals the tick condvar whenever a tick interval
//! has elapsed. The simulator wakes on that signal, drains the queue,
//! and runs one tick: apply inbound messages, advance bullets, broadcast
//! positions, flush outbound batches. All game state is touched by the
//! simulator only.

use crate::ballistics::{self, Bullet};
use crate::bonuses::BonusList;
use crate::context::ServerContext;
use crate::events;
use crate::queue::QueueEntry;
use crate::registry::PlayerRegistry;
use log::{error, info, warn};
use rand::Rng;
use shared::batch::{MessageBatch, MAX_DATAGRAM_LEN};
use shared::map::Map;
use shared::protocol::MessageBody;
use shared::tick::TickClock;
use std::io::ErrorKind;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Blocking receive loop; runs until shutdown is requested.
pub fn receiver_loop(ctx: Arc<ServerContext>) {
    let mut clock = TickClock::start();
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    while !ctx.is_shutting_down() {
        if clock.due(ctx.tick_interval) {
            clock.advance();
            ctx.tick.notify_one();
        }

        let (len, addr) = match ctx.socket().recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => {
                error!("receive failed: {}", e);
                continue;
            }
        };

        let mut batch = match MessageBatch::from_datagram(&buf[..len]) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("dropping malformed datagram from {}: {}", addr, e);
                continue;
            }
        };

        let mut queue = ctx.queue.lock();
        while let Some(message) = batch.pop() {
            let entry = QueueEntry {
                message,
                addr,
                player: None,
            };
            if let Err(e) = queue.push(entry) {
                warn!("dropping message from {}: {}", addr, e);
            }
        }
    }
}

/// Tick loop; waits for the receiver's signal, then simulates one tick.
pub fn simulator_loop(ctx: Arc<ServerContext>) {
    let mut rng = rand::thread_rng();

    loop {
        let mut entries = Vec::new();
        {
            let mut queue = ctx.queue.lock();
            // Bounded wait so a lost signal cannot wedge the loop.
            let _ = ctx.tick.wait_for(&mut queue, ctx.tick_interval * 2);
            if ctx.is_shutting_down() {
                return;
            }
            while let Some(entry) = queue.pop() {
                entries.push(entry);
            }
        }
        run_tick(&ctx, entries, &mut rng);
    }
}

/// Stamps the entry with a session id when the header id names a player
/// whose address matches the datagram source.
fn resolve(registry: &PlayerRegistry, entry: &mut QueueEntry) {
    let id = entry.message.player;
    if registry.get(id).is_some_and(|p| p.addr == entry.addr) {
        entry.player = Some(id);
    }
}

fn apply_entry(
    ctx: &ServerContext,
    map: &Map,
    registry: &mut PlayerRegistry,
    bullets: &mut Vec<Bullet>,
    bonuses: &mut BonusList,
    entry: QueueEntry,
    rng: &mut impl Rng,
) {
    // Connects are the one message with no session yet.
    if let MessageBody::ConnectRequest { nick } = &entry.message.body {
        events::handle_connect_request(ctx, map, registry, entry.addr, nick, rng);
        return;
    }

    let Some(id) = entry.player else {
        warn!(
            "dropping tag {} from unknown session at {}",
            entry.message.body.tag(),
            entry.addr
        );
        return;
    };

    match entry.message.body {
        MessageBody::Walk { direction } => {
            events::handle_walk(map, registry, bonuses, id, direction);
        }
        MessageBody::Shoot { weapon } => events::handle_shoot(registry, bullets, id, weapon),
        MessageBody::ClientQuit => events::handle_client_quit(registry, id),
        other => warn!(
            "unexpected client message tag {} from {}",
            other.tag(),
            entry.addr
        ),
    }
}

/// One full simulation step over a drained queue.
pub fn run_tick(ctx: &ServerContext, entries: Vec<QueueEntry>, rng: &mut impl Rng) {
    let mut map = ctx.map.lock();
    let mut registry = ctx.registry.lock();
    let mut bullets = ctx.bullets.lock();
    let mut bonuses = ctx.bonuses.lock();

    for mut entry in entries {
        resolve(&registry, &mut entry);
        apply_entry(
            ctx,
            &map,
            &mut registry,
            &mut bullets,
            &mut bonuses,
            entry,
            rng,
        );
    }

    ballistics::advance(&mut map, &mut registry, &mut bullets, rng);
    events::broadcast_positions(&mut registry);
    events::flush(ctx, &mut registry);
}

/// Running server: the shared context plus both thread handles.
pub struct Server {
    ctx: Arc<ServerContext>,
    receiver: Option<JoinHandle<()>>,
    simulator: Option<JoinHandle<()>>,
}

impl Server {
    /// Spawns the receiver and simulator threads.
    pub fn start(ctx: Arc<ServerContext>) -> std::io::Result<Self> {
        info!("server listening on {}", ctx.local_addr()?);

        let receiver = {
            let ctx = Arc::clone(&ctx);
            std::thread::Builder::new()
                .name("receiver".to_string())
                .spawn(move || receiver_loop(ctx))?
        };
        let simulator = {
            let ctx = Arc::clone(&ctx);
            std::thread::Builder::new()
                .name("simulator".to_string())
                .spawn(move || simulator_loop(ctx))?
        };

        Ok(Server {
            ctx,
            receiver: Some(receiver),
            simulator: Some(simulator),
        })
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Stops both threads, then sends every connected player a final
    /// batch carrying the shutdown announcement.
    pub fn stop(mut self) {
        self.ctx.request_shutdown();
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.simulator.take() {
            let _ = handle.join();
        }

        let mut registry = self.ctx.registry.lock();
        events::server_shutdown(&mut registry);
        events::flush(&self.ctx, &mut registry);
        info!("server stopped");
    }

    /// Waits for the threads without initiating shutdown; used by the
    /// binary, which runs until killed.
    pub fn join(mut self) {
        if let Some(handle) = self.receiver.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.simulator.take() {
            let _ = handle.join();
        }
    }
}

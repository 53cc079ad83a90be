//! Authoritative game server.
//!
//! The server owns the canonical world state and replicates it to
//! clients over UDP at a fixed tick rate. Two threads share the work:
//! a receiver that blocks on the socket, decodes datagrams into the
//! message queue and signals the tick condvar, and a simulator that
//! wakes once per tick, drains the queue, applies every event handler,
//! advances ballistics and broadcasts interest-filtered position
//! updates.
//!
//! All shared state lives in [`context::ServerContext`] behind its own
//! locks; when the map and registry are both needed, the map lock is
//! taken first.

pub mod ballistics;
pub mod bonuses;
pub mod context;
pub mod events;
pub mod network;
pub mod queue;
pub mod registry;

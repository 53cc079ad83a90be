//! Bounded inbound message queue.
//!
//! The receiver thread pushes decoded messages here; the simulator
//! drains the whole queue once per tick. A full queue drops the entry
//! and surfaces the error to the caller for logging; loss is tolerated
//! by the best-effort protocol. Like the batch, the queue is a stack:
//! within one tick messages are not applied in arrival order.

use shared::protocol::Message;
use std::net::SocketAddr;
use thiserror::Error;

/// Fixed queue capacity; more than a tick's worth of traffic is dropped.
pub const QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("message queue is full ({QUEUE_CAPACITY} entries)")]
pub struct QueueFull;

/// One decoded inbound message plus its provenance.
#[derive(Debug)]
pub struct QueueEntry {
    pub message: Message,
    /// Datagram source address.
    pub addr: SocketAddr,
    /// Session id, once resolved against the registry at drain time.
    pub player: Option<u8>,
}

#[derive(Debug, Default)]
pub struct MessageQueue {
    entries: Vec<QueueEntry>,
}

impl MessageQueue {
    pub fn new() -> Self {
        MessageQueue {
            entries: Vec::with_capacity(QUEUE_CAPACITY),
        }
    }

    pub fn push(&mut self, entry: QueueEntry) -> Result<(), QueueFull> {
        if self.entries.len() == QUEUE_CAPACITY {
            return Err(QueueFull);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Removes the most recently pushed entry.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

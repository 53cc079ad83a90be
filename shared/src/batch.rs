//! Stack-ordered message batching.
//!
//! A batch coalesces many encoded messages into one datagram so each
//! tick costs a single `send_to` per recipient. The wire framing is a
//! one-byte occupancy count followed by the concatenated messages; the
//! count byte caps a batch at 255 messages.
//!
//! Push appends, pop removes the *most recently pushed* message. The
//! batch is a stack, not a FIFO: a receiver draining one datagram sees
//! its messages in reverse arrival order.

use crate::protocol::{CodecError, Message, MAX_WIRE_LEN};
use thiserror::Error;

/// Hard cap on messages per batch, fixed by the one-byte count prefix.
pub const MAX_MESSAGES: usize = 255;

/// Largest datagram a batch can produce.
pub const MAX_DATAGRAM_LEN: usize = 1 + MAX_MESSAGES * MAX_WIRE_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("message batch is full ({MAX_MESSAGES} messages)")]
pub struct BatchFull;

/// An append-only byte region of encoded messages plus the count prefix.
///
/// Invariant: `buf[0]` always equals `offsets.len()`, and `buf` holds
/// exactly the bytes of that many well-formed messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl MessageBatch {
    pub fn new() -> Self {
        MessageBatch {
            buf: vec![0],
            offsets: Vec::new(),
        }
    }

    /// Number of messages currently held.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Appends an encoded message. Fails without mutating the batch when
    /// the count prefix would overflow.
    pub fn push(&mut self, message: &Message) -> Result<(), BatchFull> {
        if self.offsets.len() == MAX_MESSAGES {
            return Err(BatchFull);
        }

        self.offsets.push(self.buf.len());
        message.encode(&mut self.buf);
        self.buf[0] += 1;
        Ok(())
    }

    /// Removes and returns the most recently pushed message.
    pub fn pop(&mut self) -> Option<Message> {
        let offset = self.offsets.pop()?;
        // The region past `offset` was written by push/from_datagram, so
        // it decodes.
        let message = Message::decode(&mut &self.buf[offset..]).ok()?;
        self.buf.truncate(offset);
        self.buf[0] -= 1;
        Some(message)
    }

    /// The exact bytes to hand to one `send_to` call.
    pub fn as_datagram(&self) -> &[u8] {
        &self.buf
    }

    /// Parses one received datagram as a batch.
    ///
    /// The count prefix drives the parse; a short buffer or bytes left
    /// over after `count` messages is an error, never a partial batch.
    pub fn from_datagram(data: &[u8]) -> Result<Self, CodecError> {
        let (&count, mut rest) = data.split_first().ok_or(CodecError::Truncated {
            needed: 1,
            got: 0,
        })?;

        let mut batch = MessageBatch::new();
        for _ in 0..count {
            let message = Message::decode(&mut rest)?;
            // Cannot overflow: count fits in the prefix byte.
            let _ = batch.push(&message);
        }

        if !rest.is_empty() {
            return Err(CodecError::TrailingBytes {
                count,
                trailing: rest.len(),
            });
        }

        Ok(batch)
    }

    /// Drops all messages, keeping the allocation for the next tick.
    pub fn clear(&mut self) {
        self.buf.truncate(1);
        self.buf[0] = 0;
        self.offsets.clear();
    }
}

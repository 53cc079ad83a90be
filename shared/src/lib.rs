//! Protocol and world primitives shared by the game server and client.
//!
//! Everything in this crate is pure data manipulation: the wire codec and
//! batch framing, the static weapon/health/armor catalogs, the grid map
//! model, and the tick clock. No sockets, no threads.

pub mod batch;
pub mod catalog;
pub mod map;
pub mod protocol;
pub mod tick;

pub use batch::{BatchFull, MessageBatch};
pub use protocol::{CodecError, Direction, Message, MessageBody};

/// Maximum number of simultaneously connected players.
pub const MAX_PLAYERS: usize = 16;

/// Area-of-interest rectangle dimensions, in cells.
pub const VIEWPORT_WIDTH: u16 = 30;
pub const VIEWPORT_HEIGHT: u16 = 30;

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 10;

/// Default UDP port the server listens on.
pub const DEFAULT_PORT: u16 = 6006;

/// Returns true if `subject` lies inside the `width` x `height` rectangle
/// centered on `observer`, bounds inclusive.
///
/// The rectangle is observer-centered, so two players with different
/// viewport dimensions need not see each other mutually.
pub fn in_viewport(observer: (u16, u16), subject: (u16, u16), width: u16, height: u16) -> bool {
    let dx = observer.0.abs_diff(subject.0);
    let dy = observer.1.abs_diff(subject.1);
    dx <= width / 2 && dy <= height / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_includes_observer_cell() {
        assert!(in_viewport((10, 10), (10, 10), VIEWPORT_WIDTH, VIEWPORT_HEIGHT));
    }

    #[test]
    fn viewport_bounds_are_inclusive() {
        // Half extents of a 30x30 viewport are 15 cells.
        assert!(in_viewport((20, 20), (35, 20), 30, 30));
        assert!(in_viewport((20, 20), (20, 5), 30, 30));
        assert!(!in_viewport((20, 20), (36, 20), 30, 30));
        assert!(!in_viewport((20, 20), (20, 4), 30, 30));
    }

    #[test]
    fn viewport_is_not_mutual_for_unequal_dimensions() {
        let a = (10, 10);
        let b = (22, 10);

        // A's wide viewport covers B, but B's narrow viewport misses A.
        assert!(in_viewport(a, b, 30, 30));
        assert!(!in_viewport(b, a, 10, 10));
    }
}

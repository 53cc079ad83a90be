//! Client-side world mirror.
//!
//! The server is authoritative; this module only replays what it says.
//! The one speculative piece is [`ClientWorld::try_walk`], which moves
//! the local player immediately using the cheap grid-only collision
//! check so input feels instant. The next `PlayerPosition` echo
//! overwrites the prediction, correcting any divergence (another player
//! in the cell, for instance, which the grid check cannot see).

use log::{debug, info, warn};
use shared::catalog::{DEFAULT_ARMOR, DEFAULT_HP};
use shared::map::Map;
use shared::protocol::{Direction, Message, MessageBody};

/// Everything the client knows about the game, rebuilt from server
/// messages.
#[derive(Debug)]
pub struct ClientWorld {
    /// Session id assigned by the connect handshake.
    pub id: u8,
    pub nick: String,
    pub x: u16,
    pub y: u16,
    pub hp: u16,
    pub armor: u16,
    /// Grid mirror of the server map; absent until loaded after the
    /// handshake names it.
    pub map: Option<Map>,
    /// Enemy positions from the most recent complete server batch.
    enemies: Vec<(u16, u16)>,
    /// Enemy positions accumulating from the batch being applied.
    staged_enemies: Vec<(u16, u16)>,
    /// One-line notification for the UI (joins, leaves, pickups).
    pub notice: Option<String>,
    /// Set once the server announces shutdown.
    pub server_gone: bool,
}

impl ClientWorld {
    pub fn new(id: u8, nick: &str) -> Self {
        ClientWorld {
            id,
            nick: nick.to_string(),
            x: 0,
            y: 0,
            hp: DEFAULT_HP,
            armor: DEFAULT_ARMOR,
            map: None,
            enemies: Vec::new(),
            staged_enemies: Vec::new(),
            notice: None,
            server_gone: false,
        }
    }

    /// Marks the start of one server batch. Enemy positions are a full
    /// snapshot per tick, so the stage starts empty.
    pub fn begin_batch(&mut self) {
        self.staged_enemies.clear();
    }

    /// Marks the end of one server batch; the staged enemy snapshot
    /// becomes current only if the batch carried one.
    pub fn end_batch(&mut self) {
        if !self.staged_enemies.is_empty() {
            std::mem::swap(&mut self.enemies, &mut self.staged_enemies);
        }
    }

    pub fn enemies(&self) -> &[(u16, u16)] {
        &self.enemies
    }

    /// Applies one server message to the mirror.
    pub fn apply(&mut self, message: &Message) {
        match &message.body {
            MessageBody::PlayerPosition { x, y } => {
                self.x = *x;
                self.y = *y;
            }
            MessageBody::EnemyPosition { x, y } => {
                self.staged_enemies.push((*x, *y));
            }
            MessageBody::PlayerHit { hp, armor } => {
                self.hp = *hp;
                self.armor = *armor;
                self.notice = Some(format!("hit! hp {} armor {}", hp, armor));
            }
            MessageBody::MapExplode { x, y } => {
                if let Some(map) = &mut self.map {
                    map.destroy_wall(*x, *y);
                }
            }
            MessageBody::OnBonus { kind, index } => {
                debug!("picked up bonus kind {} index {}", kind, index);
                self.notice = Some("picked up a bonus".to_string());
            }
            MessageBody::ConnectNotify { nick } => {
                info!("player {} joined", nick);
                self.notice = Some(format!("{} joined", nick));
            }
            MessageBody::DisconnectNotify { nick } => {
                info!("player {} left", nick);
                self.notice = Some(format!("{} left", nick));
            }
            MessageBody::ServerShutdown => {
                info!("server is shutting down");
                self.server_gone = true;
            }
            // A late duplicate of the handshake answer carries nothing
            // new.
            MessageBody::ConnectReply { .. } => {}
            other => warn!("ignoring server message with tag {}", other.tag()),
        }
    }

    /// Predicted one-cell move. Facing always updates; the position
    /// moves when the grid allows it. Returns true if the prediction
    /// moved the player.
    pub fn try_walk(&mut self, direction: Direction) -> bool {
        let (nx, ny) = match direction {
            Direction::Left => (self.x.saturating_sub(1), self.y),
            Direction::Right => (self.x.saturating_add(1), self.y),
            Direction::Up => (self.x, self.y.saturating_sub(1)),
            Direction::Down => (self.x, self.y.saturating_add(1)),
        };
        let blocked = self
            .map
            .as_ref()
            .map(|m| m.is_blocked(nx, ny))
            .unwrap_or(true);
        if !blocked {
            self.x = nx;
            self.y = ny;
        }
        !blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_map() -> Map {
        Map::parse("arena", "#####\n#@..#\n#...#\n#..@#\n#####").unwrap()
    }

    fn msg(body: MessageBody) -> Message {
        Message {
            seq: 1,
            player: 0,
            body,
        }
    }

    #[test]
    fn position_echo_is_authoritative() {
        let mut world = ClientWorld::new(0, "me");
        world.apply(&msg(MessageBody::PlayerPosition { x: 7, y: 9 }));
        assert_eq!((world.x, world.y), (7, 9));
    }

    #[test]
    fn predicted_walk_respects_the_grid() {
        let mut world = ClientWorld::new(0, "me");
        world.map = Some(test_map());
        world.x = 2;
        world.y = 2;

        assert!(world.try_walk(Direction::Right));
        assert_eq!((world.x, world.y), (3, 2));

        // Up from the top row is a wall; no move.
        world.y = 2;
        assert!(!world.try_walk(Direction::Up));
        assert_eq!((world.x, world.y), (3, 2));
    }

    #[test]
    fn walk_without_a_map_never_moves() {
        let mut world = ClientWorld::new(0, "me");
        world.x = 5;
        world.y = 5;
        assert!(!world.try_walk(Direction::Left));
        assert_eq!((world.x, world.y), (5, 5));
    }

    #[test]
    fn server_echo_overrides_misprediction() {
        let mut world = ClientWorld::new(0, "me");
        world.map = Some(test_map());
        world.x = 2;
        world.y = 2;

        // The grid says the cell is free, but the server saw another
        // player there and keeps us in place.
        world.try_walk(Direction::Right);
        world.apply(&msg(MessageBody::PlayerPosition { x: 2, y: 2 }));
        assert_eq!((world.x, world.y), (2, 2));
    }

    #[test]
    fn enemy_snapshot_is_rebuilt_per_batch() {
        let mut world = ClientWorld::new(0, "me");

        world.begin_batch();
        world.apply(&msg(MessageBody::EnemyPosition { x: 1, y: 1 }));
        world.apply(&msg(MessageBody::EnemyPosition { x: 2, y: 2 }));
        world.end_batch();
        assert_eq!(world.enemies(), &[(1, 1), (2, 2)]);

        world.begin_batch();
        world.apply(&msg(MessageBody::EnemyPosition { x: 3, y: 3 }));
        world.end_batch();
        assert_eq!(world.enemies(), &[(3, 3)]);

        // A batch with no positions keeps the last known snapshot.
        world.begin_batch();
        world.end_batch();
        assert_eq!(world.enemies(), &[(3, 3)]);
    }

    #[test]
    fn explosions_update_the_map_mirror() {
        let mut world = ClientWorld::new(0, "me");
        world.map = Some(test_map());

        world.apply(&msg(MessageBody::MapExplode { x: 1, y: 1 }));
        assert!(!world.map.as_ref().unwrap().is_blocked(1, 1));
    }

    #[test]
    fn hit_and_shutdown_update_state() {
        let mut world = ClientWorld::new(0, "me");
        world.apply(&msg(MessageBody::PlayerHit { hp: 42, armor: 7 }));
        assert_eq!((world.hp, world.armor), (42, 7));

        assert!(!world.server_gone);
        world.apply(&msg(MessageBody::ServerShutdown));
        assert!(world.server_gone);
    }
}

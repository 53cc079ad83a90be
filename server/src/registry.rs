//! Connected-player registry.
//!
//! Players live in a fixed arena of `MAX_PLAYERS` slots addressed by
//! their session id; a free slot is simply `None`. Occupying assigns the
//! lowest free id, releasing makes the id eligible for reuse by a later
//! connect.

use log::info;
use shared::batch::MessageBatch;
use shared::catalog::{self, WEAPONS, WEAPON_COUNT, WEAPON_GUN};
use shared::map::{Cell, Map};
use shared::protocol::Direction;
use shared::MAX_PLAYERS;
use std::net::SocketAddr;

/// Per-player weapon ownership and ammunition, indexed by catalog slot.
#[derive(Debug, Clone)]
pub struct WeaponInventory {
    owned: [bool; WEAPON_COUNT],
    ammo: [u16; WEAPON_COUNT],
    /// Currently selected catalog index.
    pub current: u8,
}

impl WeaponInventory {
    fn new() -> Self {
        WeaponInventory {
            owned: [false; WEAPON_COUNT],
            ammo: [0; WEAPON_COUNT],
            current: WEAPON_GUN,
        }
    }

    /// Marks a weapon owned and refills its ammo to the catalog default.
    pub fn grant(&mut self, index: u8) {
        if let Some(weapon) = WEAPONS.get(index as usize) {
            self.owned[index as usize] = true;
            self.ammo[index as usize] = weapon.ammo;
        }
    }

    pub fn owns(&self, index: u8) -> bool {
        self.owned.get(index as usize).copied().unwrap_or(false)
    }

    pub fn ammo(&self, index: u8) -> u16 {
        self.ammo.get(index as usize).copied().unwrap_or(0)
    }

    /// Consumes one round of the given weapon if any remains.
    pub fn take_round(&mut self, index: u8) -> bool {
        match self.ammo.get_mut(index as usize) {
            Some(rounds) if *rounds > 0 => {
                *rounds -= 1;
                true
            }
            _ => false,
        }
    }
}

/// One connected session and everything the simulation knows about it.
#[derive(Debug)]
pub struct Player {
    pub id: u8,
    pub addr: SocketAddr,
    pub nick: String,
    /// Monotonic per-session sequence counter for outbound messages.
    pub seq: u32,
    /// 1-indexed map coordinates.
    pub x: u16,
    pub y: u16,
    pub direction: Direction,
    pub hp: u16,
    pub armor: u16,
    pub weapons: WeaponInventory,
    /// Outbound messages accumulated for this tick.
    pub batch: MessageBatch,
}

impl Player {
    fn new(id: u8, addr: SocketAddr, nick: &str) -> Self {
        let mut weapons = WeaponInventory::new();
        weapons.grant(WEAPON_GUN);

        Player {
            id,
            addr,
            nick: nick.to_string(),
            seq: 0,
            x: 1,
            y: 1,
            direction: Direction::Down,
            hp: catalog::DEFAULT_HP,
            armor: catalog::DEFAULT_ARMOR,
            weapons,
            batch: MessageBatch::new(),
        }
    }
}

/// What a cell move runs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    None,
    Wall,
    Player,
}

/// Arena of player slots; `slots[id]` is the player with that id.
pub struct PlayerRegistry {
    slots: Vec<Option<Player>>,
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerRegistry {
    pub fn new() -> Self {
        PlayerRegistry {
            slots: (0..MAX_PLAYERS).map(|_| None).collect(),
        }
    }

    /// Claims the lowest free slot for a new connection, resetting the
    /// player to spawn defaults. Returns `None` when every slot is taken.
    pub fn occupy(&mut self, addr: SocketAddr, nick: &str) -> Option<u8> {
        let free = self.slots.iter().position(|slot| slot.is_none())?;
        let id = free as u8;
        self.slots[free] = Some(Player::new(id, addr, nick));
        info!(
            "player {} connected as id {}, total players: {}",
            nick,
            id,
            self.len()
        );
        Some(id)
    }

    /// Frees a slot; the id becomes reusable by a future connect.
    pub fn release(&mut self, id: u8) -> bool {
        match self.slots.get_mut(id as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: u8) -> Option<&Player> {
        self.slots.get(id as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: u8) -> Option<&mut Player> {
        self.slots.get_mut(id as usize)?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.slots.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Full server-side occupancy check for a candidate cell: off-map or
/// wall cells collide as `Wall`; a cell holding any connected player
/// other than `moving_id` collides as `Player`.
pub fn collision_at(map: &Map, registry: &PlayerRegistry, x: u16, y: u16, moving_id: u8) -> Collision {
    if map.cell(x, y) == Cell::Wall {
        return Collision::Wall;
    }
    if registry
        .iter()
        .any(|p| p.id != moving_id && p.x == x && p.y == y)
    {
        return Collision::Player;
    }
    Collision::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::catalog::WEAPON_ROCKET;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    #[test]
    fn occupy_assigns_lowest_free_id() {
        let mut registry = PlayerRegistry::new();
        assert_eq!(registry.occupy(addr(1000), "a"), Some(0));
        assert_eq!(registry.occupy(addr(1001), "b"), Some(1));
        assert_eq!(registry.occupy(addr(1002), "c"), Some(2));

        registry.release(1);
        assert_eq!(registry.occupy(addr(1003), "d"), Some(1));
        assert_eq!(registry.occupy(addr(1004), "e"), Some(3));
    }

    #[test]
    fn occupy_fails_when_full() {
        let mut registry = PlayerRegistry::new();
        for i in 0..MAX_PLAYERS {
            assert!(registry.occupy(addr(2000 + i as u16), "p").is_some());
        }
        assert_eq!(registry.occupy(addr(3000), "late"), None);
        assert_eq!(registry.len(), MAX_PLAYERS);
    }

    #[test]
    fn released_id_is_reusable_exactly_once() {
        let mut registry = PlayerRegistry::new();
        for i in 0..MAX_PLAYERS {
            registry.occupy(addr(2000 + i as u16), "p");
        }

        assert!(registry.release(5));
        assert!(!registry.release(5));

        assert_eq!(registry.occupy(addr(4000), "newnick"), Some(5));
        assert_eq!(registry.get(5).unwrap().nick, "newnick");
        assert_eq!(registry.occupy(addr(4001), "nobody"), None);
    }

    #[test]
    fn occupy_resets_vitals_to_defaults() {
        let mut registry = PlayerRegistry::new();
        let id = registry.occupy(addr(5000), "fresh").unwrap();
        let player = registry.get(id).unwrap();

        assert_eq!(player.hp, catalog::DEFAULT_HP);
        assert_eq!(player.armor, catalog::DEFAULT_ARMOR);
        assert_eq!(player.weapons.current, WEAPON_GUN);
        assert!(player.weapons.owns(WEAPON_GUN));
        assert!(!player.weapons.owns(WEAPON_ROCKET));
        assert!(player.batch.is_empty());
    }

    #[test]
    fn len_matches_iteration() {
        let mut registry = PlayerRegistry::new();
        registry.occupy(addr(6000), "a");
        registry.occupy(addr(6001), "b");
        registry.release(0);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.iter().count(), registry.len());
        let ids: Vec<u8> = registry.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn inventory_rounds_run_out() {
        let mut inventory = WeaponInventory::new();
        inventory.grant(WEAPON_ROCKET);

        let rounds = WEAPONS[WEAPON_ROCKET as usize].ammo;
        for _ in 0..rounds {
            assert!(inventory.take_round(WEAPON_ROCKET));
        }
        assert!(!inventory.take_round(WEAPON_ROCKET));
        assert_eq!(inventory.ammo(WEAPON_ROCKET), 0);
    }

    #[test]
    fn collision_reports_walls_and_players() {
        let map = Map::parse("arena", "#####\n#@..#\n#...#\n#..@#\n#####").unwrap();
        let mut registry = PlayerRegistry::new();
        let a = registry.occupy(addr(7000), "a").unwrap();
        let b = registry.occupy(addr(7001), "b").unwrap();
        if let Some(p) = registry.get_mut(a) {
            p.x = 2;
            p.y = 2;
        }
        if let Some(p) = registry.get_mut(b) {
            p.x = 3;
            p.y = 2;
        }

        assert_eq!(collision_at(&map, &registry, 1, 1, a), Collision::Wall);
        assert_eq!(collision_at(&map, &registry, 0, 2, a), Collision::Wall);
        assert_eq!(collision_at(&map, &registry, 3, 2, a), Collision::Player);
        assert_eq!(collision_at(&map, &registry, 2, 2, b), Collision::Player);
        // A player never collides with its own cell.
        assert_eq!(collision_at(&map, &registry, 2, 2, a), Collision::None);
        assert_eq!(collision_at(&map, &registry, 2, 3, a), Collision::None);
    }
}

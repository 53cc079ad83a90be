//! Map-resident pickups.
//!
//! A bonus occupies one cell and grants a weapon, health or armor effect
//! when a player steps onto it. The server seeds bonuses onto empty
//! cells at startup and removes each one as it is collected.

use crate::registry::Player;
use log::info;
use rand::Rng;
use shared::catalog::{BonusKind, ARMOR_ITEMS, ARMOR_MAX, HEALTH_ITEMS, HP_MAX, WEAPONS};
use shared::map::{Cell, Map};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bonus {
    pub kind: BonusKind,
    /// Index into the catalog selected by `kind`.
    pub index: u8,
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Default)]
pub struct BonusList {
    items: Vec<Bonus>,
}

impl BonusList {
    pub fn new() -> Self {
        BonusList { items: Vec::new() }
    }

    pub fn add(&mut self, bonus: Bonus) {
        self.items.push(bonus);
    }

    pub fn search(&self, x: u16, y: u16) -> Option<&Bonus> {
        self.items.iter().find(|b| b.x == x && b.y == y)
    }

    /// Removes and returns the bonus at a cell, if any.
    pub fn take_at(&mut self, x: u16, y: u16) -> Option<Bonus> {
        let index = self.items.iter().position(|b| b.x == x && b.y == y)?;
        Some(self.items.swap_remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Seeds `count` random bonuses onto empty, unoccupied cells.
    pub fn scatter(&mut self, map: &Map, count: usize, rng: &mut impl Rng) {
        let mut placed = 0;
        // Bounded attempts so a cramped map cannot loop forever.
        for _ in 0..count * 16 {
            if placed == count {
                break;
            }
            let x = rng.gen_range(1..=map.width());
            let y = rng.gen_range(1..=map.height());
            if map.cell(x, y) != Cell::Empty || self.search(x, y).is_some() {
                continue;
            }

            let bonus = match rng.gen_range(0..3u8) {
                0 => Bonus {
                    kind: BonusKind::Weapon,
                    index: rng.gen_range(0..WEAPONS.len()) as u8,
                    x,
                    y,
                },
                1 => Bonus {
                    kind: BonusKind::Health,
                    index: rng.gen_range(0..HEALTH_ITEMS.len()) as u8,
                    x,
                    y,
                },
                _ => Bonus {
                    kind: BonusKind::Armor,
                    index: rng.gen_range(0..ARMOR_ITEMS.len()) as u8,
                    x,
                    y,
                },
            };
            self.add(bonus);
            placed += 1;
        }
    }
}

/// Applies a bonus effect to a player's inventory or vitals. Health and
/// armor gains are capped at the catalog maxima.
pub fn apply(player: &mut Player, bonus: &Bonus) {
    match bonus.kind {
        BonusKind::Weapon => {
            player.weapons.grant(bonus.index);
            if let Some(weapon) = WEAPONS.get(bonus.index as usize) {
                info!("player {} picked up weapon: {}", player.nick, weapon.name);
            }
        }
        BonusKind::Health => {
            if let Some(item) = HEALTH_ITEMS.get(bonus.index as usize) {
                player.hp = (player.hp + item.restore).min(HP_MAX);
                info!("player {} picked up {}", player.nick, item.name);
            }
        }
        BonusKind::Armor => {
            if let Some(item) = ARMOR_ITEMS.get(bonus.index as usize) {
                player.armor = (player.armor + item.amount).min(ARMOR_MAX);
                info!("player {} picked up {}", player.nick, item.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PlayerRegistry;
    use shared::catalog::{WEAPON_ROCKET, DEFAULT_HP};

    fn test_player() -> (PlayerRegistry, u8) {
        let mut registry = PlayerRegistry::new();
        let id = registry
            .occupy("127.0.0.1:9000".parse().unwrap(), "picker")
            .unwrap();
        (registry, id)
    }

    #[test]
    fn take_at_removes_exactly_one() {
        let mut bonuses = BonusList::new();
        bonuses.add(Bonus {
            kind: BonusKind::Health,
            index: 0,
            x: 3,
            y: 4,
        });

        assert!(bonuses.search(3, 4).is_some());
        assert!(bonuses.take_at(3, 4).is_some());
        assert!(bonuses.take_at(3, 4).is_none());
        assert!(bonuses.is_empty());
    }

    #[test]
    fn weapon_bonus_grants_catalog_ammo() {
        let (mut registry, id) = test_player();
        let player = registry.get_mut(id).unwrap();

        apply(
            player,
            &Bonus {
                kind: BonusKind::Weapon,
                index: WEAPON_ROCKET,
                x: 0,
                y: 0,
            },
        );

        assert!(player.weapons.owns(WEAPON_ROCKET));
        assert_eq!(
            player.weapons.ammo(WEAPON_ROCKET),
            WEAPONS[WEAPON_ROCKET as usize].ammo
        );
    }

    #[test]
    fn health_bonus_is_capped() {
        let (mut registry, id) = test_player();
        let player = registry.get_mut(id).unwrap();
        player.hp = DEFAULT_HP - 10;

        apply(
            player,
            &Bonus {
                kind: BonusKind::Health,
                index: 1,
                x: 0,
                y: 0,
            },
        );

        // medkit restores 50 but hp never exceeds the cap
        assert_eq!(player.hp, HP_MAX);
    }

    #[test]
    fn armor_bonus_is_capped() {
        let (mut registry, id) = test_player();
        let player = registry.get_mut(id).unwrap();
        player.armor = 80;

        apply(
            player,
            &Bonus {
                kind: BonusKind::Armor,
                index: 0,
                x: 0,
                y: 0,
            },
        );

        assert_eq!(player.armor, ARMOR_MAX);
    }

    #[test]
    fn scatter_places_on_empty_cells_only() {
        let map = Map::parse("arena", "#####\n#@..#\n#...#\n#..@#\n#####").unwrap();
        let mut bonuses = BonusList::new();
        let mut rng = rand::thread_rng();
        bonuses.scatter(&map, 4, &mut rng);

        assert!(bonuses.len() <= 4);
        for bonus in &bonuses.items {
            assert_eq!(map.cell(bonus.x, bonus.y), Cell::Empty);
        }
    }
}

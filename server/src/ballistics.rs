//! Projectile flight, explosions and the damage formula.
//!
//! Bullets advance once per tick, one cell at a time so a fast round
//! cannot tunnel through a thin wall between checks. A bullet that hits
//! a wall or a player explodes in place; one that outruns its weapon's
//! range is silently removed.

use crate::events;
use crate::registry::PlayerRegistry;
use log::{debug, warn};
use rand::Rng;
use shared::catalog::{Weapon, WEAPONS};
use shared::map::{Cell, Map};
use shared::protocol::Direction;

/// One in-flight projectile.
#[derive(Debug, Clone, Copy)]
pub struct Bullet {
    /// Session id of the player who fired.
    pub owner: u8,
    /// Weapon catalog index.
    pub weapon: u8,
    pub x: u16,
    pub y: u16,
    /// Firing position, for range accounting.
    pub origin_x: u16,
    pub origin_y: u16,
    pub direction: Direction,
}

impl Bullet {
    pub fn new(owner: u8, weapon: u8, x: u16, y: u16, direction: Direction) -> Self {
        Bullet {
            owner,
            weapon,
            x,
            y,
            origin_x: x,
            origin_y: y,
            direction,
        }
    }

    /// Cells traveled from the firing position. Flight is axis-aligned,
    /// so the Manhattan distance is exact.
    pub fn traveled(&self) -> u16 {
        self.x.abs_diff(self.origin_x) + self.y.abs_diff(self.origin_y)
    }
}

/// The cell one step away in a direction; clamped at the map edge,
/// where cell 0 always reads as a wall.
pub fn step(direction: Direction, x: u16, y: u16) -> (u16, u16) {
    match direction {
        Direction::Left => (x.saturating_sub(1), y),
        Direction::Right => (x.saturating_add(1), y),
        Direction::Up => (x, y.saturating_sub(1)),
        Direction::Down => (x, y.saturating_add(1)),
    }
}

/// Applies damage through armor, then health. Returns true on a kill.
///
/// Armor above half the damage soaks half of it; weaker armor soaks
/// itself and breaks. Health absorbs the rest; hitting zero is terminal
/// for the round.
pub fn apply_damage(hp: &mut u16, armor: &mut u16, damage: u16) -> bool {
    let mut damage = damage;

    if *armor > damage / 2 {
        *armor -= damage / 2;
        damage -= damage / 2;
    } else if *armor > 0 {
        damage -= damage - *armor;
        *armor = 0;
    }

    if *hp > damage {
        *hp -= damage;
        false
    } else {
        *hp = 0;
        true
    }
}

/// Advances every bullet one tick, removing the spent ones.
pub fn advance(
    map: &mut Map,
    registry: &mut PlayerRegistry,
    bullets: &mut Vec<Bullet>,
    rng: &mut impl Rng,
) {
    let mut survivors = Vec::with_capacity(bullets.len());
    for mut bullet in bullets.drain(..) {
        if advance_one(map, registry, &mut bullet, rng) {
            survivors.push(bullet);
        }
    }
    *bullets = survivors;
}

/// Moves one bullet up to `speed` cells, checking collision at every
/// single-cell step. Returns false once the bullet is spent.
fn advance_one(
    map: &mut Map,
    registry: &mut PlayerRegistry,
    bullet: &mut Bullet,
    rng: &mut impl Rng,
) -> bool {
    let Some(weapon) = WEAPONS.get(bullet.weapon as usize) else {
        warn!("removing bullet with invalid weapon index {}", bullet.weapon);
        return false;
    };

    for _ in 0..weapon.speed {
        let (nx, ny) = step(bullet.direction, bullet.x, bullet.y);
        bullet.x = nx;
        bullet.y = ny;

        if bullet.traveled() > weapon.range {
            debug!("bullet from player {} spent at range", bullet.owner);
            return false;
        }

        if map.cell(nx, ny) == Cell::Wall {
            explode(map, registry, bullet, weapon, rng);
            return false;
        }

        if registry.iter().any(|p| p.x == nx && p.y == ny) {
            explode(map, registry, bullet, weapon, rng);
            return false;
        }
    }

    true
}

/// Applies an explosion centered on the bullet's current cell.
///
/// The affected area is the diagonal from `(x-r, y-r)` to `(x+r, y+r)`
/// swept in lockstep, not a full square. Wall cells are cleared only by
/// terrain-destructive weapons; players on an affected cell take a
/// uniform roll from the weapon's damage range.
pub fn explode(
    map: &mut Map,
    registry: &mut PlayerRegistry,
    bullet: &Bullet,
    weapon: &Weapon,
    rng: &mut impl Rng,
) {
    let attacker = registry
        .get(bullet.owner)
        .map(|p| p.nick.clone())
        .unwrap_or_else(|| format!("id {}", bullet.owner));

    let radius = i32::from(weapon.explosion_radius);
    let (cx, cy) = (i32::from(bullet.x), i32::from(bullet.y));

    for i in 0..=2 * radius {
        let x = cx - radius + i;
        let y = cy - radius + i;
        if x < 1 || y < 1 || x > i32::from(u16::MAX) || y > i32::from(u16::MAX) {
            continue;
        }
        let (x, y) = (x as u16, y as u16);

        if map.cell(x, y) == Cell::Wall {
            if weapon.destroys_terrain && map.destroy_wall(x, y) {
                events::map_explode(registry, x, y);
            }
            continue;
        }

        let hit: Vec<u8> = registry
            .iter()
            .filter(|p| p.x == x && p.y == y)
            .map(|p| p.id)
            .collect();
        for id in hit {
            let damage = rng.gen_range(weapon.damage_min..=weapon.damage_max);
            if let Some(target) = registry.get_mut(id) {
                events::player_hit(target, &attacker, damage);
            }
        }
    }
}

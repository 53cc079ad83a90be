//! Static weapon, health and armor catalogs.
//!
//! Catalogs are read-only tables addressed by the small integer indices
//! that travel on the wire in `Shoot` and `OnBonus` messages.

/// Starting vitals for a freshly connected player.
pub const DEFAULT_HP: u16 = 100;
pub const DEFAULT_ARMOR: u16 = 0;

/// Vitals never exceed these caps, no matter how many pickups stack.
pub const HP_MAX: u16 = 100;
pub const ARMOR_MAX: u16 = 100;

/// Catalog index of the weapon every player spawns with.
pub const WEAPON_GUN: u8 = 0;
pub const WEAPON_ROCKET: u8 = 1;

#[derive(Debug, Clone, Copy)]
pub struct Weapon {
    pub name: &'static str,
    pub damage_min: u16,
    pub damage_max: u16,
    /// Cells a bullet advances per tick.
    pub speed: u16,
    /// Maximum travel distance from the firing position, in cells.
    pub range: u16,
    /// Half-extent of the explosion sweep; 0 hits only the impact cell.
    pub explosion_radius: u16,
    /// Whether the explosion clears wall cells.
    pub destroys_terrain: bool,
    /// Ammo granted when the weapon is picked up.
    pub ammo: u16,
}

/// Number of weapons in the catalog; sizes per-player inventories.
pub const WEAPON_COUNT: usize = 2;

pub static WEAPONS: [Weapon; WEAPON_COUNT] = [
    Weapon {
        name: "gun",
        damage_min: 10,
        damage_max: 25,
        speed: 2,
        range: 10,
        explosion_radius: 0,
        destroys_terrain: false,
        ammo: 50,
    },
    Weapon {
        name: "rocket",
        damage_min: 40,
        damage_max: 80,
        speed: 1,
        range: 20,
        explosion_radius: 2,
        destroys_terrain: true,
        ammo: 5,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct HealthItem {
    pub name: &'static str,
    pub restore: u16,
}

pub static HEALTH_ITEMS: [HealthItem; 2] = [
    HealthItem {
        name: "bandage",
        restore: 25,
    },
    HealthItem {
        name: "medkit",
        restore: 50,
    },
];

#[derive(Debug, Clone, Copy)]
pub struct ArmorItem {
    pub name: &'static str,
    pub amount: u16,
}

pub static ARMOR_ITEMS: [ArmorItem; 1] = [ArmorItem {
    name: "vest",
    amount: 50,
}];

/// Which catalog an `OnBonus` index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BonusKind {
    Weapon = 0,
    Health = 1,
    Armor = 2,
}

impl TryFrom<u8> for BonusKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(BonusKind::Weapon),
            1 => Ok(BonusKind::Health),
            2 => Ok(BonusKind::Armor),
            other => Err(other),
        }
    }
}

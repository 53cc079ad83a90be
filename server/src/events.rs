//! Game event handlers and outbound message routing.
//!
//! Everything a tick does to world state funnels through here: inbound
//! messages drained from the queue are applied by the `handle_*`
//! functions, and every state change that clients must see is pushed
//! onto the per-player outbound batches. Batches accumulate across the
//! tick and are flushed as one datagram per player at the end.

use crate::ballistics::{self, Bullet};
use crate::bonuses::{self, Bonus, BonusList};
use crate::context::ServerContext;
use crate::registry::{collision_at, Collision, Player, PlayerRegistry};
use log::{debug, info, warn};
use rand::Rng;
use shared::batch::MessageBatch;
use shared::catalog::{BonusKind, WEAPON_GUN};
use shared::map::Map;
use shared::protocol::{Direction, Message, MessageBody};
use shared::{in_viewport, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use std::net::SocketAddr;

/// Queues one message for a player, stamping the next sequence number.
/// A full batch drops the message; the client survives on later state.
pub fn push_to(player: &mut Player, body: MessageBody) {
    player.seq += 1;
    let message = Message {
        seq: player.seq,
        player: player.id,
        body,
    };
    if player.batch.push(&message).is_err() {
        warn!(
            "outbound batch full for player {}, dropping tag {}",
            player.nick,
            message.body.tag()
        );
    }
}

pub fn player_position(player: &mut Player) {
    let (x, y) = (player.x, player.y);
    push_to(player, MessageBody::PlayerPosition { x, y });
}

pub fn enemy_position(observer: &mut Player, x: u16, y: u16) {
    push_to(observer, MessageBody::EnemyPosition { x, y });
}

/// Applies damage to a player and tells the survivor their new vitals.
/// A kill is only logged; the victim gets no `PlayerHit`.
pub fn player_hit(target: &mut Player, attacker: &str, damage: u16) -> bool {
    info!(
        "player {} hits {}, damage: {}",
        attacker, target.nick, damage
    );
    let killed = ballistics::apply_damage(&mut target.hp, &mut target.armor, damage);
    if killed {
        info!("player {} kills {}", attacker, target.nick);
        return true;
    }
    push_to(
        target,
        MessageBody::PlayerHit {
            hp: target.hp,
            armor: target.armor,
        },
    );
    false
}

/// Tells every connected player that a wall cell is gone.
pub fn map_explode(registry: &mut PlayerRegistry, x: u16, y: u16) {
    for player in registry.iter_mut() {
        push_to(player, MessageBody::MapExplode { x, y });
    }
}

/// Grants a bonus effect and notifies the recipient.
pub fn on_bonus(player: &mut Player, bonus: &Bonus) {
    bonuses::apply(player, bonus);
    push_to(
        player,
        MessageBody::OnBonus {
            kind: bonus.kind as u8,
            index: bonus.index,
        },
    );
}

fn connect_notify(registry: &mut PlayerRegistry, new_id: u8, nick: &str) {
    for player in registry.iter_mut() {
        if player.id != new_id {
            push_to(
                player,
                MessageBody::ConnectNotify {
                    nick: nick.to_string(),
                },
            );
        }
    }
}

fn disconnect_notify(registry: &mut PlayerRegistry, nick: &str) {
    for player in registry.iter_mut() {
        push_to(
            player,
            MessageBody::DisconnectNotify {
                nick: nick.to_string(),
            },
        );
    }
}

/// Queues the shutdown announcement for every connected player.
pub fn server_shutdown(registry: &mut PlayerRegistry) {
    for player in registry.iter_mut() {
        push_to(player, MessageBody::ServerShutdown);
    }
}

/// Admits a new connection, or answers with a negative acknowledgment
/// when every slot is taken.
///
/// On success the new player's first batch carries, in push order: the
/// positive reply, the spawn position, and the starter gun grant.
/// Everyone else learns the nickname.
pub fn handle_connect_request(
    ctx: &ServerContext,
    map: &Map,
    registry: &mut PlayerRegistry,
    addr: SocketAddr,
    nick: &str,
    rng: &mut impl Rng,
) {
    match registry.occupy(addr, nick) {
        Some(id) => {
            let respawns = map.respawns();
            let (x, y) = respawns[rng.gen_range(0..respawns.len())];
            let map_name = map.name().to_string();

            if let Some(player) = registry.get_mut(id) {
                player.x = x;
                player.y = y;
                push_to(
                    player,
                    MessageBody::ConnectReply {
                        ok: 1,
                        id,
                        map_name,
                    },
                );
                player_position(player);
                on_bonus(
                    player,
                    &Bonus {
                        kind: BonusKind::Weapon,
                        index: WEAPON_GUN,
                        x: 0,
                        y: 0,
                    },
                );
            }
            let nick = nick.to_string();
            connect_notify(registry, id, &nick);
        }
        None => {
            warn!("no free slots, rejecting {} from {}", nick, addr);
            let reject = Message {
                seq: 0,
                player: 0,
                body: MessageBody::ConnectReply {
                    ok: 0,
                    id: 0,
                    map_name: map.name().to_string(),
                },
            };
            let mut batch = MessageBatch::new();
            if batch.push(&reject).is_ok() {
                ctx.send_batch(&batch, addr);
            }
        }
    }
}

/// Frees the player's slot and tells the remaining players.
pub fn handle_client_quit(registry: &mut PlayerRegistry, id: u8) {
    let Some(nick) = registry.get(id).map(|p| p.nick.clone()) else {
        warn!("quit for unknown session id {}", id);
        return;
    };
    registry.release(id);
    info!("player {} disconnected", nick);
    disconnect_notify(registry, &nick);
}

/// One-cell move. The facing always updates; the position only moves
/// when the target cell is passable and unoccupied. Either way the
/// player is told their authoritative position, which corrects any
/// client-side misprediction.
pub fn handle_walk(
    map: &Map,
    registry: &mut PlayerRegistry,
    bonuses: &mut BonusList,
    id: u8,
    direction: Direction,
) {
    let Some(player) = registry.get(id) else {
        warn!("walk for unknown session id {}", id);
        return;
    };
    let (nx, ny) = ballistics::step(direction, player.x, player.y);
    let collision = collision_at(map, registry, nx, ny, id);

    let Some(player) = registry.get_mut(id) else {
        return;
    };
    player.direction = direction;
    if collision == Collision::None {
        player.x = nx;
        player.y = ny;
        if let Some(bonus) = bonuses.take_at(nx, ny) {
            on_bonus(player, &bonus);
        }
    } else {
        debug!(
            "player {} blocked by {:?} at ({}, {})",
            player.nick, collision, nx, ny
        );
    }
    player_position(player);
}

/// Fires the requested weapon if the player owns it, spending one round
/// and spawning a bullet at the player's cell. Requesting an unowned
/// weapon fires the currently selected one instead.
pub fn handle_shoot(registry: &mut PlayerRegistry, bullets: &mut Vec<Bullet>, id: u8, weapon: u8) {
    let Some(player) = registry.get_mut(id) else {
        warn!("shoot for unknown session id {}", id);
        return;
    };
    if player.weapons.owns(weapon) {
        player.weapons.current = weapon;
    }
    let current = player.weapons.current;

    if player.weapons.take_round(current) {
        bullets.push(Bullet::new(id, current, player.x, player.y, player.direction));
        debug!(
            "player {} fires weapon {} facing {:?}",
            player.nick, current, player.direction
        );
    } else {
        debug!("player {} is out of ammo for weapon {}", player.nick, current);
    }
}

/// Queues an `EnemyPosition` for every other player inside each
/// observer's viewport. A player is never their own enemy.
pub fn broadcast_positions(registry: &mut PlayerRegistry) {
    let positions: Vec<(u8, u16, u16)> = registry.iter().map(|p| (p.id, p.x, p.y)).collect();
    for observer in registry.iter_mut() {
        for &(id, x, y) in &positions {
            if id == observer.id {
                continue;
            }
            if in_viewport((observer.x, observer.y), (x, y), VIEWPORT_WIDTH, VIEWPORT_HEIGHT) {
                enemy_position(observer, x, y);
            }
        }
    }
}

/// Sends every non-empty batch as one datagram and resets all batches
/// for the next tick.
pub fn flush(ctx: &ServerContext, registry: &mut PlayerRegistry) {
    for player in registry.iter_mut() {
        if !player.batch.is_empty() {
            ctx.send_batch(&player.batch, player.addr);
            player.batch.clear();
        }
    }
}

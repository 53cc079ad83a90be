//! Rendering and input seams.
//!
//! The client core never draws or reads keys itself; it hands a
//! [`WorldSnapshot`] to a [`Renderer`] once per frame and asks an
//! [`InputSource`] for the next event. [`HeadlessUi`] implements both
//! with a scripted event list and is what the tests (and the default
//! binary) run against.

use crate::game::ClientWorld;
use shared::protocol::Direction;
use std::collections::VecDeque;

/// One player intent, already mapped from whatever raw input produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Walk(Direction),
    Shoot(u8),
    Quit,
}

/// Immutable view of the world handed to the renderer each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldSnapshot {
    pub x: u16,
    pub y: u16,
    pub hp: u16,
    pub armor: u16,
    pub enemies: Vec<(u16, u16)>,
    pub notice: Option<String>,
}

impl WorldSnapshot {
    pub fn of(world: &ClientWorld) -> Self {
        WorldSnapshot {
            x: world.x,
            y: world.y,
            hp: world.hp,
            armor: world.armor,
            enemies: world.enemies().to_vec(),
            notice: world.notice.clone(),
        }
    }
}

pub trait Renderer {
    fn render(&mut self, snapshot: &WorldSnapshot);
}

pub trait InputSource {
    /// Next pending event, if any. Never blocks.
    fn poll(&mut self) -> Option<InputEvent>;
}

/// Scripted, displayless UI. Events are drained in order; rendered
/// frames are retained for inspection.
#[derive(Debug, Default)]
pub struct HeadlessUi {
    events: VecDeque<InputEvent>,
    pub frames: Vec<WorldSnapshot>,
}

impl HeadlessUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(events: impl IntoIterator<Item = InputEvent>) -> Self {
        HeadlessUi {
            events: events.into_iter().collect(),
            frames: Vec::new(),
        }
    }

    pub fn queue(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }
}

impl Renderer for HeadlessUi {
    fn render(&mut self, snapshot: &WorldSnapshot) {
        self.frames.push(snapshot.clone());
    }
}

impl InputSource for HeadlessUi {
    fn poll(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }
}

//! Thin game client.
//!
//! The client mirrors the slice of world state the server sends it:
//! its own position and vitals, the enemies inside its viewport, and a
//! grid-only copy of the map. Rendering and input are behind the traits
//! in [`ui`]; the crate ships only a headless implementation, used by
//! the binary and the tests.

pub mod game;
pub mod network;
pub mod ui;

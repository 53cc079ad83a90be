//! Client binary entry point.
//!
//! Runs the headless UI with an optional scripted walk, which is enough
//! to exercise a live server from the command line; a real terminal
//! front end would implement the [`client::ui`] traits instead.

use clap::Parser;
use client::network::Client;
use client::ui::{HeadlessUi, InputEvent};
use log::info;
use shared::protocol::Direction;
use shared::DEFAULT_PORT;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "client", about = "Arena game client")]
struct Args {
    /// Server address to connect to
    #[arg(long, default_value_t = format!("127.0.0.1:{}", DEFAULT_PORT))]
    server: String,

    /// Nickname to play under
    #[arg(long, default_value = "player")]
    nick: String,

    /// Directory holding local map files
    #[arg(long, default_value = "maps")]
    map_dir: PathBuf,

    /// Steps to walk before quitting
    #[arg(long, default_value_t = 4)]
    steps: u32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut client = Client::connect(&args.server, &args.nick, &args.map_dir)?;

    let mut events: Vec<InputEvent> = (0..args.steps)
        .map(|i| {
            InputEvent::Walk(if i % 2 == 0 {
                Direction::Right
            } else {
                Direction::Down
            })
        })
        .collect();
    events.push(InputEvent::Quit);
    let mut ui = HeadlessUi::scripted(events);

    client.run(&mut ui)?;
    info!(
        "session over at ({}, {}), hp {}",
        client.world.x, client.world.y, client.world.hp
    );
    Ok(())
}

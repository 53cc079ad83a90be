//! Server binary entry point.

use clap::Parser;
use log::info;
use server::context::ServerContext;
use server::network::Server;
use shared::map::Map;
use shared::{DEFAULT_PORT, TICK_RATE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "server", about = "Authoritative arena game server")]
struct Args {
    /// Address to bind the UDP socket on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Simulation ticks per second
    #[arg(long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Path to the map file
    #[arg(long, default_value = "maps/arena.map")]
    map: PathBuf,

    /// Number of bonuses to scatter at startup
    #[arg(long, default_value_t = 8)]
    bonuses: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let map = Map::load(&args.map)?;
    info!(
        "loaded map '{}' ({}x{}, {} respawns)",
        map.name(),
        map.width(),
        map.height(),
        map.respawns().len()
    );

    let ctx = ServerContext::bind(&format!("{}:{}", args.host, args.port), map, args.tick_rate)?;
    {
        let map = ctx.map.lock();
        let mut bonuses = ctx.bonuses.lock();
        bonuses.scatter(&map, args.bonuses, &mut rand::thread_rng());
        info!("scattered {} bonuses", bonuses.len());
    }

    let server = Server::start(ctx)?;
    server.join();
    Ok(())
}

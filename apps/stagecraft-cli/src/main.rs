mod demo;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stagecraft_engine::{Engine, EngineConfig, LevelDescriptor, LoopbackEndpoint, NetworkMode};
use stagecraft_input::{InputEvent, Key};
use stagecraft_physics::SimplePhysicsWorld;
use stagecraft_render::TextGpuContext;
use stagecraft_tools::SceneInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stagecraft-cli", about = "Headless runner for stagecraft levels")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the registered actor types
    Info,
    /// Parse a level file and resolve every actor type without running it
    Validate {
        level: PathBuf,
    },
    /// Load a level and drive frames through tick, render, and finish
    Run {
        level: PathBuf,
        /// Engine config (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to run
        #[arg(short, long, default_value = "3")]
        frames: u32,
        /// Fixed frame delta in seconds
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Draw physics debug wireframes
        #[arg(long)]
        debug: bool,
        /// singleplayer, client, or server
        #[arg(long)]
        mode: Option<NetworkMode>,
        /// Hold the right arrow so the pawn moves
        #[arg(long)]
        hold_right: bool,
        /// Print every frame's draw calls
        #[arg(long)]
        dump: bool,
        #[arg(long, default_value = "800")]
        width: u32,
        #[arg(long, default_value = "600")]
        height: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("stagecraft-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("actor types: {}", demo::services().actor_types().join(", "));
            println!(
                "physics fixed delta: {:.5}s, fps window: {} frames",
                stagecraft_engine::PHYSICS_FIXED_DELTA,
                stagecraft_engine::FPS_WINDOW
            );
        }
        Commands::Validate { level } => {
            let descriptor = LevelDescriptor::from_path(&level)
                .with_context(|| format!("reading {}", level.display()))?;
            let built = descriptor.build(&demo::services())?;
            built.validate()?;
            println!(
                "{}: ok ({} top-level actors, game mode {})",
                level.display(),
                built.len(),
                built.game_mode.as_deref().unwrap_or("none")
            );
        }
        Commands::Run {
            level,
            config,
            frames,
            dt,
            debug,
            mode,
            hold_right,
            dump,
            width,
            height,
        } => {
            let mut config = match config {
                Some(path) => EngineConfig::from_path(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => EngineConfig::default(),
            };
            if let Some(mode) = mode {
                config.network_mode = mode;
            }
            config.debug_physics |= debug;
            run(config, level, frames, dt, hold_right, dump, (width, height))?;
        }
    }

    Ok(())
}

fn run(
    config: EngineConfig,
    level: PathBuf,
    frames: u32,
    dt: f32,
    hold_right: bool,
    dump: bool,
    (width, height): (u32, u32),
) -> anyhow::Result<()> {
    let server = config.network_mode == NetworkMode::Server;
    let mut engine = Engine::new(config)
        .with_physics(Box::new(SimplePhysicsWorld::new()))
        .with_services(demo::services());
    let endpoint = LoopbackEndpoint::new();
    let sent = endpoint.sent();
    if server {
        engine = engine.with_endpoint(Box::new(endpoint));
    }

    let player = engine.add_player();
    engine.run(false)?;
    pollster::block_on(engine.load_level(&level))
        .with_context(|| format!("loading level {}", level.display()))?;

    let pawn = engine
        .scene()
        .flatten()
        .into_iter()
        .find(|id| engine.scene().get(*id).is_some_and(|a| a.type_tag() == "Crate"));
    if let Some(pawn) = pawn {
        engine.possess(player, pawn)?;
    }
    if hold_right {
        engine.input_mut().push(InputEvent::KeyDown(Key::Right));
    }

    let mut inspector = SceneInspector::new();
    inspector.attach(&mut engine);
    let mut gpu = TextGpuContext::new(width, height);

    for _ in 0..frames {
        engine.tick_with_delta(dt)?;
        engine.render(&mut gpu)?;
        let stats = engine.finish_frame()?;
        if dump {
            println!("{}", gpu.render_text());
        }
        gpu.take_commands();
        tracing::debug!(frame = stats.frame, fps = stats.fps, "frame finished");
    }

    if let Some(snapshot) = inspector.latest() {
        println!("{snapshot}");
    }
    if server {
        let sent = sent.borrow();
        println!("peers connected: {}", engine.connected_peers());
        println!("replication frames sent: {}", sent.len());
        if let Some(last) = sent.last() {
            println!("{}", last.to_json()?);
        }
    }
    engine.release_gpu_resources(&mut gpu);
    engine.shutdown();
    Ok(())
}

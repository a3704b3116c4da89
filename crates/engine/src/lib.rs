//! Engine runtime: owns the scene, drives tick / render / finish-frame,
//! spawns and despawns actors, and loads levels.
//!
//! # Invariants
//! - Physics steps exactly once per tick by [`PHYSICS_FIXED_DELTA`],
//!   between the default and post-physics tick groups.
//! - An actor is spawned only after `initialize` and after all of its
//!   children are spawned; despawn runs children first.
//! - Gameplay despawns are swept after the tick, never mid-iteration.
//! - A player possesses at most one actor and an actor is possessed by at
//!   most one player.
//! - `render` and `finish_frame` alternate; `tick` is rejected in between.

pub mod clock;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod frame;
pub mod level;
pub mod network;
pub mod registry;
pub mod spawn;
pub mod timer;

pub use clock::{FPS_WINDOW, FrameClock, FrameStats, FrameTimer};
pub use config::{CameraConfig, EngineConfig};
pub use controller::{Controller, ControllerContext, GameMode, PlayerState};
pub use engine::{Engine, EngineState, PHYSICS_FIXED_DELTA};
pub use error::{ConfigError, EngineError, LevelError};
pub use frame::{AfterRender, CallbackId, FrameView};
pub use level::{ActorDescriptor, DEFAULT_GRAVITY, Level, LevelDescriptor};
pub use network::{
    ConnectionHandler, Endpoint, LoopbackEndpoint, MessageHandler, NetworkMode, ReplicatedActor,
    ReplicationFrame,
};
pub use registry::ServiceLocator;
pub use spawn::{ActorSource, SpawnOptions};
pub use timer::{TimerId, TimerManager, TimerScheduler};

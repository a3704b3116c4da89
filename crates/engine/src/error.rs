use std::path::PathBuf;

use stagecraft_common::{ActorId, PlayerId};
use stagecraft_kernel::{LoadError, TreeError};
use stagecraft_physics::PhysicsError;
use stagecraft_render::RenderError;

/// Errors from reading or validating a level.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("level path is empty")]
    EmptyPath,
    #[error("reading level {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid level: {0}")]
    Invalid(String),
}

/// Errors from reading or validating engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors surfaced by [`crate::Engine`] operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no physics world is loaded")]
    NoPhysicsWorld,
    #[error("engine is not running")]
    NotRunning,
    #[error("engine has been shut down")]
    ShutDown,
    #[error("a rendered frame has not been finished")]
    FrameInFlight,
    #[error("finish_frame called without a rendered frame")]
    NoFrameInFlight,
    #[error("no actor type registered as {0:?}")]
    UnknownActorType(String),
    #[error("actor {0} is not in the scene")]
    UnknownActor(ActorId),
    #[error("player {0:?} does not exist")]
    UnknownPlayer(PlayerId),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Physics(#[from] PhysicsError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

//! Developer tooling: a scene inspector fed by the engine's after-render
//! hook.
//!
//! # Invariants
//! - Tools only read engine state; they never mutate the scene.

pub mod inspector;

pub use inspector::{ActorEntry, SceneInspector, SceneSnapshot};

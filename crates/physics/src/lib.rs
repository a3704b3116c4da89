//! Physics seam for the engine.
//!
//! The engine talks to physics only through [`PhysicsWorld`]. Concrete
//! bodies never leave the backend; actors hold [`BodyHandle`]s inside their
//! [`PhysicsComponent`]s.
//!
//! # Invariants
//! - One body per physics component, created on spawn, destroyed on despawn.
//! - Cast results are closest-first with one entry per actor.
//!
//! [`BodyHandle`]: stagecraft_common::BodyHandle
//! [`PhysicsComponent`]: stagecraft_kernel::PhysicsComponent

mod ray;
mod simple;
mod world;

pub use simple::SimplePhysicsWorld;
pub use world::{
    CastFilter, CastHit, DebugShape, PhysicsError, PhysicsWorld, finalize_hits,
};

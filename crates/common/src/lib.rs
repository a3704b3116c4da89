//! Shared types for the stagecraft engine: identities and 2D geometry.
//!
//! Nothing in here owns behaviour. Ids are plain copyable keys; geometry
//! types are value types used by the kernel, physics, and render crates.

mod geometry;
mod types;

pub use geometry::{CollisionShape, Frustum, Rect};
pub use types::{ActorId, BodyHandle, PlayerId};

//! Scene kernel: the actor tree, the actor and component model, and the
//! node arena underneath them.
//!
//! # Invariants
//! - The tree is an arena; parents own children through links, children
//!   refer back to parents by id only.
//! - A node is never its own child and has at most one parent.
//! - World position composes translation only.

pub mod actor;
pub mod component;
pub mod node;
pub mod scene;

pub use actor::{
    Actor, ActorBase, ActorTransform, AsAny, BasicActor, LoadError, SceneRoot, TickGroup,
};
pub use component::{
    BodyType, Component, ComponentContext, ComponentSet, Material, MeshComponent,
    PhysicsComponent, PostProcessVolume, RenderPass,
};
pub use node::{Node, NodeArena, TreeError};
pub use scene::Scene;

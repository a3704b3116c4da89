use std::any::Any;

use futures::future::{FutureExt, LocalBoxFuture};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use stagecraft_common::{ActorId, PlayerId};

use crate::component::{Component, ComponentSet};

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Ordering bucket relative to the physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TickGroup {
    /// Ticks before the physics step.
    #[default]
    Default,
    /// Ticks after the physics step and sees this frame's physics result.
    PostPhysics,
}

/// Errors raised by an actor's asynchronous resource loading.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("resource {name} failed to load: {reason}")]
    Resource { name: String, reason: String },
}

/// Local transform of an actor relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActorTransform {
    position: Vec2,
    rotation: f32,
}

impl ActorTransform {
    pub fn new(position: Vec2, rotation: f32) -> Self {
        Self { position, rotation }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn set_rotation(&mut self, radians: f32) {
        self.rotation = radians;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.set_position(self.position + delta);
    }
}

/// State shared by every actor.
///
/// Fields that gameplay code is free to change are public. Lifecycle flags
/// (`spawned`, `rendering`, possession) are owned by the engine and only
/// change through the setters it calls.
pub struct ActorBase {
    id: ActorId,
    pub transform: ActorTransform,
    /// Render and selection order, lower first. Not a depth.
    pub layer: i32,
    pub tick_group: TickGroup,
    pub should_tick: bool,
    pub tick_components: bool,
    pub should_replicate: bool,
    pub hidden_in_game: bool,
    spawned: bool,
    initialized: bool,
    marked_for_despawn: bool,
    rendering: bool,
    possessed_by: Option<PlayerId>,
    components: ComponentSet,
    pending_children: Vec<Box<dyn Actor>>,
}

impl ActorBase {
    pub fn new() -> Self {
        let id = ActorId::new();
        Self {
            id,
            transform: ActorTransform::default(),
            layer: 0,
            tick_group: TickGroup::Default,
            should_tick: true,
            tick_components: true,
            should_replicate: false,
            hidden_in_game: false,
            spawned: false,
            initialized: false,
            marked_for_despawn: false,
            rendering: false,
            possessed_by: None,
            components: ComponentSet::new(id),
            pending_children: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.transform = ActorTransform::new(position, self.transform.rotation());
        self
    }

    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_tick_group(mut self, group: TickGroup) -> Self {
        self.tick_group = group;
        self
    }

    pub fn with_component<C: Component>(mut self, component: C) -> Self {
        self.components.add(component);
        self
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn components(&self) -> &ComponentSet {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentSet {
        &mut self.components
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    pub fn set_spawned(&mut self, spawned: bool) {
        self.spawned = spawned;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Request removal. The engine despawns marked actors in its sweep
    /// phase, never in the middle of a tick.
    pub fn mark_for_despawn(&mut self) {
        self.marked_for_despawn = true;
    }

    pub fn is_marked_for_despawn(&self) -> bool {
        self.marked_for_despawn
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Returns true when the value changed.
    pub fn set_rendering(&mut self, rendering: bool) -> bool {
        let changed = self.rendering != rendering;
        self.rendering = rendering;
        changed
    }

    pub fn possessed_by(&self) -> Option<PlayerId> {
        self.possessed_by
    }

    pub fn set_possessed_by(&mut self, player: Option<PlayerId>) {
        self.possessed_by = player;
    }

    /// Queue a child that will be attached under this actor when it spawns.
    pub fn add_child(&mut self, child: Box<dyn Actor>) {
        self.pending_children.push(child);
    }

    pub fn take_pending_children(&mut self) -> Vec<Box<dyn Actor>> {
        std::mem::take(&mut self.pending_children)
    }

    pub fn pending_children(&self) -> usize {
        self.pending_children.len()
    }

    pub fn tick_components(&mut self, dt: f32) {
        if self.tick_components {
            self.components.tick_all(dt, &mut self.transform);
        }
    }
}

impl Default for ActorBase {
    fn default() -> Self {
        Self::new()
    }
}

/// A spawnable scene entity.
///
/// Implementors embed an [`ActorBase`] and override the lifecycle hooks they
/// care about. The engine drives the hooks in this order: `on_load`,
/// `initialize`, `on_spawned`, `tick` every frame, `on_despawned`.
pub trait Actor: AsAny {
    fn base(&self) -> &ActorBase;
    fn base_mut(&mut self) -> &mut ActorBase;

    /// Stable tag used to pick a renderer and to resolve the type by name.
    fn type_tag(&self) -> &'static str {
        "Actor"
    }

    /// Asynchronous resource fetch before spawn.
    fn on_load(&mut self) -> LocalBoxFuture<'_, Result<(), LoadError>> {
        async { Ok(()) }.boxed_local()
    }

    /// Attach components. Runs once, before the actor spawns.
    fn initialize(&mut self) {}

    fn on_spawned(&mut self) {}

    fn on_despawned(&mut self) {}

    fn tick(&mut self, _dt: f32) {}

    fn on_rendering_changed(&mut self, _rendering: bool) {}

    fn id(&self) -> ActorId {
        self.base().id()
    }
}

impl dyn Actor {
    pub fn downcast_ref<T: Actor>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Actor>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: Actor>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// An actor with no behaviour of its own. Used for grouping and for actors
/// assembled purely from components.
#[derive(Default)]
pub struct BasicActor {
    base: ActorBase,
}

impl BasicActor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_base(base: ActorBase) -> Self {
        Self { base }
    }
}

impl Actor for BasicActor {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }
}

/// The root of the scene tree. Never ticks, never renders.
pub struct SceneRoot {
    base: ActorBase,
}

impl SceneRoot {
    pub fn new() -> Self {
        let mut base = ActorBase::new();
        base.should_tick = false;
        base.hidden_in_game = true;
        base.set_spawned(true);
        Self { base }
    }
}

impl Default for SceneRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl Actor for SceneRoot {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn type_tag(&self) -> &'static str {
        "SceneRoot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Material, MeshComponent};

    #[test]
    fn base_defaults() {
        let base = ActorBase::new();
        assert!(base.should_tick);
        assert!(!base.is_spawned());
        assert!(!base.is_marked_for_despawn());
        assert_eq!(base.tick_group, TickGroup::Default);
        assert_eq!(base.components().owner(), base.id());
    }

    #[test]
    fn rendering_transition_reports_change() {
        let mut base = ActorBase::new();
        assert!(base.set_rendering(true));
        assert!(!base.set_rendering(true));
        assert!(base.set_rendering(false));
    }

    #[test]
    fn transform_translate_accumulates() {
        let mut t = ActorTransform::new(Vec2::new(1.0, 0.0), 0.5);
        t.translate(Vec2::X);
        t.translate(Vec2::Y);
        assert_eq!(t.position(), Vec2::new(2.0, 1.0));
        assert_eq!(t.rotation(), 0.5);
    }

    #[test]
    fn downcast_through_dyn() {
        let actor: Box<dyn Actor> = Box::new(BasicActor::new());
        assert!(actor.as_ref().is::<BasicActor>());
        assert!(actor.as_ref().downcast_ref::<SceneRoot>().is_none());
    }

    #[test]
    fn pending_children_drain() {
        let mut base = ActorBase::new()
            .with_component(MeshComponent::new(Material::default(), Vec2::ONE));
        base.add_child(Box::new(BasicActor::new()));
        base.add_child(Box::new(BasicActor::new()));
        assert_eq!(base.pending_children(), 2);
        assert_eq!(base.take_pending_children().len(), 2);
        assert_eq!(base.pending_children(), 0);
    }

    #[test]
    fn default_on_load_succeeds() {
        let mut actor = BasicActor::new();
        assert!(pollster::block_on(actor.on_load()).is_ok());
    }
}

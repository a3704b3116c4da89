use glam::Vec2;
use serde::{Deserialize, Serialize};
use stagecraft_common::{ActorId, BodyHandle, CollisionShape, Rect};

use crate::actor::{ActorTransform, AsAny};

/// Per-tick view handed to a component: its owner and the owner's local
/// transform.
pub struct ComponentContext<'a> {
    pub owner: ActorId,
    pub dt: f32,
    pub transform: &'a mut ActorTransform,
}

/// A behaviour or data unit attached to exactly one actor.
pub trait Component: AsAny {
    /// Short name used in logs and the inspector.
    fn name(&self) -> &'static str;

    /// Called once per tick while the owner ticks with components enabled.
    fn tick(&mut self, _ctx: &mut ComponentContext<'_>) {}
}

impl dyn Component {
    pub fn downcast_ref<C: Component>(&self) -> Option<&C> {
        self.as_any().downcast_ref::<C>()
    }

    pub fn downcast_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.as_any_mut().downcast_mut::<C>()
    }
}

/// The components of one actor.
///
/// The owner id is fixed when the set is created alongside its actor and is
/// never reassigned, which gives every attached component a stable
/// back-reference.
pub struct ComponentSet {
    owner: ActorId,
    items: Vec<Box<dyn Component>>,
}

impl ComponentSet {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            items: Vec::new(),
        }
    }

    pub fn owner(&self) -> ActorId {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attach a component and return its index.
    pub fn add<C: Component>(&mut self, component: C) -> usize {
        self.items.push(Box::new(component));
        self.items.len() - 1
    }

    pub fn at(&self, index: usize) -> Option<&dyn Component> {
        self.items.get(index).map(|c| c.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> {
        self.items.iter().map(|c| c.as_ref())
    }

    pub fn get<C: Component>(&self) -> Option<&C> {
        self.iter_of::<C>().next()
    }

    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.iter_of_mut::<C>().next()
    }

    pub fn has<C: Component>(&self) -> bool {
        self.get::<C>().is_some()
    }

    pub fn iter_of<C: Component>(&self) -> impl Iterator<Item = &C> {
        self.items.iter().filter_map(|c| c.as_ref().downcast_ref::<C>())
    }

    pub fn iter_of_mut<C: Component>(&mut self) -> impl Iterator<Item = &mut C> {
        self.items
            .iter_mut()
            .filter_map(|c| c.as_mut().downcast_mut::<C>())
    }

    /// Indexed iteration over one component type, used when a caller needs
    /// to come back to a specific component later.
    pub fn indexed_of<C: Component>(&self) -> impl Iterator<Item = (usize, &C)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().downcast_ref::<C>().map(|c| (i, c)))
    }

    pub(crate) fn tick_all(&mut self, dt: f32, transform: &mut ActorTransform) {
        let mut ctx = ComponentContext {
            owner: self.owner,
            dt,
            transform,
        };
        for c in &mut self.items {
            c.tick(&mut ctx);
        }
    }
}

/// Which pass a material draws in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderPass {
    #[default]
    Forward,
    /// Samples the already-rendered scene colour buffer.
    PostProcess,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub pass: RenderPass,
    pub color: [f32; 4],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            pass: RenderPass::Forward,
            color: [0.8, 0.8, 0.8, 1.0],
        }
    }
}

/// A textured quad drawn at the owner's world position.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshComponent {
    pub material: Material,
    pub size: Vec2,
    pub offset: Vec2,
}

impl MeshComponent {
    pub fn new(material: Material, size: Vec2) -> Self {
        Self {
            material,
            size,
            offset: Vec2::ZERO,
        }
    }

    pub fn pass(&self) -> RenderPass {
        self.material.pass
    }
}

impl Component for MeshComponent {
    fn name(&self) -> &'static str {
        "Mesh"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    Static,
    #[default]
    Dynamic,
    Kinematic,
}

/// Describes the physics body an actor wants. The body itself belongs to
/// the physics backend; only its handle is kept here.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsComponent {
    pub body_type: BodyType,
    pub shapes: Vec<CollisionShape>,
    pub velocity: Vec2,
    body: Option<BodyHandle>,
}

impl PhysicsComponent {
    pub fn new(body_type: BodyType, shapes: Vec<CollisionShape>) -> Self {
        Self {
            body_type,
            shapes,
            velocity: Vec2::ZERO,
            body: None,
        }
    }

    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    pub fn set_body(&mut self, handle: BodyHandle) {
        self.body = Some(handle);
    }

    pub fn take_body(&mut self) -> Option<BodyHandle> {
        self.body.take()
    }
}

impl Component for PhysicsComponent {
    fn name(&self) -> &'static str {
        "Physics"
    }
}

/// Marks the owner as a post-process volume. Post-process materials on the
/// owner only apply while the camera is inside the volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessVolume {
    pub half_extents: Vec2,
    /// Applies everywhere regardless of camera position.
    pub unbound: bool,
}

impl PostProcessVolume {
    pub fn new(half_extents: Vec2) -> Self {
        Self {
            half_extents,
            unbound: false,
        }
    }

    pub fn contains(&self, volume_center: Vec2, point: Vec2) -> bool {
        self.unbound || Rect::from_center(volume_center, self.half_extents).contains_point(point)
    }
}

impl Component for PostProcessVolume {
    fn name(&self) -> &'static str {
        "PostProcessVolume"
    }
}

use std::any::{Any, TypeId};
use std::collections::HashSet;

use glam::Vec2;
use stagecraft_common::{ActorId, BodyHandle, Frustum, Rect};
use stagecraft_kernel::{Actor, BodyType, PhysicsComponent, Scene};

/// Errors from physics backends.
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("body {0:?} not found")]
    BodyNotFound(BodyHandle),
    #[error("actor {0} has a physics component without collision shapes")]
    NoShapes(ActorId),
    #[error("invalid step delta {0}")]
    InvalidDelta(f32),
}

/// Which actors a spatial query may return.
#[derive(Clone, Copy)]
pub struct CastFilter<'a> {
    pub include_static: bool,
    pub include_dynamic: bool,
    actor_type: Option<TypeId>,
    predicate: Option<&'a dyn Fn(&dyn Actor) -> bool>,
}

impl<'a> CastFilter<'a> {
    /// Static and dynamic bodies, any actor type.
    pub fn all() -> Self {
        Self {
            include_static: true,
            include_dynamic: true,
            actor_type: None,
            predicate: None,
        }
    }

    /// Only actors of concrete type `T`.
    pub fn of_type<T: Actor>() -> Self {
        Self {
            actor_type: Some(TypeId::of::<T>()),
            ..Self::all()
        }
    }

    pub fn statics(mut self, include: bool) -> Self {
        self.include_static = include;
        self
    }

    pub fn dynamics(mut self, include: bool) -> Self {
        self.include_dynamic = include;
        self
    }

    pub fn with_predicate(mut self, predicate: &'a dyn Fn(&dyn Actor) -> bool) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Kinematic bodies count as dynamic.
    pub fn accepts_body(&self, body_type: BodyType) -> bool {
        match body_type {
            BodyType::Static => self.include_static,
            BodyType::Dynamic | BodyType::Kinematic => self.include_dynamic,
        }
    }

    pub fn accepts_actor(&self, actor: &(dyn Actor + 'static)) -> bool {
        if let Some(t) = self.actor_type
            && Any::type_id(actor.as_any()) != t
        {
            return false;
        }
        self.predicate.is_none_or(|p| p(actor))
    }
}

impl Default for CastFilter<'_> {
    fn default() -> Self {
        Self::all()
    }
}

/// One actor hit by a spatial query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastHit {
    pub actor: ActorId,
    pub body: BodyHandle,
    /// Distance from the query origin (ray start or area centre).
    pub distance: f32,
    pub point: Vec2,
}

/// Sort hits closest-first and keep only each actor's closest hit.
///
/// The sort is stable, so equal distances keep backend order.
pub fn finalize_hits(mut hits: Vec<CastHit>) -> Vec<CastHit> {
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    let mut seen = HashSet::new();
    hits.retain(|h| seen.insert(h.actor));
    hits
}

/// Wireframe emitted for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugShape {
    pub bounds: Rect,
    pub body_type: BodyType,
}

/// Contract the engine requires from a physics backend.
///
/// Backends only have to provide body creation and destruction, queries,
/// and stepping; the spawn/despawn bookkeeping over an actor's physics
/// components is shared by every backend through the provided methods.
pub trait PhysicsWorld {
    fn gravity(&self) -> Vec2;
    fn set_gravity(&mut self, gravity: Vec2);

    /// Create a concrete body for one physics component.
    fn create_physics_body(
        &mut self,
        owner: ActorId,
        position: Vec2,
        rotation: f32,
        component: &PhysicsComponent,
    ) -> Result<BodyHandle, PhysicsError>;

    fn destroy_physics_body(&mut self, handle: BodyHandle);

    /// Register every physics component of `actor` with a body placed at
    /// `position` (world space).
    fn spawn_actor(&mut self, actor: &mut dyn Actor, position: Vec2) -> Result<(), PhysicsError> {
        let owner = actor.id();
        let rotation = actor.base().transform.rotation();
        for component in actor
            .base_mut()
            .components_mut()
            .iter_of_mut::<PhysicsComponent>()
        {
            if component.body().is_some() {
                continue;
            }
            let handle = self.create_physics_body(owner, position, rotation, component)?;
            component.set_body(handle);
        }
        tracing::trace!(actor = %owner, "physics bodies created");
        Ok(())
    }

    /// Destroy every body owned by `actor`'s physics components.
    fn despawn_actor(&mut self, actor: &mut dyn Actor) {
        let owner = actor.id();
        let handles: Vec<BodyHandle> = actor
            .base_mut()
            .components_mut()
            .iter_of_mut::<PhysicsComponent>()
            .filter_map(|c| c.take_body())
            .collect();
        for handle in handles {
            self.destroy_physics_body(handle);
        }
        tracing::trace!(actor = %owner, "physics bodies destroyed");
    }

    /// True if any collision shape of `actor` overlaps `frustum`. Actors
    /// without shapes are always visible.
    fn check_within_bounds(&self, actor: &dyn Actor, frustum: &Frustum) -> bool;

    fn aabb_cast(&self, scene: &Scene, area: Rect, filter: &CastFilter<'_>) -> Vec<CastHit>;

    fn ray_cast(
        &self,
        scene: &Scene,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: &CastFilter<'_>,
    ) -> Vec<CastHit>;

    /// Cast `ray_count` rays evenly around `center` out to `radius`.
    fn radial_cast(
        &self,
        scene: &Scene,
        center: Vec2,
        radius: f32,
        ray_count: u32,
        filter: &CastFilter<'_>,
    ) -> Vec<CastHit> {
        let n = ray_count.max(1);
        let mut hits = Vec::new();
        for i in 0..n {
            let angle = std::f32::consts::TAU * i as f32 / n as f32;
            hits.extend(self.ray_cast(scene, center, Vec2::from_angle(angle), radius, filter));
        }
        finalize_hits(hits)
    }

    /// Move every body onto its actor's current world transform. Moving a
    /// parent moves the bodies of its whole subtree.
    fn sync_transforms(&mut self, scene: &Scene);

    /// Advance the simulation by exactly `fixed_delta` and write the results
    /// back onto the actors in `scene`. Actor transforms are synced onto the
    /// bodies first.
    fn step(&mut self, fixed_delta: f32, scene: &mut Scene) -> Result<(), PhysicsError>;

    fn debug_shapes(&self) -> Vec<DebugShape> {
        Vec::new()
    }
}

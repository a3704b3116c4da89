use std::collections::BTreeMap;

use glam::Vec2;
use stagecraft_common::{ActorId, BodyHandle, CollisionShape, Frustum, Rect};
use stagecraft_kernel::{Actor, BodyType, PhysicsComponent, Scene};

use crate::ray::{ray_circle, ray_rect};
use crate::world::{CastFilter, CastHit, DebugShape, PhysicsError, PhysicsWorld, finalize_hits};

const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -9.81);

#[derive(Debug, Clone)]
struct Body {
    owner: ActorId,
    body_type: BodyType,
    shapes: Vec<CollisionShape>,
    position: Vec2,
    rotation: f32,
    velocity: Vec2,
}

/// Reference backend: integrates dynamic bodies under gravity and moves
/// kinematic ones by their velocity. There is no contact resolution.
///
/// Each step first pulls every actor's world transform onto its bodies,
/// then integrates, then writes the primary (first non-static) body of each
/// actor back onto it.
#[derive(Debug)]
pub struct SimplePhysicsWorld {
    gravity: Vec2,
    bodies: BTreeMap<BodyHandle, Body>,
    next_handle: u64,
    steps: u64,
}

impl SimplePhysicsWorld {
    pub fn new() -> Self {
        Self::with_gravity(DEFAULT_GRAVITY)
    }

    pub fn with_gravity(gravity: Vec2) -> Self {
        Self {
            gravity,
            bodies: BTreeMap::new(),
            next_handle: 0,
            steps: 0,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    pub fn body_position(&self, handle: BodyHandle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|b| b.position)
    }

    pub fn bodies_of(&self, owner: ActorId) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, b)| b.owner == owner)
            .map(|(h, _)| *h)
            .collect()
    }

    fn bodies_by_owner(&self) -> BTreeMap<ActorId, Vec<BodyHandle>> {
        let mut map: BTreeMap<ActorId, Vec<BodyHandle>> = BTreeMap::new();
        for (h, b) in &self.bodies {
            map.entry(b.owner).or_default().push(*h);
        }
        map
    }

    fn candidates<'s>(
        &'s self,
        scene: &'s Scene,
        filter: &'s CastFilter<'_>,
    ) -> impl Iterator<Item = (BodyHandle, &'s Body)> + 's {
        self.bodies.iter().filter_map(move |(h, b)| {
            if !filter.accepts_body(b.body_type) {
                return None;
            }
            let actor = scene.get(b.owner)?;
            filter.accepts_actor(actor).then_some((*h, b))
        })
    }

    fn pull_actor_transforms(&mut self, scene: &Scene) {
        for (handle, body) in self.bodies.iter_mut() {
            let Some(actor) = scene.get(body.owner) else {
                continue;
            };
            let base = actor.base();
            body.position = scene.world_position(body.owner);
            body.rotation = base.transform.rotation();
            if body.body_type == BodyType::Static {
                continue;
            }
            if let Some(c) = base
                .components()
                .iter_of::<PhysicsComponent>()
                .find(|c| c.body() == Some(*handle))
            {
                body.velocity = c.velocity;
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.bodies.values_mut() {
            match body.body_type {
                BodyType::Static => {}
                BodyType::Dynamic => {
                    body.velocity += self.gravity * dt;
                    body.position += body.velocity * dt;
                }
                BodyType::Kinematic => {
                    body.position += body.velocity * dt;
                }
            }
        }
    }

    fn push_body_transforms(&self, scene: &mut Scene, by_owner: &BTreeMap<ActorId, Vec<BodyHandle>>) {
        for (owner, handles) in by_owner {
            let primary = handles
                .iter()
                .filter_map(|h| self.bodies.get(h))
                .find(|b| b.body_type != BodyType::Static);
            let Some(primary) = primary else {
                continue;
            };
            scene.sync_world_transform(*owner, primary.position, primary.rotation);
            if let Some(actor) = scene.get_mut(*owner) {
                for c in actor
                    .base_mut()
                    .components_mut()
                    .iter_of_mut::<PhysicsComponent>()
                {
                    if let Some(b) = c.body().and_then(|h| self.bodies.get(&h)) {
                        c.velocity = b.velocity;
                    }
                }
            }
        }
    }
}

impl Default for SimplePhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld for SimplePhysicsWorld {
    fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        tracing::debug!(x = gravity.x, y = gravity.y, "gravity set");
        self.gravity = gravity;
    }

    fn create_physics_body(
        &mut self,
        owner: ActorId,
        position: Vec2,
        rotation: f32,
        component: &PhysicsComponent,
    ) -> Result<BodyHandle, PhysicsError> {
        if component.shapes.is_empty() {
            return Err(PhysicsError::NoShapes(owner));
        }
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle,
            Body {
                owner,
                body_type: component.body_type,
                shapes: component.shapes.clone(),
                position,
                rotation,
                velocity: component.velocity,
            },
        );
        Ok(handle)
    }

    fn destroy_physics_body(&mut self, handle: BodyHandle) {
        self.bodies.remove(&handle);
    }

    fn check_within_bounds(&self, actor: &dyn Actor, frustum: &Frustum) -> bool {
        let mut any_shape = false;
        for c in actor.base().components().iter_of::<PhysicsComponent>() {
            let Some(body) = c.body().and_then(|h| self.bodies.get(&h)) else {
                continue;
            };
            for shape in &body.shapes {
                any_shape = true;
                if frustum.intersects(&shape.world_bounds(body.position, body.rotation)) {
                    return true;
                }
            }
        }
        !any_shape
    }

    fn aabb_cast(&self, scene: &Scene, area: Rect, filter: &CastFilter<'_>) -> Vec<CastHit> {
        let center = area.center();
        let mut hits = Vec::new();
        for (handle, body) in self.candidates(scene, filter) {
            for shape in &body.shapes {
                let bounds = shape.world_bounds(body.position, body.rotation);
                if bounds.intersects(&area) {
                    hits.push(CastHit {
                        actor: body.owner,
                        body: handle,
                        distance: (bounds.center() - center).length(),
                        point: bounds.center(),
                    });
                }
            }
        }
        finalize_hits(hits)
    }

    fn ray_cast(
        &self,
        scene: &Scene,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        filter: &CastFilter<'_>,
    ) -> Vec<CastHit> {
        let dir = direction.normalize_or_zero();
        if dir == Vec2::ZERO {
            return Vec::new();
        }
        let mut hits = Vec::new();
        for (handle, body) in self.candidates(scene, filter) {
            for shape in &body.shapes {
                let bounds = shape.world_bounds(body.position, body.rotation);
                // Rotated boxes are tested against their axis-aligned bounds.
                let t = match shape {
                    CollisionShape::Box { .. } => ray_rect(origin, dir, &bounds, max_distance),
                    CollisionShape::Circle { radius, .. } => {
                        ray_circle(origin, dir, bounds.center(), *radius, max_distance)
                    }
                };
                if let Some(t) = t {
                    hits.push(CastHit {
                        actor: body.owner,
                        body: handle,
                        distance: t,
                        point: origin + dir * t,
                    });
                }
            }
        }
        finalize_hits(hits)
    }

    fn sync_transforms(&mut self, scene: &Scene) {
        self.pull_actor_transforms(scene);
    }

    fn step(&mut self, fixed_delta: f32, scene: &mut Scene) -> Result<(), PhysicsError> {
        if !(fixed_delta.is_finite() && fixed_delta > 0.0) {
            return Err(PhysicsError::InvalidDelta(fixed_delta));
        }
        self.pull_actor_transforms(scene);
        let by_owner = self.bodies_by_owner();
        self.integrate(fixed_delta);
        self.push_body_transforms(scene, &by_owner);
        self.steps += 1;
        tracing::trace!(step = self.steps, bodies = self.bodies.len(), "physics step");
        Ok(())
    }

    fn debug_shapes(&self) -> Vec<DebugShape> {
        self.bodies
            .values()
            .flat_map(|b| {
                b.shapes.iter().map(move |s| DebugShape {
                    bounds: s.world_bounds(b.position, b.rotation),
                    body_type: b.body_type,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_kernel::{ActorBase, BasicActor};

    fn body_actor(pos: Vec2, body_type: BodyType, shapes: Vec<CollisionShape>) -> Box<dyn Actor> {
        Box::new(BasicActor::from_base(
            ActorBase::new()
                .with_position(pos)
                .with_component(PhysicsComponent::new(body_type, shapes)),
        ))
    }

    fn spawn(world: &mut SimplePhysicsWorld, scene: &mut Scene, actor: Box<dyn Actor>) -> ActorId {
        let id = scene.insert_under(actor, scene.root()).unwrap();
        let pos = scene.world_position(id);
        world.spawn_actor(scene.get_mut(id).unwrap(), pos).unwrap();
        id
    }

    #[test]
    fn spawn_and_despawn_bodies() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        let id = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::ZERO, BodyType::Dynamic, vec![CollisionShape::circle(1.0)]),
        );
        assert_eq!(world.body_count(), 1);
        world.despawn_actor(scene.get_mut(id).unwrap());
        assert_eq!(world.body_count(), 0);
        let base = scene.get(id).unwrap().base();
        assert!(base.components().get::<PhysicsComponent>().unwrap().body().is_none());
    }

    #[test]
    fn component_without_shapes_is_rejected() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        let id = scene
            .insert_under(body_actor(Vec2::ZERO, BodyType::Static, vec![]), scene.root())
            .unwrap();
        let err = world.spawn_actor(scene.get_mut(id).unwrap(), Vec2::ZERO);
        assert!(matches!(err, Err(PhysicsError::NoShapes(_))));
    }

    #[test]
    fn dynamic_body_falls_and_writes_back() {
        let mut world = SimplePhysicsWorld::with_gravity(Vec2::new(0.0, -10.0));
        let mut scene = Scene::new();
        let id = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::new(0.0, 10.0), BodyType::Dynamic, vec![CollisionShape::circle(0.5)]),
        );
        world.step(0.1, &mut scene).unwrap();
        let y = scene.world_position(id).y;
        assert!(y < 10.0);
        let v = scene
            .get(id)
            .unwrap()
            .base()
            .components()
            .get::<PhysicsComponent>()
            .unwrap()
            .velocity;
        assert!((v.y + 1.0).abs() < 1e-5);
        assert_eq!(world.step_count(), 1);
    }

    #[test]
    fn static_body_does_not_move() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        let id = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::new(1.0, 1.0), BodyType::Static, vec![CollisionShape::rect(Vec2::ONE)]),
        );
        for _ in 0..10 {
            world.step(1.0 / 120.0, &mut scene).unwrap();
        }
        assert_eq!(scene.world_position(id), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn moved_actor_pushes_to_body() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        let id = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::ZERO, BodyType::Static, vec![CollisionShape::rect(Vec2::ONE)]),
        );
        scene.set_world_position(id, Vec2::new(4.0, 0.0));
        world.step(1.0 / 120.0, &mut scene).unwrap();
        let h = world.bodies_of(id)[0];
        assert_eq!(world.body_position(h), Some(Vec2::new(4.0, 0.0)));
    }

    #[test]
    fn moving_parent_moves_child_body() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        let parent = scene.insert_under(Box::new(BasicActor::new()), scene.root()).unwrap();
        let child = scene
            .insert_under(
                body_actor(Vec2::new(1.0, 0.0), BodyType::Static, vec![CollisionShape::rect(Vec2::ONE)]),
                parent,
            )
            .unwrap();
        let pos = scene.world_position(child);
        world.spawn_actor(scene.get_mut(child).unwrap(), pos).unwrap();

        scene.set_world_position(parent, Vec2::new(100.0, 0.0));
        world.sync_transforms(&scene);
        let h = world.bodies_of(child)[0];
        assert_eq!(world.body_position(h), Some(Vec2::new(101.0, 0.0)));
        let frustum = Frustum::new(Vec2::new(101.0, 0.0), 2.0, 2.0);
        assert!(world.check_within_bounds(scene.get(child).unwrap(), &frustum));
    }

    #[test]
    fn dynamic_child_keeps_offset_when_parent_moves() {
        let mut world = SimplePhysicsWorld::with_gravity(Vec2::ZERO);
        let mut scene = Scene::new();
        let parent = scene.insert_under(Box::new(BasicActor::new()), scene.root()).unwrap();
        let child = scene
            .insert_under(
                body_actor(Vec2::new(0.0, 2.0), BodyType::Dynamic, vec![CollisionShape::circle(0.5)]),
                parent,
            )
            .unwrap();
        let pos = scene.world_position(child);
        world.spawn_actor(scene.get_mut(child).unwrap(), pos).unwrap();

        scene.set_world_position(parent, Vec2::new(5.0, 0.0));
        world.step(1.0 / 120.0, &mut scene).unwrap();
        assert_eq!(scene.get(child).unwrap().base().transform.position(), Vec2::new(0.0, 2.0));
        assert_eq!(scene.world_position(child), Vec2::new(5.0, 2.0));
    }

    #[test]
    fn rejects_bad_delta() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        assert!(world.step(0.0, &mut scene).is_err());
        assert!(world.step(f32::NAN, &mut scene).is_err());
    }

    #[test]
    fn ray_cast_sorted_and_deduped() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        let far = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::new(10.0, 0.0), BodyType::Static, vec![CollisionShape::rect(Vec2::ONE)]),
        );
        // Two fixtures on the same actor, both on the ray.
        let near = spawn(
            &mut world,
            &mut scene,
            body_actor(
                Vec2::new(4.0, 0.0),
                BodyType::Static,
                vec![
                    CollisionShape::rect(Vec2::splat(0.5)),
                    CollisionShape::Box {
                        half_extents: Vec2::splat(0.5),
                        offset: Vec2::new(2.0, 0.0),
                    },
                ],
            ),
        );
        let hits = world.ray_cast(&scene, Vec2::ZERO, Vec2::X, 100.0, &CastFilter::all());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].actor, near);
        assert!((hits[0].distance - 3.5).abs() < 1e-5);
        assert_eq!(hits[1].actor, far);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn aabb_cast_respects_static_flag() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::ZERO, BodyType::Static, vec![CollisionShape::rect(Vec2::ONE)]),
        );
        let dynamic = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::new(1.0, 0.0), BodyType::Dynamic, vec![CollisionShape::circle(0.5)]),
        );
        let area = Rect::from_center(Vec2::ZERO, Vec2::splat(3.0));
        assert_eq!(world.aabb_cast(&scene, area, &CastFilter::all()).len(), 2);
        let only_dynamic = world.aabb_cast(&scene, area, &CastFilter::all().statics(false));
        assert_eq!(only_dynamic.len(), 1);
        assert_eq!(only_dynamic[0].actor, dynamic);
    }

    #[test]
    fn radial_cast_reports_each_actor_once() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        // A wide box that several of the rays will cross.
        let wall = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::new(0.0, 3.0), BodyType::Static, vec![CollisionShape::rect(Vec2::new(5.0, 0.5))]),
        );
        let hits = world.radial_cast(&scene, Vec2::ZERO, 10.0, 16, &CastFilter::all());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].actor, wall);
        assert!((hits[0].distance - 2.5).abs() < 1e-4);
    }

    #[test]
    fn within_bounds_uses_shapes() {
        let mut world = SimplePhysicsWorld::new();
        let mut scene = Scene::new();
        let id = spawn(
            &mut world,
            &mut scene,
            body_actor(Vec2::new(50.0, 0.0), BodyType::Static, vec![CollisionShape::rect(Vec2::ONE)]),
        );
        let frustum = Frustum::new(Vec2::ZERO, 10.0, 10.0);
        assert!(!world.check_within_bounds(scene.get(id).unwrap(), &frustum));
        let far_frustum = Frustum::new(Vec2::new(50.0, 0.0), 1.0, 1.0);
        assert!(world.check_within_bounds(scene.get(id).unwrap(), &far_frustum));

        let bare = scene.insert_under(Box::new(BasicActor::new()), scene.root()).unwrap();
        assert!(world.check_within_bounds(scene.get(bare).unwrap(), &frustum));
    }
}

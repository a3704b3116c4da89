//! Actor types, game mode, and controller the headless runner registers.

use glam::Vec2;
use stagecraft_common::CollisionShape;
use stagecraft_engine::{Controller, ControllerContext, GameMode, ServiceLocator};
use stagecraft_kernel::{
    Actor, ActorBase, BodyType, Material, MeshComponent, PhysicsComponent, PostProcessVolume,
    RenderPass, TickGroup,
};

fn material(name: &str, color: [f32; 4]) -> Material {
    Material {
        name: name.into(),
        color,
        ..Material::default()
    }
}

/// Dynamic one-unit box.
pub struct Crate {
    base: ActorBase,
}

impl Default for Crate {
    fn default() -> Self {
        Self {
            base: ActorBase::new()
                .with_component(PhysicsComponent::new(
                    BodyType::Dynamic,
                    vec![CollisionShape::rect(Vec2::splat(0.5))],
                ))
                .with_component(MeshComponent::new(
                    material("crate", [0.6, 0.4, 0.2, 1.0]),
                    Vec2::ONE,
                )),
        }
    }
}

impl Actor for Crate {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn type_tag(&self) -> &'static str {
        "Crate"
    }
}

/// Static slab, sixteen units wide.
pub struct Ground {
    base: ActorBase,
}

impl Default for Ground {
    fn default() -> Self {
        Self {
            base: ActorBase::new()
                .with_component(PhysicsComponent::new(
                    BodyType::Static,
                    vec![CollisionShape::rect(Vec2::new(8.0, 0.5))],
                ))
                .with_component(MeshComponent::new(
                    material("ground", [0.3, 0.5, 0.3, 1.0]),
                    Vec2::new(16.0, 1.0),
                )),
        }
    }
}

impl Actor for Ground {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn type_tag(&self) -> &'static str {
        "Ground"
    }
}

/// Turns at a fixed rate after physics has run.
pub struct Spinner {
    base: ActorBase,
    radians_per_second: f32,
}

impl Default for Spinner {
    fn default() -> Self {
        Self {
            base: ActorBase::new()
                .with_tick_group(TickGroup::PostPhysics)
                .with_component(MeshComponent::new(
                    material("spinner", [0.9, 0.9, 0.2, 1.0]),
                    Vec2::splat(0.5),
                )),
            radians_per_second: std::f32::consts::PI,
        }
    }
}

impl Actor for Spinner {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn type_tag(&self) -> &'static str {
        "Spinner"
    }

    fn tick(&mut self, dt: f32) {
        let rotation = self.base.transform.rotation() + self.radians_per_second * dt;
        self.base.transform.set_rotation(rotation);
    }
}

/// Screen-wide post-process tint.
pub struct Fog {
    base: ActorBase,
}

impl Default for Fog {
    fn default() -> Self {
        let fog = Material {
            name: "fog".into(),
            pass: RenderPass::PostProcess,
            color: [0.8, 0.8, 0.9, 0.3],
        };
        let mut volume = PostProcessVolume::new(Vec2::ZERO);
        volume.unbound = true;
        let mut base = ActorBase::new()
            .with_component(MeshComponent::new(fog, Vec2::splat(2.0)))
            .with_component(volume);
        base.should_replicate = false;
        Self { base }
    }
}

impl Actor for Fog {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn type_tag(&self) -> &'static str {
        "Fog"
    }
}

pub struct Sandbox;

impl GameMode for Sandbox {
    fn name(&self) -> &str {
        "Sandbox"
    }

    fn controller_type(&self) -> Option<&str> {
        Some("Pawn")
    }
}

/// Moves the possessed actor along the input move axis.
pub struct PawnController {
    speed: f32,
}

impl Controller for PawnController {
    fn tick(&mut self, ctx: &mut ControllerContext<'_>) {
        let step = ctx.input.move_axis() * self.speed * ctx.dt;
        if step == Vec2::ZERO {
            return;
        }
        if let Some(pawn) = ctx.pawn
            && let Some(actor) = ctx.scene.get_mut(pawn)
        {
            actor.base_mut().transform.translate(step);
        }
    }
}

pub fn services() -> ServiceLocator {
    let mut services = ServiceLocator::new();
    services.register_actor_type::<Crate>("Crate");
    services.register_actor_type::<Ground>("Ground");
    services.register_actor_type::<Spinner>("Spinner");
    services.register_actor_type::<Fog>("Fog");
    services.register_game_mode("Sandbox", || Box::new(Sandbox));
    services.register_controller("Pawn", || Box::new(PawnController { speed: 4.0 }));
    services
}

use std::collections::HashMap;

use glam::{Mat3, Vec2};
use stagecraft_common::ActorId;
use stagecraft_kernel::{Actor, MeshComponent, RenderPass};

use crate::camera::Camera;
use crate::gpu::{DrawCall, GpuContext, TextureId};

/// Per-frame state shared by every renderer.
pub struct RenderFrame<'a> {
    /// Identity when no camera is set.
    pub view_projection: Mat3,
    pub camera: Option<&'a Camera>,
    pub debug: bool,
}

/// The actor being drawn and its derived world position.
pub struct RenderItem<'a> {
    pub actor: &'a (dyn Actor + 'static),
    pub world_position: Vec2,
}

/// Draws one kind of actor.
///
/// A renderer reads actor state and issues draw calls; it never mutates the
/// scene.
pub trait ActorRenderer {
    /// Returns false when the renderer did not handle this actor, in which
    /// case the registry's fallback draws it.
    fn render(&self, item: &RenderItem<'_>, frame: &RenderFrame<'_>, gpu: &mut dyn GpuContext) -> bool;

    fn render_debug(&self, _item: &RenderItem<'_>, _frame: &RenderFrame<'_>, _gpu: &mut dyn GpuContext) {}
}

/// A renderer bound to one concrete actor type. Wrap in [`Typed`] to
/// register.
pub trait TypedActorRenderer {
    type Target: Actor;

    fn render_typed(
        &self,
        actor: &Self::Target,
        item: &RenderItem<'_>,
        frame: &RenderFrame<'_>,
        gpu: &mut dyn GpuContext,
    ) -> bool;
}

pub struct Typed<R>(pub R);

impl<R: TypedActorRenderer> ActorRenderer for Typed<R> {
    fn render(&self, item: &RenderItem<'_>, frame: &RenderFrame<'_>, gpu: &mut dyn GpuContext) -> bool {
        match item.actor.downcast_ref::<R::Target>() {
            Some(actor) => self.0.render_typed(actor, item, frame, gpu),
            None => false,
        }
    }
}

/// Clip-space transform for a unit quad of `size` centred at `center`.
pub fn quad_transform(view_projection: Mat3, center: Vec2, size: Vec2, rotation: f32) -> Mat3 {
    view_projection * Mat3::from_scale_angle_translation(size, rotation, center)
}

/// Draws every forward-pass mesh on the actor.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshRenderer;

impl ActorRenderer for MeshRenderer {
    fn render(&self, item: &RenderItem<'_>, frame: &RenderFrame<'_>, gpu: &mut dyn GpuContext) -> bool {
        let base = item.actor.base();
        let rotation = base.transform.rotation();
        for mesh in base
            .components()
            .iter_of::<MeshComponent>()
            .filter(|m| m.pass() == RenderPass::Forward)
        {
            gpu.draw(DrawCall {
                actor: Some(base.id()),
                material: mesh.material.name.clone(),
                transform: quad_transform(
                    frame.view_projection,
                    item.world_position + mesh.offset,
                    mesh.size,
                    rotation,
                ),
                color: mesh.material.color,
                source: None,
                wireframe: false,
            });
        }
        true
    }
}

/// Full-screen pass for a post-process material sampling `scene_color`.
pub fn draw_post_process(
    gpu: &mut dyn GpuContext,
    owner: ActorId,
    mesh: &MeshComponent,
    scene_color: TextureId,
) {
    gpu.draw(DrawCall {
        actor: Some(owner),
        material: mesh.material.name.clone(),
        transform: Mat3::from_scale(Vec2::splat(2.0)),
        color: mesh.material.color,
        source: Some(scene_color),
        wireframe: false,
    });
}

/// Maps actor type tags to renderers, resolved once when registered.
pub struct RendererRegistry {
    by_tag: HashMap<String, Box<dyn ActorRenderer>>,
    fallback: Box<dyn ActorRenderer>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::with_fallback(Box::new(MeshRenderer))
    }

    pub fn with_fallback(fallback: Box<dyn ActorRenderer>) -> Self {
        Self {
            by_tag: HashMap::new(),
            fallback,
        }
    }

    /// Returns the renderer previously registered for `tag`, if any.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        renderer: Box<dyn ActorRenderer>,
    ) -> Option<Box<dyn ActorRenderer>> {
        let tag = tag.into();
        tracing::debug!(%tag, "renderer registered");
        self.by_tag.insert(tag, renderer)
    }

    pub fn register_typed<R>(&mut self, tag: impl Into<String>, renderer: R)
    where
        R: TypedActorRenderer + 'static,
    {
        self.register(tag, Box::new(Typed(renderer)));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }

    /// Registered renderer for `tag`, or the fallback.
    pub fn resolve(&self, tag: &str) -> &dyn ActorRenderer {
        self.by_tag
            .get(tag)
            .map(|r| r.as_ref())
            .unwrap_or(self.fallback.as_ref())
    }

    /// Draw one actor through its renderer, falling back when the renderer
    /// declines.
    pub fn render(&self, item: &RenderItem<'_>, frame: &RenderFrame<'_>, gpu: &mut dyn GpuContext) {
        let tag = item.actor.type_tag();
        if let Some(r) = self.by_tag.get(tag)
            && r.render(item, frame, gpu)
        {
            return;
        }
        self.fallback.render(item, frame, gpu);
    }

    pub fn render_debug(&self, item: &RenderItem<'_>, frame: &RenderFrame<'_>, gpu: &mut dyn GpuContext) {
        self.resolve(item.actor.type_tag()).render_debug(item, frame, gpu);
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextGpuContext;
    use stagecraft_kernel::{ActorBase, BasicActor, Material};

    struct Lamp {
        base: ActorBase,
        lit: bool,
    }

    impl Actor for Lamp {
        fn base(&self) -> &ActorBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ActorBase {
            &mut self.base
        }
        fn type_tag(&self) -> &'static str {
            "Lamp"
        }
    }

    struct LampRenderer;

    impl TypedActorRenderer for LampRenderer {
        type Target = Lamp;

        fn render_typed(
            &self,
            actor: &Lamp,
            item: &RenderItem<'_>,
            frame: &RenderFrame<'_>,
            gpu: &mut dyn GpuContext,
        ) -> bool {
            if !actor.lit {
                return false;
            }
            gpu.draw(DrawCall {
                actor: Some(actor.id()),
                material: "glow".into(),
                transform: quad_transform(frame.view_projection, item.world_position, Vec2::ONE, 0.0),
                color: [1.0, 1.0, 0.5, 1.0],
                source: None,
                wireframe: false,
            });
            true
        }
    }

    fn frame() -> RenderFrame<'static> {
        RenderFrame {
            view_projection: Mat3::IDENTITY,
            camera: None,
            debug: false,
        }
    }

    fn lamp(lit: bool) -> Lamp {
        let base = ActorBase::new().with_component(MeshComponent::new(Material::default(), Vec2::ONE));
        Lamp { base, lit }
    }

    fn materials(gpu: &TextGpuContext) -> Vec<String> {
        gpu.draws().map(|(_, c)| c.material.clone()).collect()
    }

    #[test]
    fn typed_renderer_handles_its_tag() {
        let mut registry = RendererRegistry::new();
        registry.register_typed("Lamp", LampRenderer);
        let actor = lamp(true);
        let mut gpu = TextGpuContext::new(10, 10);
        let item = RenderItem {
            actor: &actor,
            world_position: Vec2::ZERO,
        };
        registry.render(&item, &frame(), &mut gpu);
        assert_eq!(materials(&gpu), vec!["glow".to_string()]);
    }

    #[test]
    fn declined_render_falls_back_to_mesh_renderer() {
        let mut registry = RendererRegistry::new();
        registry.register_typed("Lamp", LampRenderer);
        let actor = lamp(false);
        let mut gpu = TextGpuContext::new(10, 10);
        let item = RenderItem {
            actor: &actor,
            world_position: Vec2::ZERO,
        };
        registry.render(&item, &frame(), &mut gpu);
        assert_eq!(materials(&gpu), vec!["default".to_string()]);
    }

    #[test]
    fn unknown_tag_resolves_to_fallback() {
        let registry = RendererRegistry::new();
        assert!(!registry.contains("Actor"));
        let actor = BasicActor::from_base(
            ActorBase::new().with_component(MeshComponent::new(Material::default(), Vec2::ONE)),
        );
        let mut gpu = TextGpuContext::new(10, 10);
        let item = RenderItem {
            actor: &actor,
            world_position: Vec2::new(1.0, 2.0),
        };
        assert!(registry.resolve("Actor").render(&item, &frame(), &mut gpu));
        let (_, call) = gpu.draws().next().unwrap();
        assert_eq!(call.transform.z_axis.truncate(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn mesh_renderer_skips_post_process_meshes() {
        let post = Material {
            name: "fog".into(),
            pass: RenderPass::PostProcess,
            ..Material::default()
        };
        let actor = BasicActor::from_base(
            ActorBase::new()
                .with_component(MeshComponent::new(post, Vec2::ONE))
                .with_component(MeshComponent::new(Material::default(), Vec2::ONE)),
        );
        let mut gpu = TextGpuContext::new(10, 10);
        let item = RenderItem {
            actor: &actor,
            world_position: Vec2::ZERO,
        };
        MeshRenderer.render(&item, &frame(), &mut gpu);
        assert_eq!(materials(&gpu), vec!["default".to_string()]);
    }

    #[test]
    fn post_process_samples_scene_texture() {
        let mut gpu = TextGpuContext::new(10, 10);
        let mesh = MeshComponent::new(Material::default(), Vec2::ONE);
        draw_post_process(&mut gpu, ActorId::new(), &mesh, TextureId(7));
        let (_, call) = gpu.draws().next().unwrap();
        assert_eq!(call.source, Some(TextureId(7)));
    }
}

use std::time::Instant;

use glam::{Mat3, Vec2};
use stagecraft_common::ActorId;
use stagecraft_kernel::{BodyType, MeshComponent, PostProcessVolume, RenderPass, Scene};
use stagecraft_render::{
    Camera, DrawCall, GpuContext, RenderError, RenderFrame, RenderItem, draw_post_process,
    quad_transform,
};

use crate::clock::FrameStats;
use crate::engine::Engine;
use crate::error::EngineError;

/// Handle for removing an after-render callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Read-only view handed to after-render callbacks.
pub struct FrameView<'a> {
    pub scene: &'a Scene,
    pub stats: &'a FrameStats,
    pub camera: Option<&'a Camera>,
}

pub type AfterRender = Box<dyn FnMut(&FrameView<'_>)>;

fn debug_color(body_type: BodyType) -> [f32; 4] {
    match body_type {
        BodyType::Static => [0.2, 0.9, 0.2, 1.0],
        BodyType::Dynamic => [0.9, 0.6, 0.1, 1.0],
        BodyType::Kinematic => [0.3, 0.6, 1.0, 1.0],
    }
}

/// Post-process meshes in draw order. A mesh on a post-process volume only
/// applies while the camera is inside the volume.
fn collect_post_process(
    scene: &Scene,
    order: &[ActorId],
    camera_position: Option<Vec2>,
) -> Vec<(ActorId, MeshComponent)> {
    let mut out = Vec::new();
    for id in order {
        let Some(actor) = scene.get(*id) else {
            continue;
        };
        let components = actor.base().components();
        let active = match components.get::<PostProcessVolume>() {
            Some(volume) => {
                volume.unbound
                    || camera_position.is_some_and(|cam| volume.contains(scene.world_position(*id), cam))
            }
            None => true,
        };
        if !active {
            continue;
        }
        out.extend(
            components
                .iter_of::<MeshComponent>()
                .filter(|m| m.pass() == RenderPass::PostProcess)
                .map(|m| (*id, m.clone())),
        );
    }
    out
}

impl Engine {
    /// Draw one frame.
    ///
    /// Only spawned actors are drawn, in ascending `layer` order (stable).
    /// Bodies are synced to actor transforms first. With a camera,
    /// actors outside the frustum are marked not-rendering and skipped;
    /// without one everything is drawn with an identity view-projection.
    /// When any post-process material is active the forward pass goes to an
    /// offscreen target that the post-process pass then samples. The debug
    /// pass runs last with depth testing off, only with a camera.
    pub fn render(&mut self, gpu: &mut dyn GpuContext) -> Result<(), EngineError> {
        self.ensure_running()?;
        if self.frame_in_flight {
            return Err(EngineError::FrameInFlight);
        }
        let _span = tracing::trace_span!("render").entered();

        let (width, height) = gpu.viewport_size();
        let aspect = if height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
        let (view_projection, frustum) = match self.camera.as_mut() {
            Some(camera) => {
                camera.set_viewport_size(width, height);
                let vp = camera.view_projection_matrix(aspect);
                (vp, Some(*camera.frustum(aspect)))
            }
            None => (Mat3::IDENTITY, None),
        };

        if let Some(physics) = self.physics.as_mut() {
            physics.sync_transforms(&self.scene);
        }
        let mut order = self.scene.flatten();
        order.retain(|id| self.scene.get(*id).is_some_and(|a| a.base().is_spawned()));
        order.sort_by_key(|id| self.scene.get(*id).map_or(0, |a| a.base().layer));

        let camera_position = self.camera.as_ref().map(Camera::position);
        let post = collect_post_process(&self.scene, &order, camera_position);
        let target = if post.is_empty() {
            None
        } else {
            Some(self.offscreen.ensure(gpu, width, height)?)
        };

        gpu.bind_framebuffer(target);
        gpu.set_depth_test(true);
        gpu.clear(self.config.clear_color);

        let frame = RenderFrame {
            view_projection,
            camera: self.camera.as_ref(),
            debug: self.config.debug_physics,
        };
        let mut drawn = 0usize;
        for id in &order {
            let world_position = self.scene.world_position(*id);
            let Some(actor) = self.scene.get_mut(*id) else {
                continue;
            };
            let visible = !actor.base().hidden_in_game
                && match (&frustum, self.physics.as_deref()) {
                    (Some(f), Some(physics)) => physics.check_within_bounds(actor, f),
                    _ => true,
                };
            if actor.base_mut().set_rendering(visible) {
                actor.on_rendering_changed(visible);
            }
            if !visible {
                continue;
            }
            let Some(actor) = self.scene.get(*id) else {
                continue;
            };
            self.renderers.render(
                &RenderItem {
                    actor,
                    world_position,
                },
                &frame,
                gpu,
            );
            drawn += 1;
        }

        if let Some(fb) = target {
            gpu.bind_framebuffer(None);
            let texture = gpu
                .color_texture(fb)
                .ok_or(RenderError::FramebufferIncomplete { width, height })?;
            for (owner, mesh) in &post {
                draw_post_process(gpu, *owner, mesh, texture);
            }
        }

        if frame.debug && frame.camera.is_some() {
            gpu.set_depth_test(false);
            for id in &order {
                if let Some(actor) = self.scene.get(*id)
                    && actor.base().is_rendering()
                {
                    let item = RenderItem {
                        actor,
                        world_position: self.scene.world_position(*id),
                    };
                    self.renderers.render_debug(&item, &frame, gpu);
                }
            }
            if let Some(physics) = self.physics.as_deref() {
                for shape in physics.debug_shapes() {
                    let size = Vec2::new(shape.bounds.width(), shape.bounds.height());
                    gpu.draw(DrawCall {
                        actor: None,
                        material: "debug".into(),
                        transform: quad_transform(view_projection, shape.bounds.center(), size, 0.0),
                        color: debug_color(shape.body_type),
                        source: None,
                        wireframe: true,
                    });
                }
            }
            gpu.set_depth_test(true);
        }

        self.frame_in_flight = true;
        tracing::trace!(drawn, post = post.len(), "frame rendered");
        Ok(())
    }

    /// Close the frame opened by `render`: update the FPS window and run
    /// after-render callbacks.
    pub fn finish_frame(&mut self) -> Result<FrameStats, EngineError> {
        if !self.frame_in_flight {
            return Err(EngineError::NoFrameInFlight);
        }
        self.frame_in_flight = false;
        let stats = self.frame_timer.frame_finished(Instant::now());
        let view = FrameView {
            scene: &self.scene,
            stats: &stats,
            camera: self.camera.as_ref(),
        };
        for (_, callback) in &mut self.after_render {
            callback(&view);
        }
        Ok(stats)
    }

    pub fn on_after_render(&mut self, callback: impl FnMut(&FrameView<'_>) + 'static) -> CallbackId {
        let id = CallbackId(self.next_callback);
        self.next_callback += 1;
        self.after_render.push((id, Box::new(callback)));
        id
    }

    pub fn remove_after_render(&mut self, id: CallbackId) -> bool {
        let before = self.after_render.len();
        self.after_render.retain(|(cid, _)| *cid != id);
        self.after_render.len() != before
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.frame_timer.stats()
    }

    /// Release the offscreen target's GPU resources.
    pub fn release_gpu_resources(&mut self, gpu: &mut dyn GpuContext) {
        self.offscreen.release(gpu);
    }
}

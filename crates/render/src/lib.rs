//! Rendering seam: the camera, the GPU context the engine draws through,
//! and the registry that maps actor types to renderers.
//!
//! # Invariants
//! - Renderers read actor state; they never mutate the scene.
//! - Screen/world conversion is an exact inverse pair for a fixed camera.
//! - The offscreen target is reallocated only when the viewport size changes.

mod camera;
mod gpu;
mod renderer;
mod text;

pub use camera::{Camera, MAX_ZOOM, MIN_ZOOM};
pub use gpu::{DrawCall, FramebufferId, GpuContext, OffscreenTarget, RenderError, TextureId};
pub use renderer::{
    ActorRenderer, MeshRenderer, RenderFrame, RenderItem, RendererRegistry, Typed,
    TypedActorRenderer, draw_post_process, quad_transform,
};
pub use text::{GpuCommand, TextGpuContext};

use glam::Mat3;
use stagecraft_common::ActorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("framebuffer {width}x{height} is incomplete")]
    FramebufferIncomplete { width: u32, height: u32 },
}

/// One textured quad.
///
/// `transform` maps the unit quad (corners at +-0.5) straight to clip space.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub actor: Option<ActorId>,
    pub material: String,
    pub transform: Mat3,
    pub color: [f32; 4],
    /// Texture sampled by post-process materials.
    pub source: Option<TextureId>,
    pub wireframe: bool,
}

/// The GPU surface the engine renders through.
pub trait GpuContext {
    /// Drawable size in pixels.
    fn viewport_size(&self) -> (u32, u32);

    /// Allocate an offscreen framebuffer with a colour attachment.
    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId, RenderError>;

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId);

    fn color_texture(&self, framebuffer: FramebufferId) -> Option<TextureId>;

    /// `None` binds the default framebuffer.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    fn clear(&mut self, color: [f32; 4]);

    fn set_depth_test(&mut self, enabled: bool);

    fn draw(&mut self, call: DrawCall);
}

/// Offscreen colour target for the post-process path. Reallocated only when
/// the requested size changes.
#[derive(Debug, Default)]
pub struct OffscreenTarget {
    framebuffer: Option<FramebufferId>,
    size: (u32, u32),
    allocations: u32,
}

impl OffscreenTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn framebuffer(&self) -> Option<FramebufferId> {
        self.framebuffer
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// How many times the target has been (re)allocated.
    pub fn allocations(&self) -> u32 {
        self.allocations
    }

    pub fn ensure(
        &mut self,
        gpu: &mut dyn GpuContext,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId, RenderError> {
        if let Some(fb) = self.framebuffer
            && self.size == (width, height)
        {
            return Ok(fb);
        }
        if let Some(old) = self.framebuffer.take() {
            gpu.destroy_framebuffer(old);
        }
        let fb = gpu.create_framebuffer(width, height)?;
        tracing::debug!(width, height, "offscreen target allocated");
        self.framebuffer = Some(fb);
        self.size = (width, height);
        self.allocations += 1;
        Ok(fb)
    }

    pub fn release(&mut self, gpu: &mut dyn GpuContext) {
        if let Some(fb) = self.framebuffer.take() {
            gpu.destroy_framebuffer(fb);
        }
        self.size = (0, 0);
    }
}

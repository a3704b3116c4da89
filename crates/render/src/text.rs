use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::gpu::{DrawCall, FramebufferId, GpuContext, RenderError, TextureId};

/// Everything a [`TextGpuContext`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateFramebuffer {
        id: FramebufferId,
        width: u32,
        height: u32,
    },
    DestroyFramebuffer(FramebufferId),
    Bind(Option<FramebufferId>),
    Clear([f32; 4]),
    DepthTest(bool),
    Draw {
        target: Option<FramebufferId>,
        depth_test: bool,
        call: DrawCall,
    },
}

/// Headless GPU context that records commands instead of issuing them.
///
/// Used by the CLI and by tests to observe what a frame would draw, and to
/// print a readable frame dump.
#[derive(Debug)]
pub struct TextGpuContext {
    width: u32,
    height: u32,
    bound: Option<FramebufferId>,
    depth_test: bool,
    framebuffers: BTreeMap<FramebufferId, (u32, u32)>,
    next_framebuffer: u32,
    fail_framebuffers: bool,
    commands: Vec<GpuCommand>,
}

impl TextGpuContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bound: None,
            depth_test: true,
            framebuffers: BTreeMap::new(),
            next_framebuffer: 1,
            fail_framebuffers: false,
            commands: Vec::new(),
        }
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Make every subsequent framebuffer allocation report incomplete.
    pub fn fail_framebuffers(&mut self, fail: bool) {
        self.fail_framebuffers = fail;
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Draw calls with the framebuffer each one targeted.
    pub fn draws(&self) -> impl Iterator<Item = (Option<FramebufferId>, &DrawCall)> {
        self.commands.iter().filter_map(|c| match c {
            GpuCommand::Draw { target, call, .. } => Some((*target, call)),
            _ => None,
        })
    }

    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn bound(&self) -> Option<FramebufferId> {
        self.bound
    }

    pub fn depth_test_enabled(&self) -> bool {
        self.depth_test
    }

    /// Human-readable dump of the recorded commands.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Frame ({}x{}) ===", self.width, self.height);
        let draws = self.draws().count();
        let _ = writeln!(out, "Draw calls: {draws}");
        for cmd in &self.commands {
            match cmd {
                GpuCommand::CreateFramebuffer { id, width, height } => {
                    let _ = writeln!(out, "  create fb#{} {}x{}", id.0, width, height);
                }
                GpuCommand::DestroyFramebuffer(id) => {
                    let _ = writeln!(out, "  destroy fb#{}", id.0);
                }
                GpuCommand::Bind(target) => {
                    let _ = writeln!(out, "  bind {}", target_name(*target));
                }
                GpuCommand::Clear(c) => {
                    let _ = writeln!(
                        out,
                        "  clear ({:.2}, {:.2}, {:.2}, {:.2})",
                        c[0], c[1], c[2], c[3]
                    );
                }
                GpuCommand::DepthTest(on) => {
                    let _ = writeln!(out, "  depth-test {}", if *on { "on" } else { "off" });
                }
                GpuCommand::Draw { target, call, .. } => {
                    let actor = call
                        .actor
                        .map(|a| a.short())
                        .unwrap_or_else(|| "--------".into());
                    let t = call.transform.z_axis;
                    let _ = writeln!(
                        out,
                        "  draw [{}] {}{} -> {} at ({:.2}, {:.2})",
                        actor,
                        call.material,
                        if call.wireframe { " (wire)" } else { "" },
                        target_name(*target),
                        t.x,
                        t.y
                    );
                }
            }
        }
        out
    }
}

fn target_name(target: Option<FramebufferId>) -> String {
    match target {
        Some(fb) => format!("fb#{}", fb.0),
        None => "screen".into(),
    }
}

impl GpuContext for TextGpuContext {
    fn viewport_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_framebuffer(&mut self, width: u32, height: u32) -> Result<FramebufferId, RenderError> {
        if self.fail_framebuffers || width == 0 || height == 0 {
            return Err(RenderError::FramebufferIncomplete { width, height });
        }
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        self.framebuffers.insert(id, (width, height));
        self.commands
            .push(GpuCommand::CreateFramebuffer { id, width, height });
        Ok(id)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferId) {
        if self.framebuffers.remove(&framebuffer).is_some() {
            if self.bound == Some(framebuffer) {
                self.bound = None;
            }
            self.commands.push(GpuCommand::DestroyFramebuffer(framebuffer));
        }
    }

    fn color_texture(&self, framebuffer: FramebufferId) -> Option<TextureId> {
        self.framebuffers
            .contains_key(&framebuffer)
            .then_some(TextureId(framebuffer.0))
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.bound = framebuffer;
        self.commands.push(GpuCommand::Bind(framebuffer));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.commands.push(GpuCommand::Clear(color));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.depth_test = enabled;
        self.commands.push(GpuCommand::DepthTest(enabled));
    }

    fn draw(&mut self, call: DrawCall) {
        self.commands.push(GpuCommand::Draw {
            target: self.bound,
            depth_test: self.depth_test,
            call,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat3;

    fn quad(material: &str) -> DrawCall {
        DrawCall {
            actor: None,
            material: material.into(),
            transform: Mat3::IDENTITY,
            color: [1.0; 4],
            source: None,
            wireframe: false,
        }
    }

    #[test]
    fn draws_record_bound_target() {
        let mut gpu = TextGpuContext::new(100, 100);
        let fb = gpu.create_framebuffer(100, 100).unwrap();
        gpu.bind_framebuffer(Some(fb));
        gpu.draw(quad("a"));
        gpu.bind_framebuffer(None);
        gpu.draw(quad("b"));
        let targets: Vec<_> = gpu.draws().map(|(t, c)| (t, c.material.clone())).collect();
        assert_eq!(targets, vec![(Some(fb), "a".into()), (None, "b".into())]);
    }

    #[test]
    fn color_texture_only_for_live_framebuffers() {
        let mut gpu = TextGpuContext::new(10, 10);
        let fb = gpu.create_framebuffer(10, 10).unwrap();
        assert!(gpu.color_texture(fb).is_some());
        gpu.destroy_framebuffer(fb);
        assert!(gpu.color_texture(fb).is_none());
    }

    #[test]
    fn text_dump_lists_draws() {
        let mut gpu = TextGpuContext::new(320, 200);
        gpu.clear([0.0, 0.0, 0.0, 1.0]);
        gpu.draw(quad("crate"));
        let text = gpu.render_text();
        assert!(text.contains("320x200"));
        assert!(text.contains("Draw calls: 1"));
        assert!(text.contains("crate -> screen"));
    }

    #[test]
    fn zero_sized_framebuffer_is_incomplete() {
        let mut gpu = TextGpuContext::new(0, 0);
        assert!(gpu.create_framebuffer(0, 10).is_err());
    }
}

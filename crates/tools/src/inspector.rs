use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use stagecraft_common::ActorId;
use stagecraft_engine::{CallbackId, Engine, FrameStats, FrameView};
use stagecraft_kernel::Scene;

/// One actor as seen at the end of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorEntry {
    pub id: ActorId,
    pub type_tag: &'static str,
    /// Top-level actors are at depth 0.
    pub depth: usize,
    pub world_position: Vec2,
    pub layer: i32,
    pub spawned: bool,
    pub rendering: bool,
}

impl fmt::Display for ActorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indent = "  ".repeat(self.depth);
        write!(
            f,
            "{indent}{} [{}] pos=({:.2}, {:.2}) layer={}",
            self.type_tag,
            self.id.short(),
            self.world_position.x,
            self.world_position.y,
            self.layer,
        )?;
        if !self.spawned {
            f.write_str(" unspawned")?;
        }
        if self.rendering {
            f.write_str(" visible")?;
        }
        Ok(())
    }
}

/// Read-only copy of the scene tree and frame statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSnapshot {
    pub frame: u64,
    pub fps: f32,
    /// Pre-order, root excluded.
    pub actors: Vec<ActorEntry>,
}

impl SceneSnapshot {
    pub fn capture(view: &FrameView<'_>) -> Self {
        Self::from_scene(view.scene, view.stats)
    }

    pub fn from_scene(scene: &Scene, stats: &FrameStats) -> Self {
        let actors = scene
            .flatten()
            .into_iter()
            .filter_map(|id| {
                let actor = scene.get(id)?;
                let base = actor.base();
                Some(ActorEntry {
                    id,
                    type_tag: actor.type_tag(),
                    depth: scene.depth(id),
                    world_position: scene.world_position(id),
                    layer: base.layer,
                    spawned: base.is_spawned(),
                    rendering: base.is_rendering(),
                })
            })
            .collect();
        Self {
            frame: stats.frame,
            fps: stats.fps,
            actors,
        }
    }

    pub fn find(&self, id: ActorId) -> Option<&ActorEntry> {
        self.actors.iter().find(|a| a.id == id)
    }

    pub fn rendering_count(&self) -> usize {
        self.actors.iter().filter(|a| a.rendering).count()
    }
}

impl fmt::Display for SceneSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scene: frame={} fps={:.1} actors={} rendering={}",
            self.frame,
            self.fps,
            self.actors.len(),
            self.rendering_count()
        )?;
        for actor in &self.actors {
            write!(f, "\n{actor}")?;
        }
        Ok(())
    }
}

/// Keeps the latest [`SceneSnapshot`], refreshed after every rendered
/// frame once attached to an engine.
#[derive(Default)]
pub struct SceneInspector {
    latest: Rc<RefCell<Option<SceneSnapshot>>>,
    callback: Option<CallbackId>,
}

impl SceneInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register with `engine`'s after-render hook, replacing any previous
    /// registration.
    pub fn attach(&mut self, engine: &mut Engine) -> CallbackId {
        self.detach(engine);
        let latest = Rc::clone(&self.latest);
        let id = engine.on_after_render(move |view| {
            *latest.borrow_mut() = Some(SceneSnapshot::capture(view));
        });
        tracing::debug!("scene inspector attached");
        self.callback = Some(id);
        id
    }

    pub fn detach(&mut self, engine: &mut Engine) -> bool {
        match self.callback.take() {
            Some(id) => engine.remove_after_render(id),
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.callback.is_some()
    }

    pub fn latest(&self) -> Option<SceneSnapshot> {
        self.latest.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_engine::{EngineConfig, SpawnOptions};
    use stagecraft_kernel::{Actor, BasicActor};
    use stagecraft_physics::SimplePhysicsWorld;
    use stagecraft_render::TextGpuContext;

    fn engine() -> Engine {
        let mut e =
            Engine::new(EngineConfig::default()).with_physics(Box::new(SimplePhysicsWorld::new()));
        e.run(false).unwrap();
        e
    }

    fn basic() -> Box<dyn Actor> {
        Box::new(BasicActor::new())
    }

    fn frame(engine: &mut Engine) {
        let mut gpu = TextGpuContext::new(64, 64);
        engine.render(&mut gpu).unwrap();
        engine.finish_frame().unwrap();
    }

    #[test]
    fn nothing_captured_before_a_frame() {
        let mut e = engine();
        let mut inspector = SceneInspector::new();
        inspector.attach(&mut e);
        assert!(inspector.latest().is_none());
    }

    #[test]
    fn captures_tree_after_each_frame() {
        let mut e = engine();
        let mut inspector = SceneInspector::new();
        inspector.attach(&mut e);

        let parent = e
            .spawn_actor(basic(), SpawnOptions::default().at(Vec2::new(1.0, 0.0)))
            .unwrap();
        let child = e
            .spawn_actor(basic(), SpawnOptions::default().under(parent).at(Vec2::Y))
            .unwrap();
        frame(&mut e);

        let snap = inspector.latest().unwrap();
        assert_eq!(snap.frame, 0);
        assert_eq!(snap.actors.len(), 2);
        let entry = snap.find(child).unwrap();
        assert_eq!(entry.depth, 1);
        assert_eq!(entry.world_position, Vec2::new(1.0, 1.0));
        assert!(entry.spawned);
        assert_eq!(snap.rendering_count(), 2);

        frame(&mut e);
        assert_eq!(inspector.latest().unwrap().frame, 1);
    }

    #[test]
    fn detach_stops_updates() {
        let mut e = engine();
        let mut inspector = SceneInspector::new();
        inspector.attach(&mut e);
        frame(&mut e);
        assert!(inspector.detach(&mut e));
        assert!(!inspector.is_attached());
        frame(&mut e);
        assert_eq!(inspector.latest().unwrap().frame, 0);
        assert!(!inspector.detach(&mut e));
    }

    #[test]
    fn snapshot_display_indents_children() {
        let mut e = engine();
        let parent = e.spawn_actor(basic(), SpawnOptions::default()).unwrap();
        e.spawn_actor(basic(), SpawnOptions::default().under(parent))
            .unwrap();
        let snap = SceneSnapshot::from_scene(e.scene(), &e.frame_stats());
        let text = format!("{snap}");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Scene: frame=0"));
        assert!(lines[0].contains("actors=2"));
        assert!(lines[1].starts_with("Actor ["));
        assert!(lines[2].starts_with("  Actor ["));
    }
}

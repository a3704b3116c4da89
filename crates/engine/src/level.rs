use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use stagecraft_kernel::Actor;

use crate::error::{EngineError, LevelError};
use crate::registry::ServiceLocator;

pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, -9.81);

/// A set of top-level actors plus the rules to load them under.
///
/// Actors added after the level has been handed to the engine have no
/// effect; the engine takes ownership on load.
pub struct Level {
    pub game_mode: Option<String>,
    pub gravity: Vec2,
    actors: Vec<Box<dyn Actor>>,
}

impl Level {
    pub fn new() -> Self {
        Self {
            game_mode: None,
            gravity: DEFAULT_GRAVITY,
            actors: Vec::new(),
        }
    }

    pub fn with_game_mode(mut self, name: impl Into<String>) -> Self {
        self.game_mode = Some(name.into());
        self
    }

    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn add_actor(&mut self, actor: Box<dyn Actor>) {
        self.actors.push(actor);
    }

    pub fn with_actor(mut self, actor: Box<dyn Actor>) -> Self {
        self.add_actor(actor);
        self
    }

    pub fn actors(&self) -> impl Iterator<Item = &dyn Actor> {
        self.actors.iter().map(|a| a.as_ref() as &dyn Actor)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn validate(&self) -> Result<(), LevelError> {
        if !self.gravity.is_finite() {
            return Err(LevelError::Invalid(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        if let Some(name) = &self.game_mode
            && name.trim().is_empty()
        {
            return Err(LevelError::Invalid("game mode name is empty".into()));
        }
        if let Some(a) = self.actors.iter().find(|a| a.base().is_spawned()) {
            return Err(LevelError::Invalid(format!(
                "actor {} is already spawned",
                a.id()
            )));
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (Option<String>, Vec2, Vec<Box<dyn Actor>>) {
        (self.game_mode, self.gravity, self.actors)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::new()
    }
}

fn default_gravity() -> Vec2 {
    DEFAULT_GRAVITY
}

/// One actor entry in a level file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorDescriptor {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub layer: i32,
    #[serde(default)]
    pub children: Vec<ActorDescriptor>,
}

/// On-disk level format.
///
/// ```json
/// {
///   "game_mode": "Sandbox",
///   "gravity": [0.0, -9.81],
///   "actors": [
///     { "type": "Ground", "position": [0.0, -4.0] },
///     { "type": "Crate", "position": [0.0, 3.0], "layer": 1,
///       "children": [{ "type": "Spinner", "position": [0.0, 1.0] }] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    #[serde(default)]
    pub game_mode: Option<String>,
    #[serde(default = "default_gravity")]
    pub gravity: Vec2,
    #[serde(default)]
    pub actors: Vec<ActorDescriptor>,
}

impl LevelDescriptor {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(LevelError::EmptyPath);
        }
        let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Construct every actor through `services`, nesting children as
    /// pending children of their parent.
    pub fn build(&self, services: &ServiceLocator) -> Result<Level, EngineError> {
        let mut level = Level::new().with_gravity(self.gravity);
        level.game_mode = self.game_mode.clone();
        for desc in &self.actors {
            level.add_actor(build_actor(desc, services)?);
        }
        Ok(level)
    }
}

fn build_actor(desc: &ActorDescriptor, services: &ServiceLocator) -> Result<Box<dyn Actor>, EngineError> {
    let mut actor = services.create_actor(&desc.type_tag)?;
    let base = actor.base_mut();
    base.transform.set_position(desc.position);
    base.transform.set_rotation(desc.rotation);
    base.layer = desc.layer;
    for child in &desc.children {
        let child = build_actor(child, services)?;
        actor.base_mut().add_child(child);
    }
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_kernel::BasicActor;
    use std::io::Write;

    fn services() -> ServiceLocator {
        let mut s = ServiceLocator::new();
        s.register_actor_type::<BasicActor>("Basic");
        s
    }

    #[test]
    fn descriptor_defaults() {
        let d: LevelDescriptor = serde_json::from_str(r#"{"actors":[{"type":"Basic"}]}"#).unwrap();
        assert_eq!(d.gravity, DEFAULT_GRAVITY);
        assert!(d.game_mode.is_none());
        assert_eq!(d.actors[0].position, Vec2::ZERO);
    }

    #[test]
    fn build_nests_children() {
        let d: LevelDescriptor = serde_json::from_str(
            r#"{"gravity":[0,-1],"actors":[
                {"type":"Basic","position":[1,2],"layer":3,
                 "children":[{"type":"Basic"},{"type":"Basic"}]}
            ]}"#,
        )
        .unwrap();
        let level = d.build(&services()).unwrap();
        assert_eq!(level.len(), 1);
        assert_eq!(level.gravity, Vec2::new(0.0, -1.0));
        let top = level.actors().next().unwrap();
        assert_eq!(top.base().layer, 3);
        assert_eq!(top.base().transform.position(), Vec2::new(1.0, 2.0));
        assert_eq!(top.base().pending_children(), 2);
    }

    #[test]
    fn unknown_type_fails_build() {
        let d: LevelDescriptor =
            serde_json::from_str(r#"{"actors":[{"type":"Dragon"}]}"#).unwrap();
        assert!(matches!(
            d.build(&services()),
            Err(EngineError::UnknownActorType(_))
        ));
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            LevelDescriptor::from_path(""),
            Err(LevelError::EmptyPath)
        ));
    }

    #[test]
    fn reads_level_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"game_mode":"Sandbox","actors":[]}}"#).unwrap();
        let d = LevelDescriptor::from_path(file.path()).unwrap();
        assert_eq!(d.game_mode.as_deref(), Some("Sandbox"));
    }

    #[test]
    fn validate_rejects_bad_levels() {
        let nan = Level::new().with_gravity(Vec2::new(f32::NAN, 0.0));
        assert!(matches!(nan.validate(), Err(LevelError::Invalid(_))));

        let mut spawned = BasicActor::new();
        spawned.base_mut().set_spawned(true);
        let level = Level::new().with_actor(Box::new(spawned));
        assert!(level.validate().is_err());

        assert!(Level::new().with_game_mode(" ").validate().is_err());
    }
}

use std::collections::HashMap;

use stagecraft_kernel::Actor;

use crate::controller::{Controller, GameMode};
use crate::error::EngineError;

type ActorFactory = Box<dyn Fn() -> Box<dyn Actor>>;
type ControllerFactory = Box<dyn Fn() -> Box<dyn Controller>>;
type GameModeFactory = Box<dyn Fn() -> Box<dyn GameMode>>;

/// Factories for actors, controllers, and game modes, keyed by a stable
/// name. Built once at startup and owned by the engine.
#[derive(Default)]
pub struct ServiceLocator {
    actors: HashMap<String, ActorFactory>,
    controllers: HashMap<String, ControllerFactory>,
    game_modes: HashMap<String, GameModeFactory>,
}

impl ServiceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_actor(
        &mut self,
        tag: impl Into<String>,
        factory: impl Fn() -> Box<dyn Actor> + 'static,
    ) {
        self.actors.insert(tag.into(), Box::new(factory));
    }

    /// Register `T` under `tag`, constructed with `Default`.
    pub fn register_actor_type<T: Actor + Default>(&mut self, tag: impl Into<String>) {
        self.register_actor(tag, || Box::new(T::default()));
    }

    pub fn create_actor(&self, tag: &str) -> Result<Box<dyn Actor>, EngineError> {
        self.actors
            .get(tag)
            .map(|f| f())
            .ok_or_else(|| EngineError::UnknownActorType(tag.to_string()))
    }

    pub fn has_actor(&self, tag: &str) -> bool {
        self.actors.contains_key(tag)
    }

    /// Registered actor tags, sorted.
    pub fn actor_types(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.actors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn register_controller(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Controller> + 'static,
    ) {
        self.controllers.insert(name.into(), Box::new(factory));
    }

    pub fn create_controller(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.controllers.get(name).map(|f| f())
    }

    pub fn register_game_mode(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn GameMode> + 'static,
    ) {
        self.game_modes.insert(name.into(), Box::new(factory));
    }

    pub fn create_game_mode(&self, name: &str) -> Option<Box<dyn GameMode>> {
        self.game_modes.get(name).map(|f| f())
    }
}

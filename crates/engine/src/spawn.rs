use std::collections::HashSet;
use std::path::Path;

use futures::future::join_all;
use glam::Vec2;
use stagecraft_common::ActorId;
use stagecraft_kernel::{Actor, ActorBase, LoadError, PhysicsComponent, TickGroup};

use crate::engine::{Engine, EngineState};
use crate::error::EngineError;
use crate::level::{Level, LevelDescriptor};

/// What to spawn: a registered type resolved through the service locator,
/// or a ready instance.
pub enum ActorSource {
    Type(String),
    Instance(Box<dyn Actor>),
}

impl From<Box<dyn Actor>> for ActorSource {
    fn from(actor: Box<dyn Actor>) -> Self {
        Self::Instance(actor)
    }
}

impl From<&str> for ActorSource {
    fn from(tag: &str) -> Self {
        Self::Type(tag.to_string())
    }
}

impl From<String> for ActorSource {
    fn from(tag: String) -> Self {
        Self::Type(tag)
    }
}

/// Where to spawn and which properties to override before `initialize`.
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Defaults to the scene root.
    pub parent: Option<ActorId>,
    /// Local position, applied after the actor is attached.
    pub position: Option<Vec2>,
    pub rotation: Option<f32>,
    pub layer: Option<i32>,
    pub tick_group: Option<TickGroup>,
    pub should_tick: Option<bool>,
    pub should_replicate: Option<bool>,
    pub hidden_in_game: Option<bool>,
}

impl SpawnOptions {
    pub fn under(mut self, parent: ActorId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn on_layer(mut self, layer: i32) -> Self {
        self.layer = Some(layer);
        self
    }

    fn apply(&self, base: &mut ActorBase) {
        if let Some(r) = self.rotation {
            base.transform.set_rotation(r);
        }
        if let Some(l) = self.layer {
            base.layer = l;
        }
        if let Some(g) = self.tick_group {
            base.tick_group = g;
        }
        if let Some(t) = self.should_tick {
            base.should_tick = t;
        }
        if let Some(r) = self.should_replicate {
            base.should_replicate = r;
        }
        if let Some(h) = self.hidden_in_game {
            base.hidden_in_game = h;
        }
    }
}

fn initialize_once(actor: &mut dyn Actor) {
    if !actor.base().is_initialized() {
        actor.initialize();
        actor.base_mut().mark_initialized();
    }
}

impl Engine {
    /// Construct or take an actor, attach it, create physics bodies, and
    /// fire `on_spawned` children-first. On failure nothing is left in the
    /// tree.
    pub fn spawn_actor(
        &mut self,
        source: impl Into<ActorSource>,
        options: SpawnOptions,
    ) -> Result<ActorId, EngineError> {
        if self.state == EngineState::ShutDown {
            return Err(EngineError::ShutDown);
        }
        let mut actor = match source.into() {
            ActorSource::Type(tag) => self.services.create_actor(&tag)?,
            ActorSource::Instance(actor) => actor,
        };
        options.apply(actor.base_mut());
        initialize_once(actor.as_mut());

        let parent = options.parent.unwrap_or(self.scene.root());
        let id = self.scene.insert_under(actor, parent)?;
        if let Some(position) = options.position
            && let Some(actor) = self.scene.get_mut(id)
        {
            actor.base_mut().transform.set_position(position);
        }
        if let Err(err) = self.spawn_attached(id) {
            let mut discarded = Vec::new();
            self.remove_subtree(id, &mut discarded);
            tracing::warn!(%id, error = %err, "spawn failed; subtree discarded");
            return Err(err);
        }
        tracing::debug!(%id, parent = %parent, "actor spawned");
        Ok(id)
    }

    /// Spawn an actor that is already in the tree, then its children.
    pub(crate) fn spawn_attached(&mut self, id: ActorId) -> Result<(), EngineError> {
        let world = self.scene.world_position(id);
        let actor = self.scene.get_mut(id).ok_or(EngineError::UnknownActor(id))?;
        initialize_once(actor);
        let late_children = actor.base_mut().take_pending_children();
        if actor.base().components().has::<PhysicsComponent>() {
            let physics = self.physics.as_mut().ok_or(EngineError::NoPhysicsWorld)?;
            physics.spawn_actor(actor, world)?;
        }
        for child in late_children {
            self.scene.insert_under(child, id)?;
        }
        for child in self.scene.children(id).to_vec() {
            self.spawn_attached(child)?;
        }
        if let Some(actor) = self.scene.get_mut(id) {
            actor.on_spawned();
            actor.base_mut().set_spawned(true);
        }
        Ok(())
    }

    /// Remove a spawned actor and its whole subtree, children first.
    ///
    /// Returns the removed actors in removal order. Unknown ids, the root,
    /// and actors that are not spawned are a no-op.
    pub fn despawn_actor(&mut self, id: ActorId) -> Vec<Box<dyn Actor>> {
        let mut removed = Vec::new();
        if id == self.scene.root()
            || !self.scene.get(id).is_some_and(|a| a.base().is_spawned())
        {
            return removed;
        }
        self.remove_subtree(id, &mut removed);
        tracing::debug!(%id, removed = removed.len(), "actor despawned");
        removed
    }

    pub(crate) fn remove_subtree(&mut self, id: ActorId, removed: &mut Vec<Box<dyn Actor>>) {
        for child in self.scene.children(id).to_vec() {
            self.remove_subtree(child, removed);
        }
        let Some(actor) = self.scene.get_mut(id) else {
            return;
        };
        if actor.base().is_spawned() {
            actor.on_despawned();
        }
        self.scene.detach(id);
        let Some(actor) = self.scene.get_mut(id) else {
            return;
        };
        if let Some(physics) = self.physics.as_mut() {
            physics.despawn_actor(actor);
        }
        let holder = actor.base().possessed_by();
        actor.base_mut().set_possessed_by(None);
        actor.base_mut().set_spawned(false);
        if let Some(player) = holder.and_then(|p| self.players.get_mut(&p))
            && player.pawn() == Some(id)
        {
            player.set_pawn(None);
        }
        if let Some(actor) = self.scene.remove(id) {
            removed.push(actor);
        }
    }

    /// Attach the level's actors, run their `on_load` concurrently, spawn
    /// them in order, bind the game mode's controller, and apply gravity.
    ///
    /// A failing `on_load` aborts the load and removes every actor of the
    /// level from the tree. A failing spawn removes that actor and the ones
    /// after it; actors spawned before it stay.
    pub async fn load_level_object(&mut self, level: Level) -> Result<(), EngineError> {
        if self.state == EngineState::ShutDown {
            return Err(EngineError::ShutDown);
        }
        if self.physics.is_none() {
            return Err(EngineError::NoPhysicsWorld);
        }
        level.validate()?;
        let (game_mode, gravity, actors) = level.into_parts();
        tracing::debug!(actors = actors.len(), game_mode = ?game_mode, "loading level");

        let root = self.scene.root();
        let mut ids = Vec::with_capacity(actors.len());
        for actor in actors {
            ids.push(self.scene.insert_under(actor, root)?);
        }

        let wanted: HashSet<ActorId> = ids.iter().copied().collect();
        let loads: Vec<_> = self
            .scene
            .actors_mut()
            .filter(|(id, _)| wanted.contains(id))
            .map(|(_, actor)| actor.on_load())
            .collect();
        let loaded: Result<(), LoadError> = join_all(loads).await.into_iter().collect();
        if let Err(err) = loaded {
            self.discard_level_actors(&ids);
            return Err(err.into());
        }

        for (i, id) in ids.iter().enumerate() {
            if let Err(err) = self.spawn_attached(*id) {
                self.discard_level_actors(&ids[i..]);
                return Err(err);
            }
        }
        self.apply_game_mode(game_mode);
        if let Some(physics) = self.physics.as_mut() {
            physics.set_gravity(gravity);
        }
        tracing::info!(actors = ids.len(), "level loaded");
        Ok(())
    }

    fn discard_level_actors(&mut self, ids: &[ActorId]) {
        let mut discarded = Vec::new();
        for id in ids {
            self.remove_subtree(*id, &mut discarded);
        }
        tracing::warn!(discarded = discarded.len(), "level load aborted");
    }

    /// Read a JSON level file, build it through the service locator, and
    /// load it.
    pub async fn load_level(&mut self, path: impl AsRef<Path>) -> Result<(), EngineError> {
        let descriptor = LevelDescriptor::from_path(path)?;
        let level = descriptor.build(&self.services)?;
        self.load_level_object(level).await
    }

    fn apply_game_mode(&mut self, name: Option<String>) {
        let Some(name) = name else {
            return;
        };
        match self.services.create_game_mode(&name) {
            Some(mode) => {
                let controller = mode.controller_type().map(str::to_string);
                tracing::debug!(game_mode = mode.name(), controller = ?controller, "game mode bound");
                self.game_mode = Some(mode);
                self.set_controller_type(controller);
            }
            None => {
                tracing::warn!(game_mode = %name, "game mode not registered; controllers left unbound");
            }
        }
    }
}

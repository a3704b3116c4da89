use glam::Vec2;
use stagecraft_common::ActorId;

use crate::actor::{Actor, SceneRoot};
use crate::node::{NodeArena, TreeError};

/// The actor tree.
///
/// Actors live in an arena keyed by [`ActorId`]; the root is a
/// [`SceneRoot`] created with the scene. An actor that is in the arena but
/// not under the root is detached: addressable by id, invisible to
/// [`Scene::flatten`].
///
/// # Invariants
/// - World position is the sum of local positions along the parent chain.
///   Rotation is local only and does not compose across levels.
pub struct Scene {
    nodes: NodeArena<Box<dyn Actor>>,
    root: ActorId,
}

impl Scene {
    pub fn new() -> Self {
        let root: Box<dyn Actor> = Box::new(SceneRoot::new());
        let root_id = root.id();
        let mut nodes = NodeArena::new();
        // A fresh arena cannot already contain the root id.
        let _ = nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
        }
    }

    pub fn root(&self) -> ActorId {
        self.root
    }

    /// Number of actors in the arena, including the root and detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.nodes.contains(id)
    }

    pub fn get(&self, id: ActorId) -> Option<&(dyn Actor + 'static)> {
        self.nodes.get(id).map(|a| a.as_ref())
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut (dyn Actor + 'static)> {
        self.nodes.get_mut(id).map(|a| a.as_mut())
    }

    pub fn get_as<T: Actor>(&self, id: ActorId) -> Option<&T> {
        self.get(id).and_then(|a| a.downcast_ref::<T>())
    }

    pub fn get_as_mut<T: Actor>(&mut self, id: ActorId) -> Option<&mut T> {
        self.get_mut(id).and_then(|a| a.downcast_mut::<T>())
    }

    pub fn parent(&self, id: ActorId) -> Option<ActorId> {
        self.nodes.parent(id)
    }

    pub fn children(&self, id: ActorId) -> &[ActorId] {
        self.nodes.children(id)
    }

    /// Insert an actor under `parent` together with any children queued on
    /// it, recursively. Returns the actor's id.
    ///
    /// On error nothing of the subtree is left in the arena.
    pub fn insert_under(
        &mut self,
        mut actor: Box<dyn Actor>,
        parent: ActorId,
    ) -> Result<ActorId, TreeError> {
        if !self.nodes.contains(parent) {
            return Err(TreeError::NotFound(parent));
        }
        let id = actor.id();
        let pending = actor.base_mut().take_pending_children();
        self.nodes.insert(id, actor)?;
        if let Err(err) = self.nodes.attach(id, parent) {
            self.nodes.remove(id);
            return Err(err);
        }
        tracing::trace!(actor = %id, %parent, "inserted");
        for child in pending {
            if let Err(err) = self.insert_under(child, id) {
                self.drop_subtree(id);
                return Err(err);
            }
        }
        Ok(id)
    }

    fn drop_subtree(&mut self, id: ActorId) {
        for child in self.nodes.descendants(id).into_iter().rev() {
            self.nodes.remove(child);
        }
        self.nodes.remove(id);
    }

    pub fn attach(&mut self, child: ActorId, parent: ActorId) -> Result<(), TreeError> {
        self.nodes.attach(child, parent)
    }

    pub fn detach(&mut self, id: ActorId) -> bool {
        self.nodes.detach(id)
    }

    /// Take an actor out of the arena entirely.
    pub fn remove(&mut self, id: ActorId) -> Option<Box<dyn Actor>> {
        if id == self.root {
            return None;
        }
        self.nodes.remove(id)
    }

    /// Pre-order snapshot of every actor reachable from the root, root
    /// excluded. Callers iterate the snapshot, so the tree may change
    /// underneath without invalidating the iteration.
    pub fn flatten(&self) -> Vec<ActorId> {
        self.nodes.descendants(self.root)
    }

    /// Pre-order snapshot of the subtree under `id`, `id` excluded.
    pub fn flatten_from(&self, id: ActorId) -> Vec<ActorId> {
        self.nodes.descendants(id)
    }

    pub fn is_reachable(&self, id: ActorId) -> bool {
        id == self.root || self.nodes.is_ancestor(self.root, id)
    }

    pub fn is_descendant_of(&self, id: ActorId, ancestor: ActorId) -> bool {
        self.nodes.is_ancestor(ancestor, id)
    }

    /// Depth below the root (direct children of the root are depth 0).
    pub fn depth(&self, id: ActorId) -> usize {
        let mut depth = 0;
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if p == self.root {
                break;
            }
            depth += 1;
            cur = self.parent(p);
        }
        depth
    }

    /// Translation-only composition up the parent chain.
    pub fn world_position(&self, id: ActorId) -> Vec2 {
        let mut pos = Vec2::ZERO;
        let mut cur = Some(id);
        while let Some(c) = cur {
            if let Some(actor) = self.get(c) {
                pos += actor.base().transform.position();
            }
            cur = self.parent(c);
        }
        pos
    }

    /// Set the local position so that the world position becomes `world`.
    pub fn set_world_position(&mut self, id: ActorId, world: Vec2) {
        let parent_world = self
            .parent(id)
            .map(|p| self.world_position(p))
            .unwrap_or(Vec2::ZERO);
        if let Some(actor) = self.get_mut(id) {
            actor.base_mut().transform.set_position(world - parent_world);
        }
    }

    /// Set world position and local rotation together. Physics backends use
    /// this when writing simulated results.
    pub fn sync_world_transform(&mut self, id: ActorId, world: Vec2, rotation: f32) {
        let parent_world = self
            .parent(id)
            .map(|p| self.world_position(p))
            .unwrap_or(Vec2::ZERO);
        if let Some(actor) = self.get_mut(id) {
            let transform = &mut actor.base_mut().transform;
            transform.set_position(world - parent_world);
            transform.set_rotation(rotation);
        }
    }

    /// Direct children of `id` that are of concrete type `T`.
    pub fn children_of<T: Actor>(&self, id: ActorId) -> Vec<&T> {
        self.children(id)
            .iter()
            .filter_map(|c| self.get_as::<T>(*c))
            .collect()
    }

    /// First reachable actor of concrete type `T`, in pre-order.
    pub fn find_first<T: Actor>(&self) -> Option<&T> {
        self.flatten().into_iter().find_map(|id| self.get_as::<T>(id))
    }

    /// Every actor in the arena, attached or not.
    pub fn actors_mut(&mut self) -> impl Iterator<Item = (ActorId, &mut Box<dyn Actor>)> {
        self.nodes.iter_mut()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

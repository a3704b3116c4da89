use std::collections::BTreeMap;
use stagecraft_common::ActorId;

/// Errors from structural tree operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} cannot be its own child")]
    SelfChild(ActorId),
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { child: ActorId, parent: ActorId },
    #[error("node {0} not found")]
    NotFound(ActorId),
    #[error("node {0} is already in the tree")]
    AlreadyPresent(ActorId),
}

/// A node in the arena: an owned value plus index-style links.
///
/// The parent link is a plain id, never an owning edge. Ownership of the
/// value sits with the arena; the tree shape is only the links.
#[derive(Debug)]
pub struct Node<T> {
    value: T,
    parent: Option<ActorId>,
    children: Vec<ActorId>,
}

impl<T> Node<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn parent(&self) -> Option<ActorId> {
        self.parent
    }

    pub fn children(&self) -> &[ActorId] {
        &self.children
    }
}

/// Arena of nodes keyed by id with parent/child links.
///
/// # Invariants
/// - A node is never its own child, nor a child of any of its descendants.
/// - A node appears under at most one parent; re-attaching moves it.
/// - A detached node stays in the arena until removed, so external holders
///   of its id can still reach it, but it is unreachable from any root.
#[derive(Debug)]
pub struct NodeArena<T> {
    nodes: BTreeMap<ActorId, Node<T>>,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
        }
    }
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Insert a detached node.
    pub fn insert(&mut self, id: ActorId, value: T) -> Result<(), TreeError> {
        if self.nodes.contains_key(&id) {
            return Err(TreeError::AlreadyPresent(id));
        }
        self.nodes.insert(
            id,
            Node {
                value,
                parent: None,
                children: Vec::new(),
            },
        );
        Ok(())
    }

    /// Remove a node from the arena, detaching it from its parent first.
    /// Any remaining children are orphaned (their parent link is cleared).
    pub fn remove(&mut self, id: ActorId) -> Option<T> {
        self.detach(id);
        let node = self.nodes.remove(&id)?;
        for child in &node.children {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = None;
            }
        }
        Some(node.value)
    }

    pub fn node(&self, id: ActorId) -> Option<&Node<T>> {
        self.nodes.get(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<&T> {
        self.nodes.get(&id).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut T> {
        self.nodes.get_mut(&id).map(|n| &mut n.value)
    }

    pub fn parent(&self, id: ActorId) -> Option<ActorId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ActorId) -> &[ActorId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over every value, attached or not.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ActorId, &mut T)> {
        self.nodes.iter_mut().map(|(id, n)| (*id, &mut n.value))
    }

    /// True if `ancestor` appears on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: ActorId, id: ActorId) -> bool {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.parent(p);
        }
        false
    }

    /// Attach `child` as the last child of `parent`, removing any prior link.
    pub fn attach(&mut self, child: ActorId, parent: ActorId) -> Result<(), TreeError> {
        if child == parent {
            return Err(TreeError::SelfChild(child));
        }
        if !self.nodes.contains_key(&child) {
            return Err(TreeError::NotFound(child));
        }
        if !self.nodes.contains_key(&parent) {
            return Err(TreeError::NotFound(parent));
        }
        if self.is_ancestor(child, parent) {
            return Err(TreeError::Cycle { child, parent });
        }
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    /// Unlink `child` from its parent. Returns false if it had none.
    pub fn detach(&mut self, child: ActorId) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = None;
        }
        true
    }

    /// Pre-order list of all descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: ActorId) -> Vec<ActorId> {
        let mut out = Vec::new();
        let mut stack: Vec<ActorId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }
}

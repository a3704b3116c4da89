use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use stagecraft_common::ActorId;
use stagecraft_kernel::Scene;

/// Which per-tick branch the engine runs. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    SinglePlayer,
    Client,
    Server,
}

impl FromStr for NetworkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "singleplayer" | "single" => Ok(Self::SinglePlayer),
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            other => Err(format!("unknown network mode {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatedActor {
    pub id: ActorId,
    pub type_tag: String,
    pub position: Vec2,
    pub rotation: f32,
    pub layer: i32,
}

/// World-space state of every replicated actor at one network tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationFrame {
    pub sequence: u64,
    pub actors: Vec<ReplicatedActor>,
}

impl ReplicationFrame {
    /// Spawned actors reachable from the root with `should_replicate` set,
    /// in tree order.
    pub fn capture(sequence: u64, scene: &Scene) -> Self {
        let actors = scene
            .flatten()
            .into_iter()
            .filter_map(|id| {
                let actor = scene.get(id)?;
                let base = actor.base();
                (base.should_replicate && base.is_spawned()).then(|| ReplicatedActor {
                    id,
                    type_tag: actor.type_tag().to_string(),
                    position: scene.world_position(id),
                    rotation: base.transform.rotation(),
                    layer: base.layer,
                })
            })
            .collect();
        Self { sequence, actors }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub type MessageHandler = Box<dyn FnMut(&str)>;
pub type ConnectionHandler = Box<dyn FnMut()>;

/// Transport the engine replicates through. Reconnection and retries are
/// the endpoint's concern.
pub trait Endpoint {
    /// Open the endpoint. `on_connection` runs once per peer that connects.
    fn connect(&mut self, on_connection: ConnectionHandler);
    fn is_connected(&self) -> bool;
    /// Register a handler for inbound messages of type `kind`.
    fn on_message(&mut self, kind: &str, handler: MessageHandler);
    fn broadcast(&mut self, frame: &ReplicationFrame);
    fn disconnect(&mut self);
}

/// In-process endpoint that keeps broadcast frames in a shared log and
/// lets the host inject inbound messages.
///
/// Its single peer is the host itself, which connects as soon as the
/// endpoint opens.
#[derive(Default)]
pub struct LoopbackEndpoint {
    connected: bool,
    sent: Rc<RefCell<Vec<ReplicationFrame>>>,
    handlers: HashMap<String, Vec<MessageHandler>>,
}

impl LoopbackEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of every frame broadcast so far.
    pub fn sent(&self) -> Rc<RefCell<Vec<ReplicationFrame>>> {
        Rc::clone(&self.sent)
    }

    /// Deliver an inbound message to the handlers registered for `kind`.
    /// Returns how many handlers saw it. Dropped while disconnected.
    pub fn deliver(&mut self, kind: &str, message: &str) -> usize {
        if !self.connected {
            return 0;
        }
        let Some(handlers) = self.handlers.get_mut(kind) else {
            tracing::trace!(kind, "no handler for message");
            return 0;
        };
        for handler in handlers.iter_mut() {
            handler(message);
        }
        handlers.len()
    }
}

impl Endpoint for LoopbackEndpoint {
    fn connect(&mut self, mut on_connection: ConnectionHandler) {
        self.connected = true;
        tracing::debug!("loopback endpoint connected");
        on_connection();
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn on_message(&mut self, kind: &str, handler: MessageHandler) {
        self.handlers.entry(kind.to_string()).or_default().push(handler);
    }

    fn broadcast(&mut self, frame: &ReplicationFrame) {
        if self.connected {
            self.sent.borrow_mut().push(frame.clone());
        }
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

use stagecraft_common::{ActorId, PlayerId};
use stagecraft_input::InputState;
use stagecraft_kernel::Scene;

/// What a controller sees during its tick.
pub struct ControllerContext<'a> {
    pub player: PlayerId,
    /// The actor the player currently possesses.
    pub pawn: Option<ActorId>,
    pub scene: &'a mut Scene,
    pub input: &'a InputState,
    pub dt: f32,
}

/// Drives a player's pawn from input.
pub trait Controller {
    fn activate(&mut self, _player: PlayerId) {}

    fn deactivate(&mut self, _player: PlayerId) {}

    fn tick(&mut self, _ctx: &mut ControllerContext<'_>) {}
}

/// Rules for a level. The engine only asks it which controller type to bind
/// to players.
pub trait GameMode {
    fn name(&self) -> &str;

    /// Service locator key of the controller bound to every player.
    fn controller_type(&self) -> Option<&str> {
        None
    }
}

/// One connected player and its bindings.
pub struct PlayerState {
    id: PlayerId,
    pawn: Option<ActorId>,
    controller: Option<Box<dyn Controller>>,
}

impl PlayerState {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            pawn: None,
            controller: None,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn pawn(&self) -> Option<ActorId> {
        self.pawn
    }

    pub(crate) fn set_pawn(&mut self, pawn: Option<ActorId>) {
        self.pawn = pawn;
    }

    pub fn has_controller(&self) -> bool {
        self.controller.is_some()
    }

    /// Replace the controller, deactivating the old one and activating the
    /// new one.
    pub(crate) fn bind_controller(&mut self, controller: Option<Box<dyn Controller>>) {
        if let Some(mut old) = self.controller.take() {
            old.deactivate(self.id);
        }
        self.controller = controller;
        if let Some(c) = self.controller.as_mut() {
            c.activate(self.id);
        }
    }

    pub(crate) fn tick(&mut self, scene: &mut Scene, input: &InputState, dt: f32) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let mut ctx = ControllerContext {
            player: self.id,
            pawn: self.pawn,
            scene,
            input,
            dt,
        };
        controller.tick(&mut ctx);
    }
}

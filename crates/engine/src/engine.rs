use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use stagecraft_common::{ActorId, PlayerId};
use stagecraft_input::InputManager;
use stagecraft_kernel::{Actor, ActorBase, Scene, TickGroup};
use stagecraft_physics::PhysicsWorld;
use stagecraft_render::{Camera, OffscreenTarget, RendererRegistry};

use crate::clock::{FrameClock, FrameTimer};
use crate::config::EngineConfig;
use crate::controller::{GameMode, PlayerState};
use crate::error::EngineError;
use crate::frame::{AfterRender, CallbackId};
use crate::network::{Endpoint, MessageHandler, NetworkMode, ReplicationFrame};
use crate::registry::ServiceLocator;
use crate::timer::{TimerId, TimerManager};

/// Physics advances by exactly this much once per engine tick, whatever the
/// frame delta.
pub const PHYSICS_FIXED_DELTA: f32 = 1.0 / 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Constructed,
    Running { editor: bool },
    ShutDown,
}

/// Parent of the actors an editor session owns. Only this subtree ticks
/// while running as editor.
struct EditorRoot {
    base: ActorBase,
}

impl Actor for EditorRoot {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn type_tag(&self) -> &'static str {
        "EditorRoot"
    }
}

/// The frame orchestrator.
///
/// Owns the actor tree, the camera, the physics world, players and their
/// controllers, and drives the tick / render / finish-frame contract:
///
/// - `tick` runs timers, controllers, the default tick group, exactly one
///   fixed physics step, the post-physics group, then the network branch.
/// - Gameplay despawns are deferred to the sweep at the end of `tick`.
/// - `render` and `finish_frame` pair up once per frame and never
///   interleave with `tick`.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) state: EngineState,
    pub(crate) scene: Scene,
    editor_root: Option<ActorId>,
    pub(crate) camera: Option<Camera>,
    pub(crate) physics: Option<Box<dyn PhysicsWorld>>,
    pub(crate) renderers: RendererRegistry,
    pub(crate) services: ServiceLocator,
    input: InputManager,
    pub(crate) players: BTreeMap<PlayerId, PlayerState>,
    next_player: u32,
    controller_type: Option<String>,
    pub(crate) game_mode: Option<Box<dyn GameMode>>,
    timers: TimerManager,
    network_timer: Option<TimerId>,
    replication_due: Rc<Cell<bool>>,
    connected_peers: Rc<Cell<u32>>,
    endpoint: Option<Box<dyn Endpoint>>,
    replication_sequence: u64,
    last_replication: Option<ReplicationFrame>,
    clock: FrameClock,
    pub(crate) frame_timer: FrameTimer,
    pub(crate) frame_in_flight: bool,
    pub(crate) offscreen: OffscreenTarget,
    pub(crate) after_render: Vec<(CallbackId, AfterRender)>,
    pub(crate) next_callback: u64,
    ticks: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let camera = config.camera.as_ref().map(|c| c.build());
        Self {
            config,
            state: EngineState::Constructed,
            scene: Scene::new(),
            editor_root: None,
            camera,
            physics: None,
            renderers: RendererRegistry::new(),
            services: ServiceLocator::new(),
            input: InputManager::default(),
            players: BTreeMap::new(),
            next_player: 0,
            controller_type: None,
            game_mode: None,
            timers: TimerManager::new(),
            network_timer: None,
            replication_due: Rc::new(Cell::new(false)),
            connected_peers: Rc::new(Cell::new(0)),
            endpoint: None,
            replication_sequence: 0,
            last_replication: None,
            clock: FrameClock::new(),
            frame_timer: FrameTimer::new(),
            frame_in_flight: false,
            offscreen: OffscreenTarget::new(),
            after_render: Vec::new(),
            next_callback: 0,
            ticks: 0,
        }
    }

    pub fn with_physics(mut self, physics: Box<dyn PhysicsWorld>) -> Self {
        self.physics = Some(physics);
        self
    }

    pub fn with_services(mut self, services: ServiceLocator) -> Self {
        self.services = services;
        self
    }

    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Box<dyn Endpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, EngineState::Running { .. })
    }

    pub fn network_mode(&self) -> NetworkMode {
        self.config.network_mode
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    pub fn set_camera(&mut self, camera: Option<Camera>) {
        self.camera = camera;
    }

    pub fn physics(&self) -> Option<&dyn PhysicsWorld> {
        self.physics.as_deref()
    }

    pub fn physics_mut(&mut self) -> Option<&mut (dyn PhysicsWorld + 'static)> {
        self.physics.as_deref_mut()
    }

    pub fn set_physics_world(&mut self, physics: Box<dyn PhysicsWorld>) {
        self.physics = Some(physics);
    }

    pub fn services(&self) -> &ServiceLocator {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut ServiceLocator {
        &mut self.services
    }

    pub fn renderers_mut(&mut self) -> &mut RendererRegistry {
        &mut self.renderers
    }

    pub fn input(&self) -> &InputManager {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputManager {
        &mut self.input
    }

    /// Gameplay timers advanced at the start of every non-editor tick.
    pub fn timers_mut(&mut self) -> &mut TimerManager {
        &mut self.timers
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug_physics = debug;
    }

    pub fn game_mode(&self) -> Option<&dyn GameMode> {
        self.game_mode.as_deref()
    }

    pub fn editor_root(&self) -> Option<ActorId> {
        self.editor_root
    }

    /// Peers the endpoint has reported since `run`.
    pub fn connected_peers(&self) -> u32 {
        self.connected_peers.get()
    }

    /// Route inbound endpoint messages of type `kind` to `handler`. Returns
    /// false when the engine has no endpoint.
    pub fn on_network_message(&mut self, kind: &str, handler: MessageHandler) -> bool {
        match self.endpoint.as_mut() {
            Some(endpoint) => {
                endpoint.on_message(kind, handler);
                true
            }
            None => false,
        }
    }

    pub fn last_replication(&self) -> Option<&ReplicationFrame> {
        self.last_replication.as_ref()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Enter the running state.
    ///
    /// Attaches input (disposing any previous attachment), binds
    /// controllers to players, and in server mode outside the editor
    /// connects the endpoint and starts the replication timer.
    pub fn run(&mut self, as_editor: bool) -> Result<(), EngineError> {
        if self.state == EngineState::ShutDown {
            return Err(EngineError::ShutDown);
        }
        self.input.attach();
        self.bind_unbound_players();
        if as_editor && self.editor_root.is_none() {
            let mut base = ActorBase::new();
            base.should_tick = false;
            base.set_spawned(true);
            let root = self.scene.root();
            self.editor_root = Some(self.scene.insert_under(Box::new(EditorRoot { base }), root)?);
        }
        if !as_editor
            && self.config.network_mode == NetworkMode::Server
            && self.network_timer.is_none()
        {
            match self.endpoint.as_mut() {
                Some(endpoint) => {
                    let peers = Rc::clone(&self.connected_peers);
                    endpoint.connect(Box::new(move || {
                        peers.set(peers.get() + 1);
                        tracing::info!(peers = peers.get(), "peer connected");
                    }));
                }
                None => tracing::warn!("server mode without an endpoint; frames are kept locally"),
            }
            let due = Rc::clone(&self.replication_due);
            let interval = 1.0 / self.config.network_tick_hz;
            self.network_timer = Some(self.timers.add(interval, true, move || due.set(true)));
        }
        self.clock.reset();
        self.state = EngineState::Running { editor: as_editor };
        tracing::info!(editor = as_editor, mode = ?self.config.network_mode, "engine running");
        Ok(())
    }

    /// Enter the terminal state: input disposed, endpoint disconnected,
    /// timers and after-render callbacks dropped, controllers unbound.
    pub fn shutdown(&mut self) {
        if self.state == EngineState::ShutDown {
            return;
        }
        self.input.dispose();
        self.network_timer = None;
        self.timers.clear();
        if let Some(endpoint) = self.endpoint.as_mut() {
            endpoint.disconnect();
        }
        for player in self.players.values_mut() {
            player.bind_controller(None);
        }
        self.after_render.clear();
        self.frame_in_flight = false;
        self.state = EngineState::ShutDown;
        tracing::info!(ticks = self.ticks, "engine shut down");
    }

    pub(crate) fn ensure_running(&self) -> Result<bool, EngineError> {
        match self.state {
            EngineState::Constructed => Err(EngineError::NotRunning),
            EngineState::ShutDown => Err(EngineError::ShutDown),
            EngineState::Running { editor } => Ok(editor),
        }
    }

    /// Advance one step using wall-clock time. Returns the delta used.
    pub fn tick(&mut self) -> Result<f32, EngineError> {
        self.ensure_running()?;
        let dt = self.clock.advance();
        self.tick_with_delta(dt)?;
        Ok(dt)
    }

    /// Advance one step with an explicit frame delta.
    ///
    /// Actors marked for despawn still tick in the frame they were marked
    /// and leave the tree in the sweep that closes the tick. In the editor
    /// only the editor subtree is ticked and swept.
    pub fn tick_with_delta(&mut self, dt: f32) -> Result<(), EngineError> {
        let editor = self.ensure_running()?;
        if self.frame_in_flight {
            return Err(EngineError::FrameInFlight);
        }
        let _span = tracing::trace_span!("tick", n = self.ticks).entered();
        self.ticks += 1;

        if editor {
            self.tick_editor(dt);
            return Ok(());
        }
        self.timers.tick(dt);
        self.tick_players(dt);
        self.tick_actors_and_world(dt)?;
        match self.config.network_mode {
            NetworkMode::Server => self.server_tick(),
            NetworkMode::Client => self.client_tick(),
            NetworkMode::SinglePlayer => self.single_player_tick(),
        }
        Ok(())
    }

    /// Default group, one fixed physics step, post-physics group. The tree
    /// is flattened once so both groups see the same actor list.
    pub fn tick_actors_and_world(&mut self, dt: f32) -> Result<(), EngineError> {
        if self.physics.is_none() {
            return Err(EngineError::NoPhysicsWorld);
        }
        let order = self.scene.flatten();
        self.tick_group(&order, TickGroup::Default, dt);
        if let Some(physics) = self.physics.as_mut() {
            physics.step(PHYSICS_FIXED_DELTA, &mut self.scene)?;
        }
        self.tick_group(&order, TickGroup::PostPhysics, dt);
        if let Some(physics) = self.physics.as_mut() {
            physics.sync_transforms(&self.scene);
        }
        Ok(())
    }

    fn tick_group(&mut self, order: &[ActorId], group: TickGroup, dt: f32) {
        for id in order {
            let Some(actor) = self.scene.get_mut(*id) else {
                continue;
            };
            let base = actor.base();
            if !base.should_tick || base.tick_group != group || !base.is_spawned() {
                continue;
            }
            actor.tick(dt);
            actor.base_mut().tick_components(dt);
        }
    }

    fn tick_editor(&mut self, dt: f32) {
        let Some(root) = self.editor_root else {
            return;
        };
        let order = self.scene.flatten_from(root);
        self.tick_group(&order, TickGroup::Default, dt);
        self.tick_group(&order, TickGroup::PostPhysics, dt);
        self.sweep_despawns_in(&order);
    }

    fn tick_players(&mut self, dt: f32) {
        let input = self.input.poll();
        for player in self.players.values_mut() {
            player.tick(&mut self.scene, input, dt);
        }
    }

    fn server_tick(&mut self) {
        self.sweep_despawns();
        if !self.replication_due.replace(false) {
            return;
        }
        self.replication_sequence += 1;
        let frame = ReplicationFrame::capture(self.replication_sequence, &self.scene);
        if let Some(endpoint) = self.endpoint.as_mut() {
            endpoint.broadcast(&frame);
        }
        tracing::trace!(sequence = frame.sequence, actors = frame.actors.len(), "replicated");
        self.last_replication = Some(frame);
    }

    fn client_tick(&mut self) {
        self.sweep_despawns();
    }

    fn single_player_tick(&mut self) {
        self.client_tick();
    }

    /// Despawn every reachable actor marked for despawn. Returns how many
    /// actors left the tree, children included.
    pub(crate) fn sweep_despawns(&mut self) -> usize {
        let order = self.scene.flatten();
        self.sweep_despawns_in(&order)
    }

    fn sweep_despawns_in(&mut self, order: &[ActorId]) -> usize {
        let marked: Vec<ActorId> = order
            .iter()
            .copied()
            .filter(|id| {
                self.scene
                    .get(*id)
                    .is_some_and(|a| a.base().is_marked_for_despawn())
            })
            .collect();
        let removed: usize = marked.into_iter().map(|id| self.despawn_actor(id).len()).sum();
        if removed > 0 {
            tracing::debug!(removed, "despawn sweep");
        }
        removed
    }

    /// Create a player. The bound controller type, if any, is instantiated
    /// for it immediately.
    pub fn add_player(&mut self) -> PlayerId {
        let id = PlayerId(self.next_player);
        self.next_player += 1;
        let mut player = PlayerState::new(id);
        if let Some(name) = &self.controller_type {
            player.bind_controller(self.services.create_controller(name));
        }
        self.players.insert(id, player);
        tracing::debug!(player = id.0, "player added");
        id
    }

    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        self.unpossess(id);
        match self.players.remove(&id) {
            Some(mut player) => {
                player.bind_controller(None);
                true
            }
            None => false,
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.get(&id)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values()
    }

    pub fn controller_type(&self) -> Option<&str> {
        self.controller_type.as_deref()
    }

    /// Bind a controller type to every current and future player. `None`
    /// unbinds.
    pub fn set_controller_type(&mut self, name: Option<String>) {
        if let Some(n) = &name
            && self.services.create_controller(n).is_none()
        {
            tracing::warn!(controller = %n, "controller type not registered");
        }
        self.controller_type = name;
        for player in self.players.values_mut() {
            let controller = self
                .controller_type
                .as_deref()
                .and_then(|n| self.services.create_controller(n));
            player.bind_controller(controller);
        }
    }

    fn bind_unbound_players(&mut self) {
        let Some(name) = self.controller_type.as_deref() else {
            return;
        };
        for player in self.players.values_mut() {
            if !player.has_controller() {
                player.bind_controller(self.services.create_controller(name));
            }
        }
    }

    /// Give `player` exclusive control of `actor`. Any previous holder of
    /// the actor and any previous pawn of the player are released.
    pub fn possess(&mut self, player: PlayerId, actor: ActorId) -> Result<(), EngineError> {
        if !self.players.contains_key(&player) {
            return Err(EngineError::UnknownPlayer(player));
        }
        let holder = self
            .scene
            .get(actor)
            .ok_or(EngineError::UnknownActor(actor))?
            .base()
            .possessed_by();
        if holder == Some(player) {
            return Ok(());
        }
        if let Some(other) = holder
            && let Some(p) = self.players.get_mut(&other)
        {
            p.set_pawn(None);
        }
        self.unpossess(player);
        if let Some(a) = self.scene.get_mut(actor) {
            a.base_mut().set_possessed_by(Some(player));
        }
        if let Some(p) = self.players.get_mut(&player) {
            p.set_pawn(Some(actor));
        }
        tracing::debug!(player = player.0, %actor, "possessed");
        Ok(())
    }

    /// Release `player`'s pawn. Returns the released actor.
    pub fn unpossess(&mut self, player: PlayerId) -> Option<ActorId> {
        let pawn = self.players.get_mut(&player)?.pawn()?;
        if let Some(p) = self.players.get_mut(&player) {
            p.set_pawn(None);
        }
        if let Some(a) = self.scene.get_mut(pawn) {
            a.base_mut().set_possessed_by(None);
        }
        Some(pawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, ControllerContext};
    use stagecraft_kernel::BasicActor;
    use stagecraft_physics::SimplePhysicsWorld;
    use std::cell::RefCell;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).with_physics(Box::new(SimplePhysicsWorld::new()))
    }

    fn spawn_basic(engine: &mut Engine) -> ActorId {
        engine
            .spawn_actor(Box::new(BasicActor::new()) as Box<dyn Actor>, Default::default())
            .unwrap()
    }

    #[test]
    fn tick_requires_running() {
        let mut e = engine();
        assert!(matches!(e.tick_with_delta(0.1), Err(EngineError::NotRunning)));
        e.run(false).unwrap();
        e.tick_with_delta(0.1).unwrap();
        e.shutdown();
        assert!(matches!(e.tick_with_delta(0.1), Err(EngineError::ShutDown)));
        assert!(matches!(e.run(false), Err(EngineError::ShutDown)));
    }

    #[test]
    fn tick_without_physics_is_an_error() {
        let mut e = Engine::new(EngineConfig::default());
        e.run(false).unwrap();
        assert!(matches!(e.tick_with_delta(0.1), Err(EngineError::NoPhysicsWorld)));
    }

    #[test]
    fn first_tick_has_zero_delta() {
        let mut e = engine();
        e.run(false).unwrap();
        assert_eq!(e.tick().unwrap(), 0.0);
    }

    #[test]
    fn rerun_reattaches_input_once() {
        let mut e = engine();
        e.run(false).unwrap();
        e.run(false).unwrap();
        assert!(e.input().is_attached());
        assert_eq!(e.input().disposals(), 1);
    }

    #[test]
    fn possession_is_exclusive() {
        let mut e = engine();
        let a = spawn_basic(&mut e);
        let b = spawn_basic(&mut e);
        let p1 = e.add_player();
        let p2 = e.add_player();

        e.possess(p1, a).unwrap();
        e.possess(p2, a).unwrap();
        assert_eq!(e.player(p1).unwrap().pawn(), None);
        assert_eq!(e.player(p2).unwrap().pawn(), Some(a));
        assert_eq!(e.scene().get(a).unwrap().base().possessed_by(), Some(p2));

        e.possess(p2, b).unwrap();
        assert_eq!(e.scene().get(a).unwrap().base().possessed_by(), None);
        assert_eq!(e.unpossess(p2), Some(b));
        assert_eq!(e.scene().get(b).unwrap().base().possessed_by(), None);
    }

    #[test]
    fn possess_unknown_targets() {
        let mut e = engine();
        let a = spawn_basic(&mut e);
        assert!(matches!(
            e.possess(PlayerId(9), a),
            Err(EngineError::UnknownPlayer(_))
        ));
        let p = e.add_player();
        assert!(matches!(
            e.possess(p, ActorId::new()),
            Err(EngineError::UnknownActor(_))
        ));
    }

    #[test]
    fn controller_type_binds_current_and_future_players() {
        struct Mover;
        impl Controller for Mover {
            fn tick(&mut self, ctx: &mut ControllerContext<'_>) {
                if let Some(pawn) = ctx.pawn
                    && let Some(actor) = ctx.scene.get_mut(pawn)
                {
                    actor.base_mut().transform.translate(glam::Vec2::X);
                }
            }
        }

        let mut e = engine();
        e.services_mut().register_controller("Mover", || Box::new(Mover));
        let early = e.add_player();
        e.set_controller_type(Some("Mover".into()));
        let late = e.add_player();
        assert!(e.player(early).unwrap().has_controller());
        assert!(e.player(late).unwrap().has_controller());

        let pawn = spawn_basic(&mut e);
        e.possess(late, pawn).unwrap();
        e.run(false).unwrap();
        e.tick_with_delta(0.1).unwrap();
        assert_eq!(
            e.scene().get(pawn).unwrap().base().transform.position(),
            glam::Vec2::X
        );
    }

    struct Counter {
        base: ActorBase,
        ticks: Rc<RefCell<u32>>,
    }

    impl Actor for Counter {
        fn base(&self) -> &ActorBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut ActorBase {
            &mut self.base
        }
        fn tick(&mut self, _dt: f32) {
            *self.ticks.borrow_mut() += 1;
        }
    }

    fn counter(ticks: &Rc<RefCell<u32>>) -> Box<dyn Actor> {
        Box::new(Counter {
            base: ActorBase::new(),
            ticks: Rc::clone(ticks),
        })
    }

    #[test]
    fn actor_marked_by_controller_ticks_once_before_sweep() {
        struct Reaper;
        impl Controller for Reaper {
            fn tick(&mut self, ctx: &mut ControllerContext<'_>) {
                if let Some(pawn) = ctx.pawn
                    && let Some(actor) = ctx.scene.get_mut(pawn)
                {
                    actor.base_mut().mark_for_despawn();
                }
            }
        }

        let mut e = engine();
        e.services_mut().register_controller("Reaper", || Box::new(Reaper));
        e.set_controller_type(Some("Reaper".into()));
        let player = e.add_player();
        let ticks = Rc::new(RefCell::new(0));
        let mut victim = counter(&ticks);
        victim.base_mut().tick_group = TickGroup::PostPhysics;
        let victim = e.spawn_actor(victim, Default::default()).unwrap();
        e.possess(player, victim).unwrap();
        e.run(false).unwrap();

        e.tick_with_delta(0.016).unwrap();
        assert_eq!(*ticks.borrow(), 1);
        assert!(!e.scene().contains(victim));
        assert_eq!(e.player(player).unwrap().pawn(), None);

        e.tick_with_delta(0.016).unwrap();
        assert_eq!(*ticks.borrow(), 1);
    }

    #[test]
    fn editor_tick_sweeps_marked_editor_actors() {
        let mut e = Engine::new(EngineConfig::default());
        e.run(true).unwrap();
        let root = e.editor_root().unwrap();
        let ticks = Rc::new(RefCell::new(0));
        let gizmo = e
            .spawn_actor(counter(&ticks), crate::SpawnOptions::default().under(root))
            .unwrap();
        let game = spawn_basic(&mut e);
        for id in [gizmo, game] {
            e.scene_mut().get_mut(id).unwrap().base_mut().mark_for_despawn();
        }

        e.tick_with_delta(0.1).unwrap();
        assert_eq!(*ticks.borrow(), 1);
        assert!(!e.scene().contains(gizmo));
        assert!(e.scene().contains(root));
        assert!(e.scene().contains(game));
    }

    #[test]
    fn editor_ticks_only_its_subtree() {
        let mut e = Engine::new(EngineConfig::default());
        e.run(true).unwrap();
        let editor_ticks = Rc::new(RefCell::new(0));
        let game_ticks = Rc::new(RefCell::new(0));
        let root = e.editor_root().unwrap();
        e.spawn_actor(
            counter(&editor_ticks),
            crate::SpawnOptions::default().under(root),
        )
        .unwrap();
        e.spawn_actor(counter(&game_ticks), Default::default()).unwrap();

        // No physics world is needed in the editor.
        e.tick_with_delta(0.1).unwrap();
        assert_eq!(*editor_ticks.borrow(), 1);
        assert_eq!(*game_ticks.borrow(), 0);
    }

    #[test]
    fn server_replicates_on_network_timer() {
        let config = EngineConfig {
            network_mode: NetworkMode::Server,
            network_tick_hz: 10.0,
            ..EngineConfig::default()
        };
        let mut e = Engine::new(config).with_physics(Box::new(SimplePhysicsWorld::new()));
        let mut actor = BasicActor::new();
        actor.base_mut().should_replicate = true;
        e.spawn_actor(Box::new(actor) as Box<dyn Actor>, Default::default())
            .unwrap();
        e.run(false).unwrap();

        e.tick_with_delta(0.05).unwrap();
        assert!(e.last_replication().is_none());
        e.tick_with_delta(0.05).unwrap();
        let frame = e.last_replication().unwrap();
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.actors.len(), 1);
    }

    #[test]
    fn server_run_connects_endpoint_and_routes_messages() {
        use crate::network::{ConnectionHandler, LoopbackEndpoint};

        /// Endpoint handle the test keeps after the engine takes ownership.
        struct Shared(Rc<RefCell<LoopbackEndpoint>>);
        impl Endpoint for Shared {
            fn connect(&mut self, on_connection: ConnectionHandler) {
                self.0.borrow_mut().connect(on_connection);
            }
            fn is_connected(&self) -> bool {
                self.0.borrow().is_connected()
            }
            fn on_message(&mut self, kind: &str, handler: MessageHandler) {
                self.0.borrow_mut().on_message(kind, handler);
            }
            fn broadcast(&mut self, frame: &ReplicationFrame) {
                self.0.borrow_mut().broadcast(frame);
            }
            fn disconnect(&mut self) {
                self.0.borrow_mut().disconnect();
            }
        }

        let config = EngineConfig {
            network_mode: NetworkMode::Server,
            ..EngineConfig::default()
        };
        let loopback = Rc::new(RefCell::new(LoopbackEndpoint::new()));
        let mut e = Engine::new(config)
            .with_physics(Box::new(SimplePhysicsWorld::new()))
            .with_endpoint(Box::new(Shared(Rc::clone(&loopback))));
        let inputs = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&inputs);
        assert!(e.on_network_message("input", Box::new(move |m| sink.borrow_mut().push(m.to_string()))));
        assert_eq!(e.connected_peers(), 0);

        e.run(false).unwrap();
        assert_eq!(e.connected_peers(), 1);
        assert!(loopback.borrow().is_connected());
        assert_eq!(loopback.borrow_mut().deliver("input", "left"), 1);
        assert_eq!(loopback.borrow_mut().deliver("chat", "hi"), 0);
        assert_eq!(*inputs.borrow(), vec!["left"]);

        e.shutdown();
        assert!(!loopback.borrow().is_connected());
    }

    #[test]
    fn network_messages_need_an_endpoint() {
        let mut e = engine();
        assert!(!e.on_network_message("input", Box::new(|_| {})));
    }

    #[test]
    fn client_never_replicates() {
        let config = EngineConfig {
            network_mode: NetworkMode::Client,
            ..EngineConfig::default()
        };
        let mut e = Engine::new(config).with_physics(Box::new(SimplePhysicsWorld::new()));
        e.run(false).unwrap();
        for _ in 0..20 {
            e.tick_with_delta(0.1).unwrap();
        }
        assert!(e.last_replication().is_none());
    }
}

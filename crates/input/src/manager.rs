use std::collections::{HashSet, VecDeque};

use glam::Vec2;

use crate::action::{Action, Key, KeyBindings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
}

/// Input as seen by controllers during one tick.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<Key>,
    pressed: Vec<Action>,
    move_axis: Vec2,
}

impl InputState {
    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    /// Actions whose key went down since the previous poll.
    pub fn pressed(&self) -> &[Action] {
        &self.pressed
    }

    pub fn was_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    /// Sum of held `Move` directions, normalized. Zero when opposing keys
    /// cancel out.
    pub fn move_axis(&self) -> Vec2 {
        self.move_axis
    }
}

/// Owns the event queue between the driver and the engine.
///
/// Events pushed while detached are dropped.
#[derive(Debug)]
pub struct InputManager {
    bindings: KeyBindings,
    attached: bool,
    attachments: u32,
    disposals: u32,
    queue: VecDeque<InputEvent>,
    state: InputState,
}

impl InputManager {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            attached: false,
            attachments: 0,
            disposals: 0,
            queue: VecDeque::new(),
            state: InputState::default(),
        }
    }

    /// Start accepting events. An existing attachment is disposed first.
    pub fn attach(&mut self) {
        if self.attached {
            self.dispose();
        }
        self.attached = true;
        self.attachments += 1;
        tracing::debug!(attachments = self.attachments, "input attached");
    }

    /// Stop accepting events and drop queued and held input.
    pub fn dispose(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        self.queue.clear();
        self.state = InputState::default();
        self.disposals += 1;
        tracing::debug!("input disposed");
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attachments(&self) -> u32 {
        self.attachments
    }

    pub fn disposals(&self) -> u32 {
        self.disposals
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    pub fn push(&mut self, event: InputEvent) {
        if !self.attached {
            tracing::trace!(?event, "input event dropped while detached");
            return;
        }
        self.queue.push_back(event);
    }

    /// Fold queued events into the state for this tick.
    pub fn poll(&mut self) -> &InputState {
        self.state.pressed.clear();
        while let Some(event) = self.queue.pop_front() {
            match event {
                InputEvent::KeyDown(key) => {
                    if self.state.held.insert(key)
                        && let Some(action) = self.bindings.action_for(key)
                    {
                        self.state.pressed.push(action);
                    }
                }
                InputEvent::KeyUp(key) => {
                    self.state.held.remove(&key);
                }
            }
        }
        let axis: Vec2 = self
            .state
            .held
            .iter()
            .filter_map(|k| match self.bindings.action_for(*k) {
                Some(Action::Move(dir)) => Some(dir),
                _ => None,
            })
            .sum();
        self.state.move_axis = axis.normalize_or_zero();
        &self.state
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new(KeyBindings::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reattach_disposes_previous() {
        let mut input = InputManager::default();
        input.attach();
        input.attach();
        assert!(input.is_attached());
        assert_eq!(input.attachments(), 2);
        assert_eq!(input.disposals(), 1);
    }

    #[test]
    fn events_ignored_while_detached() {
        let mut input = InputManager::default();
        input.push(InputEvent::KeyDown(Key::Space));
        assert!(input.poll().pressed().is_empty());
    }

    #[test]
    fn key_down_fires_once_while_held() {
        let mut input = InputManager::default();
        input.attach();
        input.push(InputEvent::KeyDown(Key::Space));
        input.push(InputEvent::KeyDown(Key::Space));
        assert_eq!(input.poll().pressed(), &[Action::Jump]);
        assert!(input.state().is_held(Key::Space));
        assert!(input.poll().pressed().is_empty());
        input.push(InputEvent::KeyUp(Key::Space));
        assert!(!input.poll().is_held(Key::Space));
    }

    #[test]
    fn move_axis_normalizes_and_cancels() {
        let mut input = InputManager::default();
        input.attach();
        input.push(InputEvent::KeyDown(Key::Up));
        input.push(InputEvent::KeyDown(Key::Right));
        let axis = input.poll().move_axis();
        assert!((axis.length() - 1.0).abs() < 1e-5);
        assert!(axis.x > 0.0 && axis.y > 0.0);

        input.push(InputEvent::KeyUp(Key::Up));
        input.push(InputEvent::KeyDown(Key::Left));
        assert_eq!(input.poll().move_axis(), Vec2::ZERO);
    }

    #[test]
    fn dispose_clears_held_state() {
        let mut input = InputManager::default();
        input.attach();
        input.push(InputEvent::KeyDown(Key::Char('d')));
        input.poll();
        input.dispose();
        assert!(!input.state().is_held(Key::Char('d')));
        assert!(!input.is_attached());
    }
}

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A physical key as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Space,
    Escape,
    Char(char),
}

/// A high-level action produced from input.
///
/// Controllers consume actions, never raw key events, so keyboard and other
/// drivers share the same gameplay logic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Unit direction contributed while the key is held.
    Move(Vec2),
    Jump,
    Fire,
    /// Multiplicative zoom step.
    Zoom(f32),
    Pause,
}

/// Key to action map. Serialized as a list of pairs since `Key` is not a
/// string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(Key, Action)>", into = "Vec<(Key, Action)>")]
pub struct KeyBindings {
    map: HashMap<Key, Action>,
}

impl From<Vec<(Key, Action)>> for KeyBindings {
    fn from(pairs: Vec<(Key, Action)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }
}

impl From<KeyBindings> for Vec<(Key, Action)> {
    fn from(bindings: KeyBindings) -> Self {
        bindings.map.into_iter().collect()
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrow keys and WASD move, space jumps, escape pauses.
    pub fn standard() -> Self {
        let mut b = Self::new();
        for (keys, dir) in [
            ([Key::Up, Key::Char('w')], Vec2::Y),
            ([Key::Down, Key::Char('s')], Vec2::NEG_Y),
            ([Key::Left, Key::Char('a')], Vec2::NEG_X),
            ([Key::Right, Key::Char('d')], Vec2::X),
        ] {
            for k in keys {
                b.bind(k, Action::Move(dir));
            }
        }
        b.bind(Key::Space, Action::Jump);
        b.bind(Key::Char('f'), Action::Fire);
        b.bind(Key::Char('+'), Action::Zoom(1.25));
        b.bind(Key::Char('-'), Action::Zoom(0.8));
        b.bind(Key::Escape, Action::Pause);
        b
    }

    /// Returns the previous binding for `key`.
    pub fn bind(&mut self, key: Key, action: Action) -> Option<Action> {
        self.map.insert(key, action)
    }

    pub fn unbind(&mut self, key: Key) -> Option<Action> {
        self.map.remove(&key)
    }

    pub fn action_for(&self, key: Key) -> Option<Action> {
        self.map.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

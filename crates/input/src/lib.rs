//! Input: raw key events mapped to shared actions, and the per-frame state
//! controllers read.
//!
//! # Invariants
//! - Gameplay code consumes actions and held state, never raw events.
//! - At most one attachment is live; re-attaching disposes the previous one.

pub mod action;
pub mod manager;

pub use action::{Action, Key, KeyBindings};
pub use manager::{InputEvent, InputManager, InputState};

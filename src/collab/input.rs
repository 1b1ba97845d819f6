//! Input collaborator polled by tick rules.

use std::cell::RefCell;
use std::collections::HashSet;

pub trait Input {
    /// Whether `key` is held down during the current tick.
    fn is_pressed(&self, key: &str) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullInput;

impl Input for NullInput {
    fn is_pressed(&self, _key: &str) -> bool {
        false
    }
}

/// Input whose pressed keys are set by the host, a test or a demo script.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    pressed: RefCell<HashSet<String>>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: &str) {
        self.pressed.borrow_mut().insert(key.to_string());
    }

    pub fn release(&self, key: &str) {
        self.pressed.borrow_mut().remove(key);
    }

    pub fn release_all(&self) {
        self.pressed.borrow_mut().clear();
    }
}

impl Input for ScriptedInput {
    fn is_pressed(&self, key: &str) -> bool {
        self.pressed.borrow().contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release() {
        let input = ScriptedInput::new();
        input.press("f");
        input.press("m");
        assert!(input.is_pressed("f"));

        input.release("f");
        assert!(!input.is_pressed("f"));
        assert!(input.is_pressed("m"));

        input.release_all();
        assert!(!input.is_pressed("m"));
    }
}

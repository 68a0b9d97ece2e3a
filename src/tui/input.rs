// Key press filtering
//
// Terminals differ in whether they report key releases and how fast they
// auto-repeat. Action keys (analyze, clear, copy) must fire once per press;
// movement keys may repeat while held. Text inputs bypass this filter.

use crossterm::event::KeyCode;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Minimum gap between two triggers of a held action key when the terminal
/// never reports the release
const ACTION_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBehavior {
    /// Fires once per press
    Action,
    /// Fires on press, then every `interval` after `delay`
    Repeat { delay: Duration, interval: Duration },
}

impl KeyBehavior {
    /// Cursor and scroll movement
    pub fn movement() -> Self {
        Self::Repeat {
            delay: Duration::from_millis(400),
            interval: Duration::from_millis(40),
        }
    }

    /// Page-sized jumps
    pub fn paging() -> Self {
        Self::Repeat {
            delay: Duration::from_millis(300),
            interval: Duration::from_millis(80),
        }
    }
}

#[derive(Debug, Default)]
struct Held {
    since: Option<Instant>,
    last_fired: Option<Instant>,
}

pub struct InputHandler {
    held: HashMap<KeyCode, Held>,
    behaviors: HashMap<KeyCode, KeyBehavior>,
}

impl InputHandler {
    /// Every key behaves as an action
    pub fn new() -> Self {
        Self {
            held: HashMap::new(),
            behaviors: HashMap::new(),
        }
    }

    pub fn set_behavior(&mut self, keys: &[KeyCode], behavior: KeyBehavior) {
        for key in keys {
            self.behaviors.insert(*key, behavior);
        }
    }

    /// Whether a press of `key` at `now` should act
    pub fn press_at(&mut self, key: KeyCode, now: Instant) -> bool {
        let behavior = self
            .behaviors
            .get(&key)
            .copied()
            .unwrap_or(KeyBehavior::Action);
        let held = self.held.entry(key).or_default();

        let (Some(since), Some(last)) = (held.since, held.last_fired) else {
            held.since = Some(now);
            held.last_fired = Some(now);
            return true;
        };

        let fire = match behavior {
            KeyBehavior::Action => now.duration_since(last) >= ACTION_DEBOUNCE,
            KeyBehavior::Repeat { delay, interval } => {
                now.duration_since(since) >= delay && now.duration_since(last) >= interval
            }
        };
        if fire {
            held.last_fired = Some(now);
        }
        fire
    }

    pub fn press(&mut self, key: KeyCode) -> bool {
        self.press_at(key, Instant::now())
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    /// Forget held keys (focus moved to a text input)
    pub fn reset(&mut self) {
        self.held.clear();
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        let mut handler = Self::new();
        handler.set_behavior(
            &[
                KeyCode::Up,
                KeyCode::Down,
                KeyCode::Left,
                KeyCode::Right,
                KeyCode::Char('j'),
                KeyCode::Char('k'),
                KeyCode::Char('h'),
                KeyCode::Char('l'),
            ],
            KeyBehavior::movement(),
        );
        handler.set_behavior(
            &[KeyCode::PageUp, KeyCode::PageDown],
            KeyBehavior::paging(),
        );
        handler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_fires_once_per_press() {
        let mut input = InputHandler::default();
        let t0 = Instant::now();
        let key = KeyCode::Char('a');

        assert!(input.press_at(key, t0));
        // Auto-repeat from a held key is swallowed
        assert!(!input.press_at(key, t0 + Duration::from_millis(30)));
        assert!(!input.press_at(key, t0 + Duration::from_millis(60)));

        input.release(key);
        assert!(input.press_at(key, t0 + Duration::from_millis(70)));
    }

    #[test]
    fn test_action_debounce_without_release() {
        let mut input = InputHandler::default();
        let t0 = Instant::now();
        let key = KeyCode::Char('y');

        assert!(input.press_at(key, t0));
        assert!(input.press_at(key, t0 + ACTION_DEBOUNCE));
    }

    #[test]
    fn test_movement_repeats_after_delay() {
        let mut input = InputHandler::default();
        let t0 = Instant::now();
        let key = KeyCode::Char('j');

        assert!(input.press_at(key, t0));
        assert!(!input.press_at(key, t0 + Duration::from_millis(100)));
        assert!(input.press_at(key, t0 + Duration::from_millis(410)));
        assert!(!input.press_at(key, t0 + Duration::from_millis(420)));
        assert!(input.press_at(key, t0 + Duration::from_millis(460)));
    }
}

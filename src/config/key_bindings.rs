use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::game::Direction;
use crate::input::InputEvent;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeyBinding {
    pub key: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl KeyBinding {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            modifiers: Vec::new(),
        }
    }

    pub fn with_modifier(mut self, modifier: &str) -> Self {
        self.modifiers.push(modifier.to_string());
        self
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        let key_matches = match event.code {
            KeyCode::Char(c) => self.key.eq_ignore_ascii_case(&c.to_string()),
            KeyCode::Enter => self.key == "enter",
            KeyCode::Esc => self.key == "esc",
            KeyCode::Left => self.key == "left",
            KeyCode::Right => self.key == "right",
            KeyCode::Up => self.key == "up",
            KeyCode::Down => self.key == "down",
            KeyCode::F(n) => self.key == format!("f{}", n),
            _ => false,
        };

        // Check modifiers
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let alt = event.modifiers.contains(KeyModifiers::ALT);
        // Shift is part of the character itself ('+', 'W')
        let shift = event.modifiers.contains(KeyModifiers::SHIFT)
            && !matches!(event.code, KeyCode::Char(_));

        let modifiers_match = if self.modifiers.is_empty() {
            !ctrl && !alt && !shift
        } else {
            self.modifiers.iter().all(|m| match m.as_str() {
                "ctrl" => ctrl,
                "alt" => alt,
                "shift" => shift,
                _ => false,
            })
        };

        key_matches && modifiers_match
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    // Maps from action name to the keys that trigger it
    #[serde(default)]
    pub game: HashMap<String, Vec<KeyBinding>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut game = HashMap::new();
        game.insert(
            "up".to_string(),
            vec![KeyBinding::new("up"), KeyBinding::new("w")],
        );
        game.insert(
            "down".to_string(),
            vec![KeyBinding::new("down"), KeyBinding::new("s")],
        );
        game.insert(
            "left".to_string(),
            vec![KeyBinding::new("left"), KeyBinding::new("a")],
        );
        game.insert(
            "right".to_string(),
            vec![KeyBinding::new("right"), KeyBinding::new("d")],
        );
        game.insert(
            "speed_up".to_string(),
            vec![KeyBinding::new("+"), KeyBinding::new("=")],
        );
        game.insert("speed_down".to_string(), vec![KeyBinding::new("-")]);
        // Raw mode swallows SIGINT, so Ctrl+C has to be bound explicitly
        game.insert(
            "quit".to_string(),
            vec![
                KeyBinding::new("esc"),
                KeyBinding::new("c").with_modifier("ctrl"),
            ],
        );

        Self { game }
    }
}

// Checked in this order, so a key bound to several actions always picks the first
const ACTIONS: [&str; 7] = ["quit", "up", "down", "left", "right", "speed_up", "speed_down"];

impl KeyBindings {
    /// Finds the game input bound to a key press, if any.
    pub fn resolve(&self, event: &KeyEvent) -> Option<InputEvent> {
        ACTIONS
            .iter()
            .find(|action| {
                self.game
                    .get(**action)
                    .map_or(false, |bindings| bindings.iter().any(|b| b.matches(event)))
            })
            .and_then(|action| action_event(action))
    }
}

fn action_event(action: &str) -> Option<InputEvent> {
    match action {
        "up" => Some(InputEvent::Turn(Direction::Up)),
        "down" => Some(InputEvent::Turn(Direction::Down)),
        "left" => Some(InputEvent::Turn(Direction::Left)),
        "right" => Some(InputEvent::Turn(Direction::Right)),
        "speed_up" => Some(InputEvent::SpeedUp),
        "speed_down" => Some(InputEvent::SpeedDown),
        "quit" => Some(InputEvent::Quit),
        _ => None,
    }
}

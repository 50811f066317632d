use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::config::KeyBindings;
use crate::game::Direction;

/// A directional or control input from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Turn(Direction),
    SpeedUp,
    SpeedDown,
    Quit,
}

/// Where the game loop gets player input from. `poll` never blocks.
pub trait InputSource {
    fn poll(&mut self) -> Result<Option<InputEvent>>;
}

// Key presses only; crossterm also reports releases and repeats on some platforms
fn accept(key: &KeyEvent) -> bool {
    key.kind != KeyEventKind::Release
}

/// Checks the terminal event queue once per call and reads at most one event.
pub struct KeyboardInput {
    bindings: KeyBindings,
}

impl KeyboardInput {
    pub fn new(bindings: KeyBindings) -> Self {
        Self { bindings }
    }
}

impl InputSource for KeyboardInput {
    fn poll(&mut self) -> Result<Option<InputEvent>> {
        if !event::poll(Duration::ZERO).context("Failed to poll terminal events")? {
            return Ok(None);
        }

        match event::read().context("Failed to read terminal event")? {
            Event::Key(key) if accept(&key) => Ok(self.bindings.resolve(&key)),
            _ => Ok(None),
        }
    }
}

const READER_POLL_INTERVAL: Duration = Duration::from_millis(100);

// Reader side of the hand-off. Turns overwrite each other so the loop only
// ever sees the newest one; speed changes and quit queue up.
struct Handoff {
    latest_turn: Arc<Mutex<Option<Direction>>>,
    controls: Sender<InputEvent>,
}

impl Handoff {
    /// Returns false once the game loop has gone away.
    fn deliver(&self, input: InputEvent) -> bool {
        match input {
            InputEvent::Turn(direction) => {
                *self.latest_turn.lock().unwrap_or_else(PoisonError::into_inner) = Some(direction);
                true
            }
            control => self.controls.send(control).is_ok(),
        }
    }
}

/// Reads keys on a background thread. Each poll hands the game loop one
/// queued control input, or else the latest turn.
pub struct ThreadedInput {
    latest_turn: Arc<Mutex<Option<Direction>>>,
    controls: Receiver<InputEvent>,
    _reader: Option<thread::JoinHandle<()>>,
}

impl ThreadedInput {
    /// Spawns the reader. It exits once `running` is cleared or the
    /// receiving side is dropped.
    pub fn spawn(bindings: KeyBindings, running: Arc<AtomicBool>) -> Result<Self> {
        Self::spawn_reader(move |handoff| {
            while running.load(Ordering::Relaxed) {
                let event = event::poll(READER_POLL_INTERVAL).and_then(|ready| {
                    if ready {
                        event::read().map(Some)
                    } else {
                        Ok(None)
                    }
                });

                let key = match event {
                    Ok(Some(Event::Key(key))) if accept(&key) => key,
                    Ok(_) => continue,
                    Err(err) => {
                        warn!("Input reader failed to read a key: {}", err);
                        continue;
                    }
                };

                if let Some(input) = bindings.resolve(&key) {
                    debug!("Input reader resolved {:?}", input);
                    if !handoff.deliver(input) {
                        break;
                    }
                }
            }
        })
    }

    fn spawn_reader<F>(read: F) -> Result<Self>
    where
        F: FnOnce(Handoff) + Send + 'static,
    {
        let latest_turn = Arc::new(Mutex::new(None));
        let (tx, controls) = mpsc::channel();
        let handoff = Handoff {
            latest_turn: Arc::clone(&latest_turn),
            controls: tx,
        };

        let reader = thread::Builder::new()
            .name("input-reader".to_string())
            .spawn(move || read(handoff))
            .context("Failed to spawn input reader thread")?;

        Ok(Self {
            latest_turn,
            controls,
            _reader: Some(reader),
        })
    }

    /// A reader that delivers `inputs` and stops. Returns once they are all
    /// waiting to be polled.
    #[cfg(test)]
    pub fn replay(inputs: Vec<InputEvent>) -> Self {
        let mut input = Self::spawn_reader(move |handoff| {
            for event in inputs {
                handoff.deliver(event);
            }
        })
        .unwrap();
        input._reader.take().unwrap().join().unwrap();
        input
    }

    fn take_turn(&self) -> Option<InputEvent> {
        self.latest_turn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(InputEvent::Turn)
    }
}

impl InputSource for ThreadedInput {
    fn poll(&mut self) -> Result<Option<InputEvent>> {
        match self.controls.try_recv() {
            Ok(input) => Ok(Some(input)),
            Err(TryRecvError::Empty) => Ok(self.take_turn()),
            Err(TryRecvError::Disconnected) => match self.take_turn() {
                Some(turn) => Ok(Some(turn)),
                None => Err(anyhow!("Input reader thread has stopped")),
            },
        }
    }
}

/// Replays a fixed list of per-poll results.
#[cfg(test)]
pub struct ScriptedInput {
    script: std::collections::VecDeque<Result<Option<InputEvent>>>,
}

#[cfg(test)]
impl ScriptedInput {
    pub fn new(events: Vec<Option<InputEvent>>) -> Self {
        Self {
            script: events.into_iter().map(Ok).collect(),
        }
    }

    pub fn push_failure(&mut self, message: &str) {
        self.script.push_back(Err(anyhow!(message.to_string())));
    }
}

#[cfg(test)]
impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Result<Option<InputEvent>> {
        self.script.pop_front().unwrap_or(Ok(None))
    }
}

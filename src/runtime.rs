use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, MouseEvent};

/// Everything the game loop reacts to
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize,
    Tick,
}

/// Where input comes from: the terminal, or a channel in tests
pub trait GameEventSource: Send + 'static {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a thread and forwards the ones the game uses
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) => GameEvent::Key(key),
                Ok(CtEvent::Mouse(mouse)) => GameEvent::Mouse(mouse),
                Ok(CtEvent::Resize(_, _)) => GameEvent::Resize,
                Ok(_) => continue,
                Err(e) => {
                    log::error!("terminal input closed: {e}");
                    break;
                }
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed source for headless tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Turns the event stream into one step per key, click, resize or elapsed tick
pub struct Runner<E: GameEventSource> {
    events: E,
    tick: Duration,
}

impl<E: GameEventSource> Runner<E> {
    pub fn new(events: E, tick: Duration) -> Self {
        Self { events, tick }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Waits at most one tick; a quiet or closed source yields `Tick`, which
    /// is what drives pending layout changes.
    pub fn step(&self) -> GameEvent {
        self.events.recv_timeout(self.tick).unwrap_or(GameEvent::Tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers, MouseButton, MouseEventKind};

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(
            TestEventSource::new(rx),
            Duration::from_millis(1),
        );

        assert!(matches!(runner.step(), GameEvent::Tick));
        assert_eq!(runner.tick(), Duration::from_millis(1));
    }

    #[test]
    fn step_ticks_once_sender_is_gone() {
        let (tx, rx) = mpsc::channel::<GameEvent>();
        drop(tx);
        let runner = Runner::new(
            TestEventSource::new(rx),
            Duration::from_millis(1),
        );

        assert!(matches!(runner.step(), GameEvent::Tick));
    }

    #[test]
    fn step_passes_through_key_and_mouse_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(GameEvent::Key(KeyEvent::new(
            KeyCode::Enter,
            KeyModifiers::NONE,
        )))
        .unwrap();
        tx.send(GameEvent::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 2,
            modifiers: KeyModifiers::NONE,
        }))
        .unwrap();
        let runner = Runner::new(
            TestEventSource::new(rx),
            Duration::from_millis(10),
        );

        match runner.step() {
            GameEvent::Key(key) => assert_eq!(key.code, KeyCode::Enter),
            other => panic!("expected key event, got {other:?}"),
        }
        match runner.step() {
            GameEvent::Mouse(mouse) => assert_eq!((mouse.column, mouse.row), (4, 2)),
            other => panic!("expected mouse event, got {other:?}"),
        }
    }
}

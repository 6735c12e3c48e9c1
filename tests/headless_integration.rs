use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use floorrush::clock::ManualClock;
use floorrush::game::{ClickOutcome, GameController, GameSettings, Phase, RestartPolicy};
use floorrush::report::{HttpReporter, RecordingReporter};
use floorrush::runtime::{GameEvent, Runner, TestEventSource};

fn key(code: KeyCode) -> GameEvent {
    GameEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

// Headless integration using the internal runtime + GameController without a TTY.
// Enter confirms the round; function key F<n> stands in for clicking floor n.
#[test]
fn headless_session_completes_through_runner() {
    let clock = ManualClock::new();
    let reporter = RecordingReporter::new();
    let settings = GameSettings {
        restart_policy: RestartPolicy::Manual,
        advance_delay: Duration::from_secs(1),
    };
    let mut game = GameController::with_clock(settings, clock.clone())
        .with_seed(5)
        .with_reporter(Box::new(reporter.clone()));

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        Duration::from_millis(1),
    );

    game.request_round().unwrap();

    for _ in 0..2000u32 {
        match game.phase() {
            Phase::AwaitingConfirm => tx.send(key(KeyCode::Enter)).unwrap(),
            Phase::Active => {
                // a wrong floor first, then the right one
                let target = game.view().target_floor.unwrap();
                let wrong = if target == 1 { 2 } else { 1 };
                tx.send(GameEvent::Resize).unwrap();
                tx.send(key(KeyCode::F(wrong))).unwrap();
                tx.send(key(KeyCode::F(target))).unwrap();
            }
            Phase::Finished => break,
            Phase::Idle => {}
        }

        // drain what was queued, then let a tick through
        loop {
            match runner.step() {
                GameEvent::Tick => {
                    clock.advance(Duration::from_millis(250));
                    game.poll();
                    break;
                }
                GameEvent::Resize | GameEvent::Mouse(_) => {}
                GameEvent::Key(event) => match event.code {
                    KeyCode::Enter => {
                        game.confirm_round().unwrap();
                        clock.advance(Duration::from_millis(300));
                    }
                    KeyCode::F(floor) => {
                        let target = game.view().target_floor;
                        let outcome = game.click_floor(floor).unwrap();
                        if Some(floor) == target {
                            assert!(matches!(outcome, ClickOutcome::Hit { .. }));
                        } else {
                            assert_eq!(outcome, ClickOutcome::Miss);
                        }
                    }
                    _ => {}
                },
            }
        }
    }

    assert_eq!(game.phase(), Phase::Finished);
    let elapsed = game.session().elapsed.clone();
    // 300ms after confirming plus one 250ms tick before the click lands
    assert_eq!(elapsed, vec![0.55; 4]);

    game.restart().unwrap();
    assert_eq!(reporter.reports(), vec![elapsed]);
    assert_eq!(game.phase(), Phase::Idle);
    assert_eq!(game.session().layout_index, 0);
}

#[test]
fn headless_layouts_are_visited_in_order() {
    let clock = ManualClock::new();
    let mut game = GameController::with_clock(GameSettings::default(), clock.clone()).with_seed(8);
    let layouts = *game.layouts();

    game.request_round().unwrap();
    for (idx, layout) in layouts.iter().enumerate() {
        let view = game.view();
        assert_eq!(view.layout_index, idx);
        assert_eq!(view.current_layout.as_ref(), Some(layout));
        assert!(layout.contains(view.target_floor.unwrap()));

        let floor = game.confirm_round().unwrap();
        game.click_floor(floor).unwrap();
        clock.advance(Duration::from_secs(1));
        assert!(game.poll());
    }
    assert_eq!(game.phase(), Phase::Finished);
    assert_eq!(game.session().elapsed.len(), 4);
}

#[test]
fn headless_deferred_advance_waits_for_the_delay() {
    let clock = ManualClock::new();
    let mut game = GameController::with_clock(GameSettings::default(), clock.clone()).with_seed(2);

    game.request_round().unwrap();
    let floor = game.confirm_round().unwrap();
    game.click_floor(floor).unwrap();

    for _ in 0..9 {
        clock.advance(Duration::from_millis(100));
        assert!(!game.poll());
        assert_eq!(game.view().layout_index, 0);
        assert!(game.view().transition_pending);
    }
    clock.advance(Duration::from_millis(100));
    assert!(game.poll());
    assert_eq!(game.view().layout_index, 1);
    assert_eq!(game.pending_remaining(), None);
}

#[test]
fn headless_report_lands_before_shutdown() {
    // a slow endpoint: the request is still open when the player quits
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/exec", listener.local_addr().unwrap());
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).unwrap();
        thread::sleep(Duration::from_millis(300));
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    });

    let clock = ManualClock::new();
    let reporter = HttpReporter::new(endpoint);
    let mut game = GameController::with_clock(GameSettings::default(), clock.clone())
        .with_seed(4)
        .with_reporter(Box::new(reporter.clone()));

    game.request_round().unwrap();
    while game.phase() != Phase::Finished {
        let floor = game.confirm_round().unwrap();
        clock.advance(Duration::from_millis(500));
        game.click_floor(floor).unwrap();
        clock.advance(Duration::from_secs(1));
        game.poll();
    }

    game.restart().unwrap();
    game.flush_reports(Duration::from_secs(5));

    assert_eq!(reporter.pending_reports(), 0);
    let request = server.join().unwrap();
    assert!(request.starts_with("GET /exec?times=%5B0.5%2C0.5%2C0.5%2C0.5%5D "));
}

//! The game's state machine.
//!
//! `Idle -> AwaitingConfirm -> Active -> Idle (next layout) ... -> Finished`,
//! and `restart` takes `Finished` back to `Idle`. After a successful click the
//! move to the next layout (or to `Finished`) is deferred by a fixed delay and
//! fired from [`GameController::poll`].

use std::time::Duration;

use log::{debug, info, warn};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::layout::{generate_layouts, Layout, LAYOUT_COUNT};
use crate::report::{NullReporter, Reporter};
use crate::schedule::Deferred;
use crate::session::Session;

pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    AwaitingConfirm,
    Active,
    Finished,
}

/// What `restart` does once the session is reset
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RestartPolicy {
    /// Pick the first target straight away
    #[default]
    Auto,
    /// Wait on the Start button
    Manual,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("{op} is not allowed while {phase}")]
    InvalidPhase { op: &'static str, phase: Phase },
    #[error("no target floor has been chosen")]
    NoTarget,
    #[error("waiting for the next layout")]
    TransitionPending,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    /// Wrong floor; nothing changed
    Miss,
    /// Right floor, with the reaction time in seconds
    Hit { elapsed: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    AdvanceLayout,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    pub restart_policy: RestartPolicy,
    pub advance_delay: Duration,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            restart_policy: RestartPolicy::default(),
            advance_delay: DEFAULT_ADVANCE_DELAY,
        }
    }
}

/// Snapshot handed to the presentation layer after each transition
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub phase: Phase,
    pub layout_index: usize,
    pub target_floor: Option<u8>,
    pub current_layout: Option<Layout>,
    pub elapsed: Vec<f64>,
    pub transition_pending: bool,
}

impl ViewState {
    pub fn last_elapsed(&self) -> Option<f64> {
        self.elapsed.last().copied()
    }
}

pub struct GameController<C: Clock = SystemClock> {
    layouts: [Layout; LAYOUT_COUNT],
    session: Session,
    phase: Phase,
    pending: Deferred<Transition>,
    settings: GameSettings,
    clock: C,
    rng: StdRng,
    reporter: Box<dyn Reporter>,
}

impl GameController<SystemClock> {
    pub fn new(settings: GameSettings) -> Self {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> GameController<C> {
    pub fn with_clock(settings: GameSettings, clock: C) -> Self {
        Self {
            layouts: generate_layouts(),
            session: Session::default(),
            phase: Phase::Idle,
            pending: Deferred::new(),
            settings,
            clock,
            rng: StdRng::from_entropy(),
            reporter: Box::new(NullReporter),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn layouts(&self) -> &[Layout; LAYOUT_COUNT] {
        &self.layouts
    }

    pub fn current_layout(&self) -> Option<&Layout> {
        self.layouts.get(self.session.layout_index)
    }

    pub fn transition_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn pending_remaining(&self) -> Option<Duration> {
        self.pending.remaining(self.clock.now())
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            phase: self.phase,
            layout_index: self.session.layout_index,
            target_floor: self.session.target_floor,
            current_layout: self.current_layout().copied(),
            elapsed: self.session.elapsed.clone(),
            transition_pending: self.pending.is_pending(),
        }
    }

    fn expect_phase(&self, op: &'static str, phase: Phase) -> Result<(), GameError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(GameError::InvalidPhase {
                op,
                phase: self.phase,
            })
        }
    }

    fn pick_floor(&mut self) -> Option<u8> {
        let layout = self.current_layout()?;
        let candidates: Vec<u8> = layout
            .floors()
            .iter()
            .copied()
            .filter(|floor| !self.session.used_floors.contains(floor))
            .collect();
        candidates.choose(&mut self.rng).copied()
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.session.target_floor = None;
        info!(
            "session finished after {} layouts: {:?}",
            self.session.completed_layouts(),
            self.session.elapsed
        );
    }

    /// Chooses the next target floor from the current layout.
    pub fn request_round(&mut self) -> Result<(), GameError> {
        self.expect_phase("request_round", Phase::Idle)?;
        if self.pending.is_pending() {
            return Err(GameError::TransitionPending);
        }

        if self.session.layout_index >= LAYOUT_COUNT {
            self.finish();
            return Ok(());
        }

        match self.pick_floor() {
            Some(floor) => {
                debug!(
                    "layout {}: target floor {}",
                    self.session.layout_index, floor
                );
                self.session.target_floor = Some(floor);
                self.phase = Phase::AwaitingConfirm;
            }
            None => {
                warn!(
                    "layout {} has no unused floors left",
                    self.session.layout_index
                );
                self.finish();
            }
        }
        Ok(())
    }

    /// Starts the clock on the chosen floor and returns it.
    pub fn confirm_round(&mut self) -> Result<u8, GameError> {
        self.expect_phase("confirm_round", Phase::AwaitingConfirm)?;
        let floor = self.session.target_floor.ok_or(GameError::NoTarget)?;

        self.session.used_floors.insert(floor);
        self.session.round_started_at = Some(self.clock.now());
        self.phase = Phase::Active;
        Ok(floor)
    }

    pub fn click_floor(&mut self, floor: u8) -> Result<ClickOutcome, GameError> {
        self.expect_phase("click_floor", Phase::Active)?;
        if self.session.target_floor != Some(floor) {
            return Ok(ClickOutcome::Miss);
        }
        let started = self
            .session
            .round_started_at
            .ok_or(GameError::NoTarget)?;

        let now = self.clock.now();
        // millisecond resolution, reported as fractional seconds
        let elapsed = now.saturating_duration_since(started).as_millis() as f64 / 1000.0;

        self.session.elapsed.push(elapsed);
        self.session.target_floor = None;
        self.session.round_started_at = None;
        self.phase = Phase::Idle;

        let transition = if self.session.layout_index + 1 >= LAYOUT_COUNT {
            Transition::Finish
        } else {
            Transition::AdvanceLayout
        };
        self.pending
            .schedule(now + self.settings.advance_delay, transition);

        info!(
            "layout {} floor {} hit in {:.3}s",
            self.session.layout_index, floor, elapsed
        );
        Ok(ClickOutcome::Hit { elapsed })
    }

    /// Fires the deferred transition if it is due. Returns true when the
    /// state changed.
    pub fn poll(&mut self) -> bool {
        let Some(transition) = self.pending.take_due(self.clock.now()) else {
            return false;
        };

        match transition {
            Transition::Finish => self.finish(),
            Transition::AdvanceLayout => {
                self.session.advance_layout();
                if let Err(e) = self.request_round() {
                    warn!("could not start round after advancing: {e}");
                }
            }
        }
        true
    }

    /// Gives reports still in flight up to `timeout` to land.
    pub fn flush_reports(&self, timeout: Duration) {
        self.reporter.flush(timeout);
    }

    /// Reports the finished session and starts over.
    pub fn restart(&mut self) -> Result<(), GameError> {
        self.expect_phase("restart", Phase::Finished)?;

        self.reporter.report(&self.session.elapsed);
        self.pending.cancel();
        self.session = Session::default();
        self.phase = Phase::Idle;
        info!("session restarted ({} policy)", self.settings.restart_policy);

        if self.settings.restart_policy == RestartPolicy::Auto {
            self.request_round()?;
        }
        Ok(())
    }
}

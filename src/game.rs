//! The reaction game state machine.
//!
//! [`Machine`] is pure: it never touches a clock or a timer itself. Callers
//! pass timestamps in, and whenever a transition needs a timer the machine
//! hands back an [`Arm`] token that must be returned through
//! [`Machine::fire`] when the timer goes off. A token that is no longer the
//! current one is ignored, so a late timer can never move the game.

use crate::config::{
    COLOR_IDLE, COLOR_READY, COLOR_TOO_SOON, COLOR_WAITING, MAX_DELAY_MS, MIN_DELAY_MS,
};
use log::debug;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing pending; Start is accepted.
    Idle,
    /// Random delay running; a click now is too soon.
    Waiting,
    /// Signal shown; a click now is scored.
    Ready,
    /// Cooldown after a premature click; clicks are ignored.
    Locked,
}

impl Phase {
    pub fn panel_mode(&self) -> PanelMode {
        match self {
            Phase::Idle => PanelMode::Idle,
            Phase::Waiting => PanelMode::Waiting,
            Phase::Ready => PanelMode::Ready,
            Phase::Locked => PanelMode::TooSoon,
        }
    }
}

/// What the panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelMode {
    Idle,
    Waiting,
    Ready,
    TooSoon,
}

impl PanelMode {
    pub fn color(&self) -> &'static str {
        match self {
            PanelMode::Idle => COLOR_IDLE,
            PanelMode::Waiting => COLOR_WAITING,
            PanelMode::Ready => COLOR_READY,
            PanelMode::TooSoon => COLOR_TOO_SOON,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            PanelMode::Idle => "idle",
            PanelMode::Waiting => "waiting",
            PanelMode::Ready => "ready",
            PanelMode::TooSoon => "too-soon",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            PanelMode::Idle => "Press Start to begin",
            PanelMode::Waiting => "Get ready... wait for green.",
            PanelMode::Ready => "Tap now!",
            PanelMode::TooSoon => "Too soon!",
        }
    }

    pub fn feedback(&self) -> &'static str {
        match self {
            PanelMode::Idle => "When the panel turns green, tap as fast as you can.",
            PanelMode::Waiting => "Don't tap yet. Wait for green!",
            PanelMode::Ready => "Go, go, go!",
            PanelMode::TooSoon => "You clicked before it turned green. Try again.",
        }
    }
}

/// Identifies the one timer the machine is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Arm(u64);

/// Outcome of a panel click.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Click {
    /// Idle or Locked: nothing happened.
    Ignored,
    /// Clicked while Waiting. The pending delay must be cancelled and a
    /// cooldown timer started for the returned token.
    TooSoon { cooldown: Arm },
    /// Clicked while Ready.
    Scored { elapsed_ms: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Machine {
    phase: Phase,
    started_at: Option<f64>,
    armed: Option<Arm>,
    generation: u64,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            started_at: None,
            armed: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Timestamp recorded when the game turned Ready.
    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    /// Whether a timer token is outstanding.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Idle → Waiting. Returns the token for the random-delay timer, or
    /// `None` when the game is not Idle and nothing changed.
    pub fn start(&mut self) -> Option<Arm> {
        if self.phase != Phase::Idle {
            debug!("Ignoring start while {:?}", self.phase);
            return None;
        }
        self.started_at = None;
        Some(self.arm(Phase::Waiting))
    }

    /// Deliver a timer. Waiting → Ready (recording `now_ms` as the start of
    /// the reaction) or Locked → Idle. Returns the new phase, or `None` for a
    /// stale token.
    pub fn fire(&mut self, arm: Arm, now_ms: f64) -> Option<Phase> {
        if self.armed != Some(arm) {
            debug!("Dropping stale timer {:?}", arm);
            return None;
        }
        self.armed = None;
        match self.phase {
            Phase::Waiting => {
                self.started_at = Some(now_ms);
                self.phase = Phase::Ready;
            }
            Phase::Locked => {
                self.phase = Phase::Idle;
            }
            Phase::Idle | Phase::Ready => return None,
        }
        Some(self.phase)
    }

    pub fn click(&mut self, now_ms: f64) -> Click {
        match self.phase {
            Phase::Waiting => {
                self.started_at = None;
                Click::TooSoon {
                    cooldown: self.arm(Phase::Locked),
                }
            }
            Phase::Ready => {
                let started = self.started_at.take().unwrap_or(now_ms);
                self.phase = Phase::Idle;
                Click::Scored {
                    elapsed_ms: (now_ms - started).max(0.0),
                }
            }
            Phase::Idle | Phase::Locked => Click::Ignored,
        }
    }

    /// Back to Idle from anywhere, forgetting any outstanding timer.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.started_at = None;
        self.armed = None;
    }

    fn arm(&mut self, phase: Phase) -> Arm {
        self.generation += 1;
        let arm = Arm(self.generation);
        self.armed = Some(arm);
        self.phase = phase;
        arm
    }
}

/// Delay before the panel turns green, uniform in `[MIN_DELAY_MS, MAX_DELAY_MS)`.
pub fn random_delay_ms<R: Rng>(rng: &mut R) -> u32 {
    rng.random_range(MIN_DELAY_MS..MAX_DELAY_MS)
}

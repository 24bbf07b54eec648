//! One running game: machine, pending timer, scores and observer.
//!
//! A [`Session`] is the only place where the pure [`Machine`] meets real
//! time. It owns at most one pending task handle; scheduling a new timer
//! always cancels the previous handle first. Timer callbacks only hold a weak
//! reference, so dropping the session silences any timer still in flight.

use crate::config::{COOLDOWN_MS, HISTORY_DISPLAY_COUNT, RESET_PROMPT};
use crate::game::{random_delay_ms, Arm, Click, Machine, PanelMode, Phase};
use crate::score::{HistoryEntry, ScoreRecord, ScoreStore, SpeedBand};
use crate::storage::KeyValueStore;
use crate::timer::{Clock, Scheduler, TaskHandle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Notification sent to the observer after a state change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// The panel switched mode. `Panel(PanelMode::TooSoon)` is the "too soon" signal.
    Panel(PanelMode),
    /// A reaction was scored and stored.
    Recorded { elapsed_ms: f64 },
    /// Best time and history were cleared.
    Cleared,
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// A fixed answer, for callers that already asked.
impl Confirm for bool {
    fn confirm(&self, _prompt: &str) -> bool {
        *self
    }
}

/// `window.confirm()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserConfirm;

impl Confirm for BrowserConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        gloo_utils::window()
            .confirm_with_message(prompt)
            .unwrap_or(false)
    }
}

/// Everything the UI needs to render one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: Phase,
    pub panel: PanelMode,
    /// Result of the latest scored click, cleared when a new round starts.
    pub last_elapsed_ms: Option<f64>,
    pub best_time_ms: Option<f64>,
    pub band: Option<SpeedBand>,
    pub recent: Vec<HistoryEntry>,
    pub attempts: usize,
}

type Observer = Rc<dyn Fn(Signal)>;

struct Inner<T: Scheduler, K: KeyValueStore> {
    timer: T,
    machine: Machine,
    pending: Option<T::Handle>,
    scores: ScoreStore<K>,
    rng: StdRng,
    last_elapsed: Option<f64>,
    observer: Option<Observer>,
}

impl<T: Scheduler, K: KeyValueStore> Inner<T, K> {
    fn replace_pending(&mut self, handle: Option<T::Handle>) {
        if let Some(old) = self.pending.take() {
            old.cancel();
        }
        self.pending = handle;
    }
}

pub struct Session<T, K>
where
    T: Clock + Scheduler + 'static,
    K: KeyValueStore + 'static,
{
    inner: Rc<RefCell<Inner<T, K>>>,
}

impl<T, K> Session<T, K>
where
    T: Clock + Scheduler + 'static,
    K: KeyValueStore + 'static,
{
    /// New idle session, loading scores from `backend`.
    pub fn new(timer: T, backend: K) -> Self {
        Self::with_rng(timer, backend, StdRng::from_os_rng())
    }

    pub fn with_rng(timer: T, backend: K, rng: StdRng) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                timer,
                machine: Machine::new(),
                pending: None,
                scores: ScoreStore::load(backend),
                rng,
                last_elapsed: None,
                observer: None,
            })),
        }
    }

    /// Install the observer. It runs after each change with the session
    /// unlocked, so it may call [`Session::view`].
    pub fn set_observer(&self, observer: impl Fn(Signal) + 'static) {
        self.inner.borrow_mut().observer = Some(Rc::new(observer));
    }

    pub fn phase(&self) -> Phase {
        self.inner.borrow().machine.phase()
    }

    pub fn score(&self) -> ScoreRecord {
        self.inner.borrow().scores.record().clone()
    }

    pub fn view(&self) -> SessionView {
        let inner = self.inner.borrow();
        let record = inner.scores.record();
        let phase = inner.machine.phase();
        SessionView {
            phase,
            panel: phase.panel_mode(),
            last_elapsed_ms: inner.last_elapsed,
            best_time_ms: record.best_time(),
            band: record.band(),
            recent: record.recent(HISTORY_DISPLAY_COUNT),
            attempts: record.history().len(),
        }
    }

    /// Begin a round. Returns `false` (and changes nothing) unless Idle.
    pub fn start(&self) -> bool {
        let weak = Rc::downgrade(&self.inner);
        {
            let mut inner = self.inner.borrow_mut();
            let Some(arm) = inner.machine.start() else {
                return false;
            };
            inner.last_elapsed = None;
            let delay = random_delay_ms(&mut inner.rng);
            info!("Round started, signal in {} ms", delay);
            Self::arm_timer(&mut inner, weak, arm, delay);
        }
        self.notify(&[Signal::Panel(PanelMode::Waiting)]);
        true
    }

    /// Handle a click on the panel.
    pub fn panel_click(&self) -> Click {
        let weak = Rc::downgrade(&self.inner);
        let (click, signals) = {
            let mut inner = self.inner.borrow_mut();
            let now = inner.timer.now_ms();
            let click = inner.machine.click(now);
            let signals = match click {
                Click::Ignored => {
                    debug!("Panel click ignored while {:?}", inner.machine.phase());
                    Vec::new()
                }
                Click::TooSoon { cooldown } => {
                    info!("Clicked too soon");
                    inner.last_elapsed = None;
                    Self::arm_timer(&mut inner, weak, cooldown, COOLDOWN_MS);
                    vec![Signal::Panel(PanelMode::TooSoon)]
                }
                Click::Scored { elapsed_ms } => {
                    info!("Reaction: {:.0} ms", elapsed_ms);
                    inner.replace_pending(None);
                    let recorded_at = inner.timer.epoch_ms();
                    inner.scores.record_attempt(elapsed_ms, recorded_at);
                    inner.last_elapsed = Some(elapsed_ms);
                    vec![
                        Signal::Panel(PanelMode::Idle),
                        Signal::Recorded { elapsed_ms },
                    ]
                }
            };
            (click, signals)
        };
        self.notify(&signals);
        click
    }

    /// Clear best time and history if `confirm` agrees. Any round in
    /// progress is abandoned. Returns whether the reset happened.
    pub fn reset(&self, confirm: &impl Confirm) -> bool {
        if !confirm.confirm(RESET_PROMPT) {
            debug!("Reset declined");
            return false;
        }
        {
            let mut inner = self.inner.borrow_mut();
            inner.replace_pending(None);
            inner.machine.reset();
            inner.last_elapsed = None;
            inner.scores.reset();
        }
        info!("Scores reset");
        self.notify(&[Signal::Panel(PanelMode::Idle), Signal::Cleared]);
        true
    }

    fn arm_timer(inner: &mut Inner<T, K>, weak: Weak<RefCell<Inner<T, K>>>, arm: Arm, delay_ms: u32) {
        let handle = inner
            .timer
            .schedule(delay_ms, Box::new(move || Self::on_timer(&weak, arm)));
        inner.replace_pending(Some(handle));
    }

    // The fired handle stays in `pending` until the next replace; dropping a
    // handle from inside its own callback is not allowed for browser timeouts.
    fn on_timer(weak: &Weak<RefCell<Inner<T, K>>>, arm: Arm) {
        let Some(cell) = weak.upgrade() else {
            return;
        };
        let (phase, observer) = {
            let mut inner = cell.borrow_mut();
            let now = inner.timer.now_ms();
            match inner.machine.fire(arm, now) {
                Some(phase) => (phase, inner.observer.clone()),
                None => return,
            }
        };
        debug!("Timer fired, now {:?}", phase);
        if let Some(observer) = observer {
            observer(Signal::Panel(phase.panel_mode()));
        }
    }

    fn notify(&self, signals: &[Signal]) {
        let observer = self.inner.borrow().observer.clone();
        if let Some(observer) = observer {
            for signal in signals {
                observer(*signal);
            }
        }
    }
}

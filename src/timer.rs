//! Clocks and one-shot scheduled tasks.
//!
//! The game only ever needs two things from its environment: "what time is
//! it" and "run this later, unless I change my mind". [`BrowserTimer`]
//! answers both with `performance.now()` and `gloo_timers` timeouts;
//! [`ManualTimer`] answers them with a virtual clock that only moves when a
//! test calls [`ManualTimer::advance`].

use gloo_timers::callback::Timeout;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Source of timestamps, in milliseconds.
pub trait Clock {
    /// Monotonic time, used to measure reactions.
    fn now_ms(&self) -> f64;
    /// Wall-clock time since the Unix epoch, used to stamp attempts.
    fn epoch_ms(&self) -> f64;
}

/// Handle to a task that has been scheduled but may not have run yet.
pub trait TaskHandle {
    /// Prevent the task from running. Cancelling a task that already ran is a no-op.
    fn cancel(self);
}

/// Runs a task once after a delay.
pub trait Scheduler {
    type Handle: TaskHandle;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> Self::Handle;
}

// ──────────────────────────────────────────────────────────────────────────────
// Browser

/// Clock and scheduler backed by the browser event loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

/// A pending `setTimeout`. Dropping it clears the timeout as well.
pub struct BrowserTask(Timeout);

impl TaskHandle for BrowserTask {
    fn cancel(self) {
        // Timeout clears itself on drop.
        drop(self.0);
    }
}

impl Clock for BrowserTimer {
    fn now_ms(&self) -> f64 {
        gloo_utils::window()
            .performance()
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    fn epoch_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}

impl Scheduler for BrowserTimer {
    type Handle = BrowserTask;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> BrowserTask {
        BrowserTask(Timeout::new(delay_ms, task))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Manual (virtual time)

/// Epoch used by [`ManualTimer::new`]: 2023-11-14T22:13:20Z.
pub const MANUAL_EPOCH_MS: f64 = 1_700_000_000_000.0;

struct Pending {
    id: u64,
    due: f64,
    task: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct ManualState {
    now: f64,
    epoch_base: f64,
    next_id: u64,
    queue: Vec<Pending>,
}

/// Deterministic clock and scheduler. Clones share the same timeline.
#[derive(Clone)]
pub struct ManualTimer {
    state: Rc<RefCell<ManualState>>,
}

/// Handle returned by [`ManualTimer`].
pub struct ManualTask {
    id: u64,
    state: Weak<RefCell<ManualState>>,
}

impl TaskHandle for ManualTask {
    fn cancel(self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().queue.retain(|p| p.id != self.id);
        }
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::starting_at(MANUAL_EPOCH_MS)
    }

    /// Timer whose wall clock reads `epoch_ms` at virtual time zero.
    pub fn starting_at(epoch_ms: f64) -> Self {
        Self {
            state: Rc::new(RefCell::new(ManualState {
                epoch_base: epoch_ms,
                ..ManualState::default()
            })),
        }
    }

    /// Move time forward by `ms`, running every task that falls due in
    /// order of due time. Tasks scheduled while advancing run too if they
    /// fall inside the window.
    pub fn advance(&self, ms: f64) {
        let target = self.state.borrow().now + ms.max(0.0);
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let idx = state
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
                    .map(|(i, _)| i);
                idx.map(|i| {
                    let pending = state.queue.remove(i);
                    state.now = pending.due;
                    pending.task
                })
            };
            // The borrow is released before the task runs so it may schedule more work.
            match next {
                Some(task) => task(),
                None => break,
            }
        }
        self.state.borrow_mut().now = target;
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Milliseconds until the earliest pending task, if any.
    pub fn next_due_in(&self) -> Option<f64> {
        let state = self.state.borrow();
        state
            .queue
            .iter()
            .map(|p| p.due)
            .min_by(f64::total_cmp)
            .map(|due| due - state.now)
    }
}

impl Clock for ManualTimer {
    fn now_ms(&self) -> f64 {
        self.state.borrow().now
    }

    fn epoch_ms(&self) -> f64 {
        let state = self.state.borrow();
        state.epoch_base + state.now
    }
}

impl Scheduler for ManualTimer {
    type Handle = ManualTask;

    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce()>) -> ManualTask {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        let due = state.now + f64::from(delay_ms);
        state.queue.push(Pending { id, due, task });
        ManualTask {
            id,
            state: Rc::downgrade(&self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn task_runs_only_once_due() {
        let timer = ManualTimer::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let _handle = timer.schedule(100, Box::new(move || flag.set(true)));

        timer.advance(99.0);
        assert!(!fired.get());
        assert_eq!(timer.next_due_in(), Some(1.0));

        timer.advance(1.0);
        assert!(fired.get());
        assert_eq!(timer.pending(), 0);
        assert_eq!(timer.now_ms(), 100.0);
    }

    #[test]
    fn cancelled_task_never_runs() {
        let timer = ManualTimer::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let handle = timer.schedule(10, Box::new(move || flag.set(true)));
        handle.cancel();

        timer.advance(1_000.0);
        assert!(!fired.get());
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn tasks_run_in_due_order_and_see_their_own_time() {
        let timer = ManualTimer::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for delay in [30u32, 10, 20] {
            let seen = seen.clone();
            let clock = timer.clone();
            let _ = timer.schedule(delay, Box::new(move || seen.borrow_mut().push(clock.now_ms())));
        }

        timer.advance(50.0);
        assert_eq!(*seen.borrow(), vec![10.0, 20.0, 30.0]);
        assert_eq!(timer.now_ms(), 50.0);
    }

    #[test]
    fn task_scheduled_while_advancing_runs_if_due() {
        let timer = ManualTimer::new();
        let fired = Rc::new(Cell::new(0));
        let inner_timer = timer.clone();
        let counter = fired.clone();
        let _ = timer.schedule(
            10,
            Box::new(move || {
                counter.set(counter.get() + 1);
                let counter = counter.clone();
                let _ = inner_timer.schedule(10, Box::new(move || counter.set(counter.get() + 1)));
            }),
        );

        timer.advance(15.0);
        assert_eq!(fired.get(), 1);
        timer.advance(5.0);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn epoch_follows_virtual_time() {
        let timer = ManualTimer::starting_at(5_000.0);
        timer.advance(250.0);
        assert_eq!(timer.epoch_ms(), 5_250.0);
    }
}

//! Reaction Rush: a reaction-time tester.
//!
//! The panel waits a random delay, turns green, and the time until the next
//! click is recorded. The game logic ([`game`], [`session`]) and score keeping
//! ([`score`]) are independent of the browser; [`timer`] and [`storage`] carry
//! both a browser backend and a deterministic in-process one.

pub mod config;
pub mod game;
pub mod score;
pub mod session;
pub mod storage;
pub mod timer;

pub use game::{Click, Machine, PanelMode, Phase};
pub use score::{classify, Attempt, HistoryEntry, ScoreRecord, ScoreStore, SpeedBand};
pub use session::{BrowserConfirm, Confirm, Session, SessionView, Signal};
pub use storage::{KeyValueStore, LocalStore, MemoryStore, StorageError};
pub use timer::{BrowserTimer, Clock, ManualTimer, Scheduler, TaskHandle};

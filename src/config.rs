//! Application-level configuration constants.

// Persistence
pub const STORAGE_KEY: &str = "reactrush-reaction-data";
pub const HISTORY_CAPACITY: usize = 30;

// Timing (milliseconds)
pub const MIN_DELAY_MS: u32 = 800;
pub const MAX_DELAY_MS: u32 = 2_000;
pub const COOLDOWN_MS: u32 = 800;

// Speed band thresholds (milliseconds, upper bound exclusive)
pub const EXCELLENT_BELOW_MS: f64 = 150.0;
pub const GOOD_BELOW_MS: f64 = 250.0;
pub const AVERAGE_BELOW_MS: f64 = 350.0;

// UI constants
pub const HISTORY_DISPLAY_COUNT: usize = 6;
pub const RESET_PROMPT: &str = "Reset best time and history?";

// Panel colours
pub const COLOR_IDLE: &str = "#050616";
pub const COLOR_WAITING: &str = "#ffb300";
pub const COLOR_READY: &str = "#00e676";
pub const COLOR_TOO_SOON: &str = "#ff5252";

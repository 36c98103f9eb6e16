//! Utility Module
//!
//! - [`time`]: frame clocks (wall-clock [`Timer`](time::Timer) and the
//!   deterministic [`ManualClock`](time::ManualClock))
//! - [`FpsCounter`]: frame rate over one-second windows

pub mod fps_counter;
pub mod time;

pub use fps_counter::FpsCounter;
pub use time::{FrameClock, ManualClock, Timer};

//! Frame timing carried by draw payloads.
//!
//! A variant owns one `FrameClock` and ticks it once per draw pass.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};

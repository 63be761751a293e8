//! Easel engine crate.
//!
//! This crate owns the lifecycle of the GPU device and render target behind a
//! drawable control: when the device is (re)created, when the target is rebuilt or
//! reused, and how draw callbacks run against it. A wgpu-backed implementation of
//! the platform device API lives in [`gpu`].

pub mod error;
pub mod logging;

pub mod coords;
pub mod paint;
pub mod time;

pub mod event;
pub mod device;
pub mod control;
pub mod canvas;
pub mod gpu;

pub use error::{ControlError, ErrorKind, Result};

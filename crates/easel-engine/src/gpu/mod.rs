//! wgpu implementation of the device API.
//!
//! [`WgpuDeviceFactory`] creates [`WgpuDevice`]s and watches them for loss;
//! [`OffscreenTarget`] is a render-attachment texture usable as a control's
//! render target.

mod device;
mod init;
mod target;

pub use device::{WgpuDevice, WgpuDeviceFactory};
pub use init::GpuInit;
pub use target::{OffscreenTarget, WgpuDrawingSession};

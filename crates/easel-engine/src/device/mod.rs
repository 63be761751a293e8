//! Device acquisition and recreation policy.
//!
//! This module is responsible for:
//! - the platform device contract (`GraphicsDevice`, `DeviceFactory`)
//! - creating the device lazily and recreating it after loss
//! - raising create-resources callbacks for each new device or DPI change

mod api;
mod flags;
mod manager;
mod resources;

pub use api::{DeviceFactory, DeviceId, GraphicsDevice};
pub use flags::RunWithDeviceFlags;
pub use manager::{ChangedCallback, RecreatableDeviceManager};
pub use resources::{
    CreateResourcesEventArgs, CreateResourcesHandler, CreateResourcesReason, PendingResources,
};

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a device instance.
///
/// Render targets record the id of the device that built them; a different id
/// means the target is unusable and must be rebuilt.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Allocates a new id. Never returns the same value twice.
    pub fn next() -> Self {
        DeviceId(NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Handle to a GPU device as seen by the control core.
///
/// Handles are cheap to clone and all clones refer to the same device.
pub trait GraphicsDevice: Clone + 'static {
    fn id(&self) -> DeviceId;

    /// The device API's own loss signal. Once true, it stays true.
    fn is_lost(&self) -> bool;

    /// Asks the device to release idle cached resources.
    fn trim(&self) -> anyhow::Result<()>;
}

/// Platform call that creates devices.
pub trait DeviceFactory {
    type Device: GraphicsDevice;

    fn create_device(&mut self) -> anyhow::Result<Self::Device>;
}

use bitflags::bitflags;

bitflags! {
    /// Describes the device handed to a `run_with_device` action.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct RunWithDeviceFlags: u32 {
        /// The device was created during this call; anything built for an earlier
        /// device is unusable.
        const NEWLY_CREATED_DEVICE  = 1 << 0;
        /// Create-resources callbacks have not finished for this device.
        const RESOURCES_NOT_CREATED = 1 << 1;
    }
}

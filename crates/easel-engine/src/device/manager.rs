use std::fmt;
use std::sync::Arc;

use crate::error::{CallbackKind, ControlError, Result};
use crate::event::{EventSource, EventToken};

use super::api::{DeviceFactory, GraphicsDevice};
use super::flags::RunWithDeviceFlags;
use super::resources::{
    CreateResourcesEventArgs, CreateResourcesHandler, CreateResourcesReason, ResourceTracker,
    TrackerStatus,
};

/// Notification fired when a redraw is needed because device state changed.
pub type ChangedCallback = Arc<dyn Fn() + Send + Sync>;

enum Resources {
    NotCreated(CreateResourcesReason),
    Pending {
        reason: CreateResourcesReason,
        tracker: ResourceTracker,
    },
    Created,
}

/// Owns the device and decides when it must be (re)created.
///
/// All methods run on the control's affinity thread.
pub struct RecreatableDeviceManager<D: GraphicsDevice> {
    factory: Box<dyn DeviceFactory<Device = D>>,
    device: Option<D>,
    has_created_device: bool,
    resources: Resources,
    dpi_changed: bool,
    create_resources: EventSource<CreateResourcesHandler<D>>,
    changed: Option<ChangedCallback>,
}

impl<D: GraphicsDevice> RecreatableDeviceManager<D> {
    pub fn new(factory: impl DeviceFactory<Device = D> + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            device: None,
            has_created_device: false,
            resources: Resources::NotCreated(CreateResourcesReason::FirstTime),
            dpi_changed: false,
            create_resources: EventSource::new(),
            changed: None,
        }
    }

    /// Sets the single changed notification, replacing any previous one.
    pub fn set_changed_callback(&mut self, callback: ChangedCallback) {
        self.changed = Some(callback);
    }

    /// The current device, or `None` if none has been created yet.
    ///
    /// A returned device may already be lost; loss is only acted on by
    /// [`run_with_device`](Self::run_with_device).
    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    pub fn is_ready_to_draw(&self) -> bool {
        self.device.as_ref().is_some_and(|d| !d.is_lost()) && matches!(self.resources, Resources::Created)
    }

    /// Flags the next pass to re-raise create-resources with `DpiChanged`.
    pub fn set_dpi_changed(&mut self) {
        self.dpi_changed = true;
        self.notify_changed();
    }

    /// Registers a create-resources callback.
    ///
    /// If resources already exist for the current device, the new handler is raised
    /// immediately with `FirstTime`; when it fails it is unregistered again and the
    /// failure returned.
    pub fn add_create_resources<F>(&mut self, handler: F) -> Result<EventToken>
    where
        F: FnMut(&CreateResourcesEventArgs<'_, D>) -> anyhow::Result<()> + 'static,
    {
        let handler: Box<CreateResourcesHandler<D>> = Box::new(handler);
        let token = self.create_resources.add(handler);

        let device = match (&self.device, &self.resources) {
            (Some(device), Resources::Created) if !device.is_lost() => device.clone(),
            _ => return Ok(token),
        };

        let tracker = ResourceTracker::default();
        let reason = CreateResourcesReason::FirstTime;
        let result = {
            let args = CreateResourcesEventArgs::new(&device, reason, &tracker, self.changed.as_ref());
            self.create_resources.invoke_one(token, |handler| handler(&args))
        };

        if let Some(Err(err)) = result {
            self.create_resources.remove(token);
            return Err(ControlError::callback(CallbackKind::CreateResources, err));
        }

        if !matches!(tracker.take_status(), TrackerStatus::Done) {
            self.resources = Resources::Pending { reason, tracker };
        }

        self.notify_changed();
        Ok(token)
    }

    pub fn remove_create_resources(&mut self, token: EventToken) {
        if !self.create_resources.remove(token) {
            log::debug!("remove_create_resources: unknown token {}", token.value());
        }
    }

    /// Ensures a valid device exists, then runs `action` with it.
    ///
    /// A lost device is dropped and replaced. Creation failures are returned and not
    /// retried. If `action` fails and the device reports loss afterward, the failure
    /// is treated as loss: the device is dropped, Changed fires, and `Ok` is
    /// returned so the next pass recreates it.
    pub fn run_with_device<F>(&mut self, action: F) -> Result<()>
    where
        F: FnOnce(&D, RunWithDeviceFlags) -> Result<()>,
    {
        let mut flags = RunWithDeviceFlags::empty();

        if self.device.as_ref().is_some_and(|d| d.is_lost()) {
            log::warn!("device lost; recreating");
            self.device = None;
        }

        let device = match &self.device {
            Some(device) => device.clone(),
            None => {
                flags |= RunWithDeviceFlags::NEWLY_CREATED_DEVICE;
                self.create_device()?
            }
        };

        if self.dpi_changed {
            match self.resources {
                Resources::Created => {
                    self.resources = Resources::NotCreated(CreateResourcesReason::DpiChanged);
                    self.dpi_changed = false;
                }
                Resources::NotCreated(_) => self.dpi_changed = false,
                // Applied once the outstanding round finishes.
                Resources::Pending { .. } => {}
            }
        }

        self.update_resources(&device)?;

        if !matches!(self.resources, Resources::Created) {
            flags |= RunWithDeviceFlags::RESOURCES_NOT_CREATED;
        }

        match action(&device, flags) {
            Ok(()) => Ok(()),
            Err(err) if device.is_lost() => {
                log::warn!("device lost during device pass: {err:#}");
                self.device = None;
                self.notify_changed();
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn create_device(&mut self) -> Result<D> {
        let device = self
            .factory
            .create_device()
            .map_err(|err| ControlError::platform("device creation failed", err))?;

        let reason = if self.has_created_device {
            CreateResourcesReason::NewDevice
        } else {
            CreateResourcesReason::FirstTime
        };

        log::info!("created device {} ({reason:?})", device.id().value());

        self.has_created_device = true;
        self.resources = Resources::NotCreated(reason);
        self.dpi_changed = false;
        self.device = Some(device.clone());
        Ok(device)
    }

    fn update_resources(&mut self, device: &D) -> Result<()> {
        if let Resources::Pending { reason, tracker } = &self.resources {
            let reason = *reason;
            match tracker.take_status() {
                TrackerStatus::Outstanding => return Ok(()),
                TrackerStatus::Done => {
                    log::debug!("pending resources completed");
                    self.resources = Resources::Created;
                    return Ok(());
                }
                TrackerStatus::Failed(err) => {
                    self.resources = Resources::NotCreated(reason);
                    return Err(ControlError::callback(CallbackKind::CreateResources, err));
                }
            }
        }

        let Resources::NotCreated(reason) = self.resources else {
            return Ok(());
        };

        let tracker = ResourceTracker::default();
        {
            let args = CreateResourcesEventArgs::new(device, reason, &tracker, self.changed.as_ref());
            self.create_resources
                .invoke_all(|handler| handler(&args))
                .map_err(|err| ControlError::callback(CallbackKind::CreateResources, err))?;
        }

        match tracker.take_status() {
            TrackerStatus::Done => {
                self.resources = Resources::Created;
                self.notify_changed();
            }
            TrackerStatus::Outstanding => {
                log::debug!("create-resources ({reason:?}) pending");
                self.resources = Resources::Pending { reason, tracker };
            }
            TrackerStatus::Failed(err) => {
                return Err(ControlError::callback(CallbackKind::CreateResources, err));
            }
        }

        Ok(())
    }

    fn notify_changed(&self) {
        if let Some(changed) = &self.changed {
            changed();
        }
    }
}

impl<D: GraphicsDevice> fmt::Debug for RecreatableDeviceManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecreatableDeviceManager")
            .field("device", &self.device.as_ref().map(|d| d.id()))
            .field("ready_to_draw", &self.is_ready_to_draw())
            .field("dpi_changed", &self.dpi_changed)
            .finish()
    }
}

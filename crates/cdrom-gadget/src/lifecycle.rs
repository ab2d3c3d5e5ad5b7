use std::{path::Path, sync::Arc};

use cdrom_backing::{BackingStore, DeviceOpener};
use log::{info, warn};
use usbd_scsi::Emulator;

use crate::{
    GadgetConfig, GadgetError,
    descriptors::{EndpointDescriptor, UsbSpeed},
    endpoint::Endpoint,
    poller::MediaPoller,
    transport::BulkTransport,
    worker::{self, CommandWorker},
};

/// Per-configuration state created by [`FunctionController::bind`].
struct Bound {
    poller: MediaPoller,
    worker: CommandWorker,
    transport: Arc<BulkTransport>,
    in_descriptor: EndpointDescriptor,
    out_descriptor: EndpointDescriptor,
}

impl Bound {
    fn teardown_endpoints(&self) {
        self.transport.disarm();
        self.transport.ep_in().disable();
        self.transport.ep_out().disable();
    }
}

/// Reacts to bind, alternate setting, disable and unbind events for the
/// mass-storage function.
pub struct FunctionController {
    config: GadgetConfig,
    backing: Arc<BackingStore>,
    bound: Option<Bound>,
    active: bool,
}

impl FunctionController {
    /// A controller opening devices with the configured backend.
    pub fn new(config: GadgetConfig) -> Self {
        let opener = config.backend.opener();
        Self::with_opener(config, opener)
    }

    pub fn with_opener(config: GadgetConfig, opener: impl DeviceOpener + 'static) -> Self {
        let backing = Arc::new(BackingStore::new(config.device_path.clone(), opener));
        Self {
            config,
            backing,
            bound: None,
            active: false,
        }
    }

    pub fn config(&self) -> &GadgetConfig {
        &self.config
    }

    pub fn backing(&self) -> &Arc<BackingStore> {
        &self.backing
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Whether an alternate setting is active and commands are being served.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Takes ownership of the endpoint pair for this configuration and starts
    /// the command worker and media poller.
    pub fn bind(
        &mut self,
        ep_in: Arc<dyn Endpoint>,
        ep_out: Arc<dyn Endpoint>,
        speed: UsbSpeed,
    ) -> Result<(), GadgetError> {
        if self.bound.is_some() {
            return Err(GadgetError::AlreadyBound);
        }

        let in_descriptor = EndpointDescriptor::bulk(ep_in.address(), speed);
        let out_descriptor = EndpointDescriptor::bulk(ep_out.address(), speed);
        info!(
            "Binding {} ({:#04x}) and {} ({:#04x}) at {speed:?} speed",
            ep_in.name(),
            in_descriptor.address,
            ep_out.name(),
            out_descriptor.address
        );

        let (tx, rx) = worker::channel(self.config.worker_queue_depth);
        let transport = Arc::new(BulkTransport::new(ep_in, ep_out, tx.clone()));
        let worker = CommandWorker::spawn(
            tx,
            rx,
            transport.clone(),
            Emulator::new(self.backing.clone()),
            self.config.response_capacity,
        )?;
        let poller = MediaPoller::spawn(worker.sender(), self.config.media_poll_interval)?;

        self.bound = Some(Bound {
            poller,
            worker,
            transport,
            in_descriptor,
            out_descriptor,
        });
        Ok(())
    }

    /// Activates alternate setting `alt`, tearing down any previous state first.
    ///
    /// On failure everything enabled so far is disabled again.
    pub fn set_alt(&mut self, alt: u8) -> Result<(), GadgetError> {
        let bound = self.bound.as_ref().ok_or(GadgetError::NotBound)?;
        if alt != 0 {
            return Err(GadgetError::InvalidAltSetting(alt));
        }

        bound.teardown_endpoints();
        self.active = false;
        // A command still executing from before the teardown must finish first.
        bound.worker.barrier()?;

        let ep_in = bound.transport.ep_in();
        let ep_out = bound.transport.ep_out();

        ep_in.enable(&bound.in_descriptor)?;
        if let Err(err) = ep_out.enable(&bound.out_descriptor) {
            ep_in.disable();
            return Err(err);
        }

        if let Err(err) = bound.transport.arm().and_then(|()| bound.worker.open()) {
            warn!("Failed to activate alt setting {alt}: {err}");
            bound.teardown_endpoints();
            return Err(err);
        }

        info!("Alt setting {alt} active");
        self.active = true;
        Ok(())
    }

    /// Disables both endpoints and closes the backing device.
    pub fn disable(&mut self) {
        if let Some(bound) = &self.bound {
            bound.teardown_endpoints();
            if let Err(err) = bound.worker.close() {
                warn!("Failed to close backing device: {err}");
            }
        }
        if self.active {
            info!("Function disabled");
        }
        self.active = false;
    }

    /// Disables the function and releases the endpoints, so it can be bound again.
    pub fn unbind(&mut self) {
        self.disable();
        if let Some(mut bound) = self.bound.take() {
            bound.poller.stop();
            bound.worker.shutdown();
            info!("Function unbound");
        }
    }

    /// Points the function at a new backing device, reopening it if it is open.
    pub fn set_device_path(&mut self, path: impl AsRef<Path>) -> Result<(), GadgetError> {
        let path = path.as_ref();
        self.config.device_path = path.to_path_buf();
        self.backing.set_path(path)?;
        Ok(())
    }
}

impl Drop for FunctionController {
    fn drop(&mut self) {
        self.unbind();
    }
}

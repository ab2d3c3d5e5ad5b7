use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use cdrom_gadget::{
    FunctionController, GadgetConfig,
    descriptors::{
        INTERFACE_CLASS_MASS_STORAGE, INTERFACE_NAME, INTERFACE_PROTOCOL_BULK_ONLY,
        INTERFACE_SUBCLASS_SCSI, UsbSpeed,
    },
    ffs::FfsEndpoint,
};
use usb_gadget::{
    Class, Config, Gadget, Id, Strings, default_udc,
    function::custom::{
        Custom, Endpoint, EndpointDirection, EndpointReceiver, EndpointSender, Event, Interface,
    },
};

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Bulk-Only Mass Storage class requests.
const REQUEST_GET_MAX_LUN: u8 = 0xfe;
const REQUEST_MASS_STORAGE_RESET: u8 = 0xff;

/// Raw endpoint files, wrapped into [`FfsEndpoint`]s on the first bind.
enum Endpoints {
    Raw(EndpointSender, EndpointReceiver),
    Wrapped(Arc<FfsEndpoint>, Arc<FfsEndpoint>, UsbSpeed),
    Taken,
}

impl Endpoints {
    fn wrap(&mut self) -> Result<(Arc<FfsEndpoint>, Arc<FfsEndpoint>, UsbSpeed)> {
        match std::mem::replace(self, Endpoints::Taken) {
            Endpoints::Raw(mut sender, mut receiver) => {
                let packet_size = sender.max_packet_size()?;
                let speed = UsbSpeed::from_bulk_max_packet_size(packet_size)
                    .ok_or_else(|| anyhow!("Unexpected bulk max packet size {packet_size}"))?;
                let in_address = sender.control()?.real_address()?;
                let out_address = receiver.control()?.real_address()?;

                let ep_in = Arc::new(FfsEndpoint::bulk_in(sender, in_address)?);
                let ep_out = Arc::new(FfsEndpoint::bulk_out(receiver, out_address)?);
                *self = Endpoints::Wrapped(ep_in.clone(), ep_out.clone(), speed);
                Ok((ep_in, ep_out, speed))
            }
            Endpoints::Wrapped(ep_in, ep_out, speed) => {
                *self = Endpoints::Wrapped(ep_in.clone(), ep_out.clone(), speed);
                Ok((ep_in, ep_out, speed))
            }
            Endpoints::Taken => Err(anyhow!("Endpoints are unavailable")),
        }
    }
}

pub fn serve(config: GadgetConfig, vendor: u16, product: u16) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("Error setting Ctrl-C handler")?;
    }

    let (ep_in, ep_in_dir) = EndpointDirection::device_to_host();
    let (ep_out, ep_out_dir) = EndpointDirection::host_to_device();

    let (mut custom, handle) = Custom::builder()
        .with_interface(
            Interface::new(
                Class::new(
                    INTERFACE_CLASS_MASS_STORAGE,
                    INTERFACE_SUBCLASS_SCSI,
                    INTERFACE_PROTOCOL_BULK_ONLY,
                ),
                INTERFACE_NAME,
            )
            .with_endpoint(Endpoint::bulk(ep_in_dir))
            .with_endpoint(Endpoint::bulk(ep_out_dir)),
        )
        .build();

    let udc = default_udc().context("No USB device controller available")?;
    log::info!("Registering gadget {vendor:04x}:{product:04x} on {:?}", udc.name());

    // Device class 0: the class is given per interface.
    let reg = Gadget::new(
        Class::new(0, 0, 0),
        Id::new(vendor, product),
        Strings::new("cdrom-gadget", INTERFACE_NAME, ""),
    )
    .with_config(Config::new("cdrom").with_function(handle))
    .bind(&udc)?;

    let mut endpoints = Endpoints::Raw(ep_in, ep_out);
    let mut controller = FunctionController::new(config);

    while running.load(Ordering::SeqCst) {
        let Some(event) = custom.event_timeout(EVENT_POLL_INTERVAL)? else {
            continue;
        };

        match event {
            Event::Bind => {
                let (ep_in, ep_out, speed) = endpoints.wrap()?;
                controller.bind(ep_in, ep_out, speed)?;
            }
            Event::Enable => {
                if let Err(err) = controller.set_alt(0) {
                    log::error!("Unable to enable function: {err}");
                }
            }
            Event::Disable => controller.disable(),
            Event::Unbind => controller.unbind(),
            Event::SetupDeviceToHost(sender) => {
                if sender.ctrl_req().request == REQUEST_GET_MAX_LUN {
                    sender.send(&[0])?;
                } else {
                    sender.halt()?;
                }
            }
            Event::SetupHostToDevice(receiver) => {
                if receiver.ctrl_req().request == REQUEST_MASS_STORAGE_RESET {
                    log::info!("Mass storage reset requested");
                    receiver.recv_all()?;
                } else {
                    receiver.halt()?;
                }
            }
            other => log::debug!("Ignoring gadget event {other:?}"),
        }
    }

    log::info!("Shutting down");
    controller.unbind();
    drop(controller);
    drop(endpoints);
    reg.remove()?;

    Ok(())
}

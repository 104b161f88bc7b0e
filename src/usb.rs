//! USB printer channel.
//!
//! [`UsbChannel`] finds a printer by vendor id (and optionally product id and
//! serial number), claims the interface that owns the requested bulk OUT
//! endpoint and sends every [`Channel::write`] as one blocking bulk transfer.

use log::{debug, info};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, Direction, TransferType, UsbContext};
use std::time::Duration;

use crate::{
    error::{Error, Result},
    transport::Channel,
};

/// Which USB printer to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: Option<u16>,
    pub serial: Option<String>,
}

impl DeviceFilter {
    pub fn new(vendor_id: u16) -> Self {
        DeviceFilter {
            vendor_id,
            product_id: None,
            serial: None,
        }
    }

    pub fn product_id(self, product_id: u16) -> Self {
        DeviceFilter {
            product_id: Some(product_id),
            ..self
        }
    }

    pub fn serial(self, serial: String) -> Self {
        DeviceFilter {
            serial: Some(serial),
            ..self
        }
    }

    fn matches(&self, desc: &DeviceDescriptor) -> bool {
        desc.vendor_id() == self.vendor_id
            && self.product_id.map_or(true, |pid| desc.product_id() == pid)
    }
}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    config: u8,
    iface: u8,
    setting: u8,
    address: u8,
}

/// Bulk OUT endpoint of a claimed USB printer.
pub struct UsbChannel {
    handle: DeviceHandle<Context>,
    endpoint: Endpoint,
    timeout: Duration,
}

impl UsbChannel {
    /// Find the first device matching `filter`, claim the interface that
    /// owns bulk OUT endpoint number `endpoint` and return a ready channel.
    pub fn open(filter: &DeviceFilter, endpoint: u8) -> Result<Self> {
        let context = Context::new()
            .map_err(|err| Error::ChannelUnavailable(format!("libusb init failed: {}", err)))?;

        let (device, device_desc, mut handle) = Self::open_device(&context, filter)?;
        let endpoint = Self::find_endpoint(&device, &device_desc, endpoint)
            .ok_or(Error::MissingEndpoint(endpoint))?;
        debug!("{:?}", endpoint);

        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            debug!("auto detach of kernel driver unavailable: {}", err);
        }
        let claim = |handle: &mut DeviceHandle<Context>| -> rusb::Result<()> {
            if handle.active_configuration()? != endpoint.config {
                handle.set_active_configuration(endpoint.config)?;
            }
            handle.claim_interface(endpoint.iface)?;
            handle.set_alternate_setting(endpoint.iface, endpoint.setting)?;
            Ok(())
        };
        claim(&mut handle).map_err(|err| {
            Error::ChannelUnavailable(format!(
                "could not claim interface {}: {}",
                endpoint.iface, err
            ))
        })?;

        info!(
            "opened {:04x}:{:04x}, endpoint {:#04x}",
            device_desc.vendor_id(),
            device_desc.product_id(),
            endpoint.address
        );

        Ok(UsbChannel {
            handle,
            endpoint,
            timeout: Duration::from_secs(10),
        })
    }

    /// Bulk write timeout, 10 seconds by default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn open_device(
        context: &Context,
        filter: &DeviceFilter,
    ) -> Result<(Device<Context>, DeviceDescriptor, DeviceHandle<Context>)> {
        let devices = context.devices().map_err(|err| {
            Error::ChannelUnavailable(format!(
                "can't read device list, permission issue ? ({})",
                err
            ))
        })?;

        for device in devices.iter() {
            let device_desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(err) => {
                    debug!("{:?}", err);
                    continue;
                }
            };
            if !filter.matches(&device_desc) {
                continue;
            }

            let handle = match device.open() {
                Ok(handle) => handle,
                Err(err) => {
                    debug!("Failed to open device: {:?}", err);
                    continue;
                }
            };

            match &filter.serial {
                None => return Ok((device, device_desc, handle)),
                Some(serial) => {
                    if Self::read_serial(&handle, &device_desc).as_ref() == Some(serial) {
                        return Ok((device, device_desc, handle));
                    }
                }
            }
        }

        debug!("No device matches {:?}", filter);
        Err(Error::ChannelUnavailable(format!(
            "no printer matching {:04x}:{}{}",
            filter.vendor_id,
            filter
                .product_id
                .map_or_else(|| "*".to_string(), |pid| format!("{:04x}", pid)),
            filter
                .serial
                .as_ref()
                .map_or_else(String::new, |s| format!(" serial {}", s)),
        )))
    }

    fn read_serial(handle: &DeviceHandle<Context>, device_desc: &DeviceDescriptor) -> Option<String> {
        let timeout = Duration::from_secs(1);
        let languages = handle.read_languages(timeout).ok()?;
        let language = *languages.first()?;
        match handle.read_serial_number_string(language, device_desc, timeout) {
            Ok(s) => Some(s),
            Err(err) => {
                debug!("Failed to read serial number string: {:?}", err);
                None
            }
        }
    }

    fn find_endpoint(
        device: &Device<Context>,
        device_desc: &DeviceDescriptor,
        number: u8,
    ) -> Option<Endpoint> {
        for n in 0..device_desc.num_configurations() {
            let config_desc = match device.config_descriptor(n) {
                Ok(c) => c,
                Err(_) => continue,
            };
            for interface in config_desc.interfaces() {
                for interface_desc in interface.descriptors() {
                    for endpoint_desc in interface_desc.endpoint_descriptors() {
                        if endpoint_desc.direction() == Direction::Out
                            && endpoint_desc.transfer_type() == TransferType::Bulk
                            && endpoint_desc.number() == number
                        {
                            return Some(Endpoint {
                                config: config_desc.number(),
                                iface: interface_desc.interface_number(),
                                setting: interface_desc.setting_number(),
                                address: endpoint_desc.address(),
                            });
                        }
                    }
                }
            }
        }
        None
    }
}

impl Channel for UsbChannel {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        let n = self
            .handle
            .write_bulk(self.endpoint.address, data, self.timeout)?;
        if n == data.len() {
            Ok(())
        } else {
            debug!(
                "short bulk write: {} of {} bytes before timeout",
                n,
                data.len()
            );
            Err(Error::ShortWrite {
                written: n,
                expected: data.len(),
            })
        }
    }
}

impl Drop for UsbChannel {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.endpoint.iface) {
            debug!("release interface {}: {}", self.endpoint.iface, err);
        }
    }
}

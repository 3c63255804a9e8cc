use crate::bootloader::{AppType, BootloaderType};
use crate::device::{AppInstance, BootloaderInstance, TicDevice};
use crate::error::{Error, Result};
use crate::product::Product;
use rusb::{Device, UsbContext};

/// Entry point for finding connected devices.
pub struct Context {
    usb_context: rusb::Context,
}

/// Reads the serial number of a device, or returns `None` if the device exists but cannot be
/// opened yet. That is normal right after it enumerated or while another program holds it.
fn ready_serial_number(device: &Device<rusb::Context>) -> Result<Option<String>> {
    let read = || -> rusb::Result<String> {
        let descriptor = device.device_descriptor()?;
        let handle = device.open()?;
        handle.read_serial_number_string_ascii(&descriptor)
    };

    match read() {
        Ok(serial) => Ok(Some(serial)),
        Err(error @ rusb::Error::Access)
        | Err(error @ rusb::Error::NoDevice)
        | Err(error @ rusb::Error::Busy) => {
            log::debug!(
                "Skipping device at bus {} address {}: {}",
                device.bus_number(),
                device.address(),
                error
            );
            Ok(None)
        }
        Err(error) => Err(error.into()),
    }
}

/// Turns the decoded version from a device descriptor back into the raw BCD value.
fn bcd_version(version: rusb::Version) -> u16 {
    let major = u16::from(version.major());
    let minor = u16::from(version.minor());
    let sub_minor = u16::from(version.sub_minor());
    (major / 10) << 12 | (major % 10) << 8 | minor << 4 | sub_minor
}

/// Selects one device out of a list: the one with the given serial number, or the only one if
/// no serial number is given.
fn pick<D>(devices: Vec<D>, serial: Option<&str>, serial_of: fn(&D) -> &str) -> Result<D> {
    if devices.is_empty() {
        Err(Error::NotFound)
    } else if let Some(serial) = serial {
        devices
            .into_iter()
            .find(|device| serial_of(device) == serial)
            .ok_or(Error::NotFound)
    } else if devices.len() == 1 {
        devices.into_iter().next().ok_or(Error::NotFound)
    } else {
        // More than one device and no serial given
        Err(Error::TooManyMatches)
    }
}

impl Context {
    pub fn new() -> Result<Self> {
        let usb_context = rusb::Context::new()?;
        Ok(Context { usb_context })
    }

    /// Visits every connected device whose USB IDs `classify` recognizes and that is ready to
    /// be opened.
    fn scan<K, D>(
        &mut self,
        classify: impl Fn(u16, u16) -> Option<K>,
        mut build: impl FnMut(Device<rusb::Context>, K, String, u16) -> D,
    ) -> Result<Vec<D>> {
        let mut found = Vec::new();

        for device in self.usb_context.devices()?.iter() {
            let descriptor = device.device_descriptor()?;
            let kind = match classify(descriptor.vendor_id(), descriptor.product_id()) {
                Some(kind) => kind,
                None => continue,
            };

            if let Some(serial) = ready_serial_number(&device)? {
                log::debug!(
                    "Found {:04x}:{:04x} with serial number {}",
                    descriptor.vendor_id(),
                    descriptor.product_id(),
                    serial
                );
                let version = bcd_version(descriptor.device_version());
                found.push(build(device, kind, serial, version));
            }
        }

        Ok(found)
    }

    /// Lists the Tic controllers running their native firmware.
    pub fn list_tics(&mut self) -> Result<Vec<TicDevice>> {
        self.scan(Product::from_usb_id, |device, product, serial, version| {
            TicDevice::new(device, product, serial, version)
        })
    }

    /// Lists the devices currently running a known bootloader.
    pub fn list_bootloaders(&mut self) -> Result<Vec<BootloaderInstance>> {
        self.scan(BootloaderType::lookup, |device, kind, serial, _| {
            BootloaderInstance::new(device, kind, serial)
        })
    }

    /// Lists the running applications that can be restarted into a bootloader.
    pub fn list_apps(&mut self) -> Result<Vec<AppInstance>> {
        self.scan(AppType::lookup, |device, app_type, serial, _| {
            AppInstance::new(device, app_type, serial)
        })
    }

    pub fn pick_tic(&mut self, serial: Option<&str>) -> Result<TicDevice> {
        pick(self.list_tics()?, serial, TicDevice::serial_number)
    }

    pub fn pick_bootloader(&mut self, serial: Option<&str>) -> Result<BootloaderInstance> {
        pick(
            self.list_bootloaders()?,
            serial,
            BootloaderInstance::serial_number,
        )
    }
}

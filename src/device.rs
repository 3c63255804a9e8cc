//! Connected devices found by [`Context`](crate::Context), ready to be opened.

use crate::bootloader::{AppType, BootloaderType, Session, REQUEST_START_BOOTLOADER};
use crate::error::{Error, Result};
use crate::handle::TicHandle;
use crate::product::Product;
use crate::transport::{Transport, UsbTransport, REQUEST_TYPE_OUT};
use rusb::Device;

/// Opens a device and claims the interface the requests go to.
fn open_interface(
    device: &Device<rusb::Context>,
    interface_number: u8,
) -> Result<UsbTransport<rusb::Context>> {
    let mut handle = device.open()?;
    handle.claim_interface(interface_number)?;
    Ok(UsbTransport::new(handle))
}

/// A Tic controller running its native firmware.
pub struct TicDevice {
    device: Device<rusb::Context>,
    product: Product,
    serial_number: String,
    firmware_version: u16,
}

impl TicDevice {
    pub(crate) fn new(
        device: Device<rusb::Context>,
        product: Product,
        serial_number: String,
        firmware_version: u16,
    ) -> Self {
        Self {
            device,
            product,
            serial_number,
            firmware_version,
        }
    }

    pub fn product(&self) -> Product {
        self.product
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Firmware version in BCD, e.g. 0x0104 for 1.04.
    pub fn firmware_version(&self) -> u16 {
        self.firmware_version
    }

    /// Connects to the controller. Fails if its firmware is newer than this crate supports.
    pub fn open(&self) -> Result<TicHandle<UsbTransport<rusb::Context>>> {
        let transport = open_interface(&self.device, 0)?;
        TicHandle::new(transport, self.product, self.firmware_version)
    }
}

/// A device currently running a p-load bootloader.
pub struct BootloaderInstance {
    device: Device<rusb::Context>,
    kind: &'static BootloaderType,
    serial_number: String,
}

impl BootloaderInstance {
    pub(crate) fn new(
        device: Device<rusb::Context>,
        kind: &'static BootloaderType,
        serial_number: String,
    ) -> Self {
        Self {
            device,
            kind,
            serial_number,
        }
    }

    pub fn kind(&self) -> &'static BootloaderType {
        self.kind
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn usb_vendor_id(&self) -> u16 {
        self.kind.usb_vendor_id
    }

    pub fn usb_product_id(&self) -> u16 {
        self.kind.usb_product_id
    }

    /// Connects to the bootloader and starts a session in the idle state.
    pub fn open(&self) -> Result<Session<UsbTransport<rusb::Context>>> {
        let transport = open_interface(&self.device, 0)?;
        log::debug!("Opened {} ({})", self.kind, self.serial_number);
        Ok(Session::new(transport, self.kind))
    }
}

/// A running application that knows how to restart into its bootloader.
pub struct AppInstance {
    device: Device<rusb::Context>,
    app_type: &'static AppType,
    serial_number: String,
}

impl AppInstance {
    pub(crate) fn new(
        device: Device<rusb::Context>,
        app_type: &'static AppType,
        serial_number: String,
    ) -> Self {
        Self {
            device,
            app_type,
            serial_number,
        }
    }

    pub fn app_type(&self) -> &'static AppType {
        self.app_type
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Bootloaders this application may show up as after [`launch_bootloader`].
    ///
    /// [`launch_bootloader`]: #method.launch_bootloader
    pub fn bootloader_types(&self) -> impl Iterator<Item = &'static BootloaderType> + '_ {
        BootloaderType::all().iter().copied().filter(move |kind| {
            kind.usb_vendor_id == self.app_type.usb_vendor_id
                && kind
                    .matching_app_product_ids
                    .contains(&self.app_type.usb_product_id)
        })
    }

    /// Asks the application to restart into its bootloader. The device re-enumerates with a
    /// different product ID, so it has to be looked up again with
    /// [`Context::list_bootloaders`](crate::Context::list_bootloaders).
    pub fn launch_bootloader(&self) -> Result<()> {
        let mut transport = open_interface(&self.device, self.app_type.interface_number)?;
        transport
            .write_control(REQUEST_TYPE_OUT, REQUEST_START_BOOTLOADER, 0, 0, &[])
            .map_err(|source| Error::Transfer {
                context: "Failed to start bootloader",
                source,
            })?;
        log::info!(
            "Restarted {} ({}) into its bootloader",
            self.app_type.name,
            self.serial_number
        );
        Ok(())
    }
}

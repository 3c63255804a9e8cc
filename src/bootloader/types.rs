//! Compiled-in descriptions of the bootloaders and native applications this crate can talk to.

use crate::error::{Error, Result};
use crate::product::USB_VENDOR_ID_POLOLU;
use std::fmt;
use std::ops::Range;

/// Length of the code some bootloaders need to see before they accept an upload.
pub const DEVICE_CODE_SIZE: usize = 16;

/// How the bootloader interprets the data written to flash.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UploadType {
    Standard = 0,
    DeviceSpecific = 1,
    Plain = 2,
}

impl UploadType {
    /// Value sent with the initialize request.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Name used for the `uploadType` attribute in firmware archives.
    pub fn name(self) -> &'static str {
        match self {
            UploadType::Standard => "Standard",
            UploadType::DeviceSpecific => "DeviceSpecific",
            UploadType::Plain => "Plain",
        }
    }

    pub fn from_name(name: &str) -> Option<UploadType> {
        match name {
            "Standard" => Some(UploadType::Standard),
            "DeviceSpecific" => Some(UploadType::DeviceSpecific),
            "Plain" => Some(UploadType::Plain),
            _ => None,
        }
    }
}

impl Default for UploadType {
    fn default() -> Self {
        UploadType::Standard
    }
}

/// Memories an erase or read request applies to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemorySet {
    All,
    Flash,
    Eeprom,
}

/// A native USB application that can be asked to restart into its bootloader.
#[derive(Debug, Eq, PartialEq)]
pub struct AppType {
    pub usb_vendor_id: u16,
    pub usb_product_id: u16,
    pub name: &'static str,

    /// The device has more than one interface.
    pub composite: bool,

    /// Interface the "start bootloader" request is sent to.
    pub interface_number: u8,
}

static APP_TYPES: &[AppType] = &[
    AppType {
        usb_vendor_id: USB_VENDOR_ID_POLOLU,
        usb_product_id: 0x00B0,
        name: "Pololu USB AVR Programmer v2",
        composite: true,
        interface_number: 0,
    },
    AppType {
        usb_vendor_id: USB_VENDOR_ID_POLOLU,
        usb_product_id: 0x00B3,
        name: "Tic T825 Stepper Motor Controller",
        composite: false,
        interface_number: 0,
    },
    AppType {
        usb_vendor_id: USB_VENDOR_ID_POLOLU,
        usb_product_id: 0x00B5,
        name: "Tic T834 Stepper Motor Controller",
        composite: false,
        interface_number: 0,
    },
    AppType {
        usb_vendor_id: USB_VENDOR_ID_POLOLU,
        usb_product_id: 0x00BD,
        name: "Tic T500 Stepper Motor Controller",
        composite: false,
        interface_number: 0,
    },
];

impl AppType {
    pub fn all() -> &'static [AppType] {
        APP_TYPES
    }

    pub fn lookup(usb_vendor_id: u16, usb_product_id: u16) -> Option<&'static AppType> {
        APP_TYPES
            .iter()
            .find(|t| t.usb_vendor_id == usb_vendor_id && t.usb_product_id == usb_product_id)
    }
}

/// Static description of a bootloader model and what it can do.
///
/// Addresses are the ones used in USB requests unless noted otherwise.
#[derive(Debug, Eq, PartialEq)]
pub struct BootloaderType {
    pub usb_vendor_id: u16,
    pub usb_product_id: u16,

    /// Same as the USB product string.
    pub name: &'static str,
    pub short_name: &'static str,

    /// Address of the first byte of the application.
    pub app_address: u32,

    /// Size of the application region in bytes.
    pub app_size: u32,

    /// Number of bytes that have to be written to flash at once.
    pub write_block_size: u16,

    pub erasing_flash_affects_eeprom: bool,
    pub supports_flash_plain_writing: bool,
    pub supports_flash_reading: bool,

    pub eeprom_address: u32,

    /// Address of the first EEPROM byte as it appears in firmware images.
    pub eeprom_address_hex_file: u32,

    /// Nonzero for every device with EEPROM, even when the bootloader cannot access it.
    pub eeprom_size: u32,
    pub supports_eeprom_access: bool,

    pub device_code: Option<[u8; DEVICE_CODE_SIZE]>,

    /// Product ids of the applications that can be restarted into this bootloader.
    pub matching_app_product_ids: &'static [u16],
}

/// The bootloader of the Tic T825.
pub static TIC_T825_BOOTLOADER: BootloaderType = BootloaderType {
    usb_vendor_id: USB_VENDOR_ID_POLOLU,
    usb_product_id: 0x00B2,
    name: "Tic T825 Bootloader",
    short_name: "T825 bootloader",
    app_address: 0x2000,
    app_size: 0x6000,
    write_block_size: 0x40,
    erasing_flash_affects_eeprom: true,
    supports_flash_plain_writing: false,
    supports_flash_reading: false,
    eeprom_address: 0,
    eeprom_address_hex_file: 0xF0_0000,
    eeprom_size: 0x100,
    supports_eeprom_access: true,
    device_code: None,
    matching_app_product_ids: &[0x00B3],
};

static BOOTLOADER_TYPES: &[&BootloaderType] = &[&TIC_T825_BOOTLOADER];

impl BootloaderType {
    pub fn all() -> &'static [&'static BootloaderType] {
        BOOTLOADER_TYPES
    }

    pub fn lookup(usb_vendor_id: u16, usb_product_id: u16) -> Option<&'static BootloaderType> {
        BOOTLOADER_TYPES
            .iter()
            .copied()
            .find(|t| t.usb_vendor_id == usb_vendor_id && t.usb_product_id == usb_product_id)
    }

    /// Applications worth restarting before writing to this bootloader.
    pub fn matching_app_types(&self) -> impl Iterator<Item = &'static AppType> + '_ {
        self.matching_app_product_ids
            .iter()
            .filter_map(move |&id| AppType::lookup(self.usb_vendor_id, id))
    }

    /// Address range of the application flash.
    pub fn app_range(&self) -> Range<u32> {
        self.app_address..self.app_address + self.app_size
    }

    /// Address range that firmware images use for EEPROM contents.
    pub fn eeprom_hex_file_range(&self) -> Range<u32> {
        self.eeprom_address_hex_file..self.eeprom_address_hex_file + self.eeprom_size
    }

    /// Upload type to use when the caller has no image telling otherwise.
    pub fn default_upload_type(&self) -> UploadType {
        if self.supports_flash_plain_writing {
            UploadType::Plain
        } else {
            UploadType::Standard
        }
    }

    pub fn includes_flash(&self, memories: MemorySet) -> bool {
        matches!(memories, MemorySet::All | MemorySet::Flash)
    }

    /// `All` only covers EEPROM on bootloaders that can access it.
    pub fn includes_eeprom(&self, memories: MemorySet) -> bool {
        match memories {
            MemorySet::Eeprom => true,
            MemorySet::All => self.supports_eeprom_access,
            MemorySet::Flash => false,
        }
    }

    pub fn ensure_reading(&self, memories: MemorySet) -> Result<()> {
        if self.includes_flash(memories) {
            self.ensure_flash_reading()?;
        }
        if self.includes_eeprom(memories) {
            self.ensure_eeprom_access()?;
        }
        Ok(())
    }

    pub fn ensure_erasing(&self, memories: MemorySet) -> Result<()> {
        match memories {
            // Every bootloader can erase everything.
            MemorySet::All => Ok(()),
            MemorySet::Flash if self.erasing_flash_affects_eeprom => Err(Error::Unsupported(
                "This bootloader does not support erasing flash without affecting EEPROM.",
            )),
            MemorySet::Flash => Ok(()),
            MemorySet::Eeprom => self.ensure_eeprom_access(),
        }
    }

    pub fn ensure_eeprom_access(&self) -> Result<()> {
        if self.eeprom_size == 0 {
            return Err(Error::Unsupported("This device does not have EEPROM."));
        }
        if !self.supports_eeprom_access {
            return Err(Error::Unsupported(
                "This bootloader does not support accessing EEPROM.",
            ));
        }
        Ok(())
    }

    pub fn ensure_flash_reading(&self) -> Result<()> {
        if self.supports_flash_reading {
            Ok(())
        } else {
            Err(Error::Unsupported(
                "This bootloader does not support reading flash memory.",
            ))
        }
    }

    pub fn ensure_flash_plain_writing(&self) -> Result<()> {
        if self.supports_flash_plain_writing {
            Ok(())
        } else {
            Err(Error::Unsupported(
                "This bootloader is not compatible with writing plain data to flash.",
            ))
        }
    }
}

impl fmt::Display for BootloaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bootloader: {}", self.name)?;
        writeln!(
            f,
            "USB ID: {:04x}:{:04x}",
            self.usb_vendor_id, self.usb_product_id
        )?;
        writeln!(
            f,
            "Application flash: 0x{:06x}, {} bytes",
            self.app_address, self.app_size
        )?;
        writeln!(f, "EEPROM: {} bytes", self.eeprom_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        let bootloader = BootloaderType::lookup(0x1FFB, 0x00B2).unwrap();
        assert_eq!(bootloader.name, "Tic T825 Bootloader");
        assert_eq!(bootloader.app_range(), 0x2000..0x8000);
        assert_eq!(bootloader.eeprom_hex_file_range(), 0xF0_0000..0xF0_0100);
        assert!(BootloaderType::lookup(0x1FFB, 0x00B3).is_none());

        let apps: Vec<_> = bootloader.matching_app_types().collect();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "Tic T825 Stepper Motor Controller");

        let programmer = AppType::lookup(0x1FFB, 0x00B0).unwrap();
        assert!(programmer.composite);
        assert!(AppType::lookup(0x1234, 0x00B0).is_none());
    }

    #[test]
    fn upload_types() {
        assert_eq!(UploadType::from_name("DeviceSpecific"), Some(UploadType::DeviceSpecific));
        assert_eq!(UploadType::from_name("plain"), None);
        assert_eq!(UploadType::Plain.code(), 2);
        assert_eq!(TIC_T825_BOOTLOADER.default_upload_type(), UploadType::Standard);
    }

    #[test]
    fn capability_checks() {
        let tic = &TIC_T825_BOOTLOADER;
        assert!(tic.ensure_erasing(MemorySet::All).is_ok());
        assert!(tic.ensure_erasing(MemorySet::Eeprom).is_ok());
        assert_eq!(
            tic.ensure_erasing(MemorySet::Flash).unwrap_err().to_string(),
            "This bootloader does not support erasing flash without affecting EEPROM."
        );
        assert_eq!(
            tic.ensure_reading(MemorySet::All).unwrap_err().to_string(),
            "This bootloader does not support reading flash memory."
        );
        assert!(tic.ensure_reading(MemorySet::Eeprom).is_ok());
        assert!(tic.ensure_flash_plain_writing().is_err());

        let no_eeprom = BootloaderType {
            eeprom_size: 0,
            supports_eeprom_access: false,
            ..TIC_T825_BOOTLOADER
        };
        assert!(!no_eeprom.includes_eeprom(MemorySet::All));
        assert_eq!(
            no_eeprom.ensure_eeprom_access().unwrap_err().to_string(),
            "This device does not have EEPROM."
        );
    }
}

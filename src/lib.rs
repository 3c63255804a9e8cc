//! This crate talks to Tic stepper motor controllers and to devices running the p-load USB
//! bootloader. It reads, checks and writes the controller's non-volatile settings and upgrades
//! firmware from `.fmi` firmware archives.
//!
//! # Example: Changing a setting
//! ```rust, no_run
//! use tic_usb::settings::StepMode;
//! use tic_usb::Context;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut context = Context::new()?;
//! let mut tic = context.pick_tic(None)?.open()?;
//! println!("Firmware version {}", tic.firmware_version_string());
//!
//! let mut settings = tic.get_settings()?;
//! settings.step_mode = StepMode::MICROSTEP8;
//! for warning in settings.fix().iter() {
//!     println!("{}", warning);
//! }
//!
//! tic.set_settings(&settings)?;
//! tic.reinitialize()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Upgrading firmware
//! ```rust, no_run
//! use tic_usb::archive::Archive;
//! use tic_usb::Context;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let archive = Archive::from_file("tic_t825.fmi")?;
//! let mut context = Context::new()?;
//! let bootloader = context.pick_bootloader(None)?;
//! let image = archive
//!     .find_image(bootloader.usb_vendor_id(), bootloader.usb_product_id())
//!     .ok_or("This archive is not meant for the connected device.")?;
//!
//! let mut session = bootloader.open()?;
//! session.apply_image(image)?;
//! session.restart()?;
//! # Ok(())
//! # }
//! ```
//!
//! Long-running bootloader steps report their progress to a
//! [`StatusListener`](bootloader::StatusListener). See the [`bootloader`] module for details.

pub mod archive;
pub mod bootloader;
mod context;
mod device;
mod error;
mod handle;
mod product;
pub mod settings;
pub mod transport;

pub use context::Context;
pub use device::{AppInstance, BootloaderInstance, TicDevice};
pub use error::{ArchiveError, ArchiveErrorKind, DeviceError, Error, Result, TransferError};
pub use handle::{TicHandle, FIRMWARE_VERSION_MAJOR_MAX};
pub use product::{Product, ProductInfo, USB_VENDOR_ID_POLOLU};

/// Default timeout for a single USB control transfer.
const TIMEOUT: std::time::Duration = std::time::Duration::from_millis(300);

//! Firmware upgrades through the p-load USB bootloader.
//!
//! [`BootloaderHandle`] sends individual requests and hands out [`Operation`]s for the
//! multi-step ones. [`Session`] sequences them into a checked upgrade and reports progress to
//! a [`StatusListener`].

mod handle;
mod operation;
mod session;
mod types;

pub use handle::{BootloaderHandle, EEPROM_CHUNK_SIZE, FLASH_READ_CHUNK_SIZE};
pub use operation::{Chunk, EraseFlash, Memory, Operation, Program, Read, StatusListener};
pub use session::{Session, SessionState};
pub use types::{
    AppType, BootloaderType, MemorySet, UploadType, DEVICE_CODE_SIZE, TIC_T825_BOOTLOADER,
};

/// Request a running native application accepts to restart into its bootloader.
pub(crate) const REQUEST_START_BOOTLOADER: u8 = 0xFF;

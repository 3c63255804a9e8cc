use super::operation::{Chunk, EraseFlash, Memory, Program, Read};
use super::types::{BootloaderType, UploadType};
use crate::archive::Image;
use crate::error::{DeviceError, Error, Result, TransferError};
use crate::transport::{Transport, TransferOutcome, REQUEST_TYPE_IN, REQUEST_TYPE_OUT};

pub(crate) const REQUEST_INITIALIZE: u8 = 0x80;
pub(crate) const REQUEST_ERASE_FLASH: u8 = 0x81;
pub(crate) const REQUEST_WRITE_FLASH_BLOCK: u8 = 0x82;
pub(crate) const REQUEST_GET_LAST_ERROR: u8 = 0x83;
pub(crate) const REQUEST_CHECK_APPLICATION: u8 = 0x84;
pub(crate) const REQUEST_READ_FLASH: u8 = 0x86;
pub(crate) const REQUEST_SET_DEVICE_CODE: u8 = 0x87;
pub(crate) const REQUEST_READ_EEPROM: u8 = 0x88;
pub(crate) const REQUEST_WRITE_EEPROM: u8 = 0x89;
pub(crate) const REQUEST_RESTART: u8 = 0xFE;

/// Bytes per READ_FLASH request.
pub const FLASH_READ_CHUNK_SIZE: usize = 1024;

/// Bytes per EEPROM read or write request.
pub const EEPROM_CHUNK_SIZE: usize = 32;

/// Time the bootloader waits before restarting, in milliseconds.
const RESTART_DELAY_MS: u16 = 100;

/// Splits an address into the wValue and wIndex of a request.
fn split_address(address: u32) -> (u16, u16) {
    ((address & 0xFFFF) as u16, (address >> 16) as u16)
}

/// Raw access to a device running a p-load bootloader.
///
/// Requests are sent as they are asked for; keeping them in a sensible order is up to the
/// caller (see [`Session`](super::Session) for a checked sequence).
pub struct BootloaderHandle<T: Transport> {
    transport: T,
    kind: &'static BootloaderType,
}

impl<T: Transport> BootloaderHandle<T> {
    pub fn new(transport: T, kind: &'static BootloaderType) -> Self {
        Self { transport, kind }
    }

    pub fn kind(&self) -> &'static BootloaderType {
        self.kind
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Prepares the bootloader for an upload of the given type, sending the device code first
    /// if the model needs one.
    pub fn initialize(&mut self, upload_type: UploadType) -> Result<()> {
        if let Some(code) = self.kind.device_code {
            self.transport
                .write_control(REQUEST_TYPE_OUT, REQUEST_SET_DEVICE_CODE, 0, 0, &code)
                .map_err(|source| Error::Transfer {
                    context: "Failed to send device code",
                    source,
                })?;
        }

        self.transport
            .write_control(
                REQUEST_TYPE_OUT,
                REQUEST_INITIALIZE,
                upload_type.code(),
                0,
                &[],
            )
            .map_err(|source| Error::Transfer {
                context: "Failed to initialize bootloader",
                source,
            })?;
        Ok(())
    }

    /// Erases the application flash.
    pub fn erase_flash(&mut self) -> EraseFlash<'_, T> {
        EraseFlash::new(self)
    }

    /// Sends one erase request and returns how much work the device has left.
    pub(crate) fn erase_step(&mut self) -> Result<u8> {
        let mut response = [0u8; 2];
        let transferred = self
            .transport
            .read_control(REQUEST_TYPE_IN, REQUEST_ERASE_FLASH, 0, 0, &mut response)
            .map_err(|source| Error::Transfer {
                context: "Failed to erase flash",
                source,
            })?;
        if transferred != response.len() {
            return Err(Error::TransferLength {
                context: "erasing flash",
                expected: response.len(),
                actual: transferred,
            });
        }

        match response {
            [0, remaining] => Ok(remaining),
            [code, _] => Err(Error::Device {
                context: "Error erasing page",
                error: DeviceError::from(code),
            }),
        }
    }

    /// Writes one block of exactly `write_block_size` bytes.
    pub(crate) fn write_flash_block(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let (value, index) = split_address(address);
        self.write_checked(
            REQUEST_WRITE_FLASH_BLOCK,
            value,
            index,
            data,
            "Failed to write flash",
            "writing flash",
        )
    }

    pub(crate) fn write_eeprom_block(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.kind.ensure_eeprom_access()?;
        let (value, index) = split_address(address);
        self.write_checked(
            REQUEST_WRITE_EEPROM,
            value,
            index,
            data,
            "Failed to write EEPROM",
            "writing EEPROM",
        )
    }

    pub(crate) fn read_flash_block(&mut self, address: u32, buffer: &mut [u8]) -> Result<()> {
        let (value, index) = split_address(address);
        self.read_exact(REQUEST_READ_FLASH, value, index, buffer, "reading flash")
    }

    pub(crate) fn read_eeprom_block(&mut self, address: u32, buffer: &mut [u8]) -> Result<()> {
        let (value, index) = split_address(address);
        self.read_exact(REQUEST_READ_EEPROM, value, index, buffer, "reading EEPROM")
    }

    /// Blanks the first EEPROM byte so the new firmware knows its settings are stale.
    pub fn erase_eeprom_first_byte(&mut self) -> Result<()> {
        self.write_eeprom_block(self.kind.eeprom_address, &[0xFF])
    }

    /// Plans the writes for a firmware image without sending anything.
    ///
    /// Blocks holding only 0xFF are skipped. Flash blocks are split into `write_block_size`
    /// chunks, padding the last one with 0xFF; blocks inside the EEPROM range of the hex file
    /// go to EEPROM when the bootloader can write it. Every block is checked before a chunk is
    /// produced.
    pub fn plan_image(&self, image: &Image) -> Result<Vec<Chunk>> {
        let kind = self.kind;
        let app = kind.app_range();
        let eeprom = kind.eeprom_hex_file_range();
        let block_size = usize::from(kind.write_block_size);
        let mut chunks = Vec::new();

        for block in &image.blocks {
            let in_app = app.start <= block.address && block.end() <= u64::from(app.end);
            let in_eeprom = kind.supports_eeprom_access
                && eeprom.start <= block.address
                && block.end() <= u64::from(eeprom.end);

            if in_app {
                if block.address % u32::from(kind.write_block_size) != 0 {
                    return Err(Error::InvalidRequest(format!(
                        "Block at 0x{:06x} is not aligned to the write block size.",
                        block.address
                    )));
                }
                if block.is_blank() {
                    continue;
                }
                for (i, data) in block.data.chunks(block_size).enumerate() {
                    let mut data = data.to_vec();
                    data.resize(block_size, 0xFF);
                    chunks.push(Chunk {
                        memory: Memory::Flash,
                        address: block.address + (i * block_size) as u32,
                        data,
                    });
                }
            } else if in_eeprom {
                if block.is_blank() {
                    continue;
                }
                let start = kind.eeprom_address + (block.address - eeprom.start);
                for (i, data) in block.data.chunks(EEPROM_CHUNK_SIZE).enumerate() {
                    chunks.push(Chunk {
                        memory: Memory::Eeprom,
                        address: start + (i * EEPROM_CHUNK_SIZE) as u32,
                        data: data.to_vec(),
                    });
                }
            } else {
                return Err(Error::InvalidRequest(format!(
                    "Block at 0x{:06x} with {} bytes is outside of the writable memory.",
                    block.address,
                    block.data.len()
                )));
            }
        }

        Ok(chunks)
    }

    /// Writes a firmware image. Flash must have been erased.
    pub fn write_image(&mut self, image: &Image) -> Result<Program<'_, T>> {
        let chunks = self.plan_image(image)?;
        Ok(Program::new(self, chunks, "Writing flash..."))
    }

    /// Writes a plain image of the whole application region, from the top down, skipping
    /// blank blocks.
    pub fn write_flash_plain(&mut self, image: &[u8]) -> Result<Program<'_, T>> {
        let kind = self.kind;
        kind.ensure_flash_plain_writing()?;
        if image.len() != kind.app_size as usize {
            return Err(Error::InvalidRequest(format!(
                "The flash image has {} bytes but the application region has {}.",
                image.len(),
                kind.app_size
            )));
        }

        let chunks = image
            .chunks(usize::from(kind.write_block_size))
            .enumerate()
            .rev()
            .filter(|(_, data)| data.iter().any(|&b| b != 0xFF))
            .map(|(i, data)| {
                let mut data = data.to_vec();
                data.resize(usize::from(kind.write_block_size), 0xFF);
                Chunk {
                    memory: Memory::Flash,
                    address: kind.app_address + (i * usize::from(kind.write_block_size)) as u32,
                    data,
                }
            })
            .collect();
        Ok(Program::new(self, chunks, "Writing flash..."))
    }

    /// Reads the whole application region into `buffer`, which must be `app_size` bytes.
    pub fn read_flash<'d>(&mut self, buffer: &'d mut [u8]) -> Result<Read<'_, 'd, T>> {
        let kind = self.kind;
        kind.ensure_flash_reading()?;
        if buffer.len() != kind.app_size as usize {
            return Err(Error::InvalidRequest(format!(
                "The buffer has {} bytes but the application region has {}.",
                buffer.len(),
                kind.app_size
            )));
        }
        Ok(Read::new(
            self,
            Memory::Flash,
            kind.app_address,
            buffer,
            FLASH_READ_CHUNK_SIZE,
        ))
    }

    /// Reads the whole EEPROM into `buffer`, which must be `eeprom_size` bytes.
    pub fn read_eeprom<'d>(&mut self, buffer: &'d mut [u8]) -> Result<Read<'_, 'd, T>> {
        let kind = self.kind;
        kind.ensure_eeprom_access()?;
        if buffer.len() != kind.eeprom_size as usize {
            return Err(Error::InvalidRequest(format!(
                "The buffer has {} bytes but the EEPROM has {}.",
                buffer.len(),
                kind.eeprom_size
            )));
        }
        Ok(Read::new(
            self,
            Memory::Eeprom,
            kind.eeprom_address,
            buffer,
            EEPROM_CHUNK_SIZE,
        ))
    }

    /// Writes the whole EEPROM. An image of only 0xFF is reported as an erase.
    pub fn write_eeprom(&mut self, image: &[u8]) -> Result<Program<'_, T>> {
        let kind = self.kind;
        kind.ensure_eeprom_access()?;
        if image.len() != kind.eeprom_size as usize {
            return Err(Error::InvalidRequest(format!(
                "The EEPROM image has {} bytes but the EEPROM has {}.",
                image.len(),
                kind.eeprom_size
            )));
        }

        let label = if image.iter().all(|&b| b == 0xFF) {
            "Erasing EEPROM..."
        } else {
            "Writing EEPROM..."
        };
        let chunks = image
            .chunks(EEPROM_CHUNK_SIZE)
            .enumerate()
            .map(|(i, data)| Chunk {
                memory: Memory::Eeprom,
                address: kind.eeprom_address + (i * EEPROM_CHUNK_SIZE) as u32,
                data: data.to_vec(),
            })
            .collect();
        Ok(Program::new(self, chunks, label))
    }

    /// Asks whether the application currently in flash is valid.
    pub fn check_application(&mut self) -> Result<bool> {
        let mut response = [0u8];
        self.read_exact(
            REQUEST_CHECK_APPLICATION,
            0,
            0,
            &mut response,
            "checking application",
        )?;
        Ok(response[0] != 0)
    }

    /// Makes the device reset and start its application.
    pub fn restart(&mut self) -> Result<()> {
        self.transport
            .write_control(REQUEST_TYPE_OUT, REQUEST_RESTART, RESTART_DELAY_MS, 0, &[])
            .map_err(|source| Error::Transfer {
                context: "Failed to restart device",
                source,
            })?;
        Ok(())
    }

    fn read_exact(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        buffer: &mut [u8],
        context: &'static str,
    ) -> Result<()> {
        let transferred = self
            .transport
            .read_control(REQUEST_TYPE_IN, request, value, index, buffer)
            .map_err(|source| Error::Transfer { context, source })?;
        if transferred != buffer.len() {
            return Err(Error::TransferLength {
                context,
                expected: buffer.len(),
                actual: transferred,
            });
        }
        Ok(())
    }

    /// Sends a write request. A stalled request is followed by a GET_LAST_ERROR request so
    /// the error can say what the device did not like.
    fn write_checked(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        context: &'static str,
        length_context: &'static str,
    ) -> Result<()> {
        let outcome = TransferOutcome::from(self.transport.write_control(
            REQUEST_TYPE_OUT,
            request,
            value,
            index,
            data,
        ));
        match outcome {
            TransferOutcome::Done(transferred) if transferred == data.len() => Ok(()),
            TransferOutcome::Done(transferred) => Err(Error::TransferLength {
                context: length_context,
                expected: data.len(),
                actual: transferred,
            }),
            TransferOutcome::Stalled => Err(self.last_error(context)),
            TransferOutcome::Failed(source) => Err(Error::Transfer { context, source }),
        }
    }

    /// Turns a stall into the error the device reports, or keeps the stall if it cannot.
    fn last_error(&mut self, context: &'static str) -> Error {
        let mut code = [0u8];
        match self
            .transport
            .read_control(REQUEST_TYPE_IN, REQUEST_GET_LAST_ERROR, 0, 0, &mut code)
        {
            Ok(1) => Error::Device {
                context,
                error: DeviceError::from(code[0]),
            },
            other => {
                log::warn!("could not get the last error after a stall: {:?}", other);
                Error::Transfer {
                    context,
                    source: TransferError::Stall,
                }
            }
        }
    }
}

use super::handle::BootloaderHandle;
use crate::error::Result;
use crate::transport::Transport;
use std::slice::ChunksMut;

/// Receives progress updates while a multi-step operation runs.
///
/// Closures taking `(status, completed, total)` implement this trait.
pub trait StatusListener {
    fn set_status(&mut self, status: &str, completed: u32, total: u32);
}

impl<F: FnMut(&str, u32, u32)> StatusListener for F {
    fn set_status(&mut self, status: &str, completed: u32, total: u32) {
        self(status, completed, total)
    }
}

/// A multi-step bootloader operation.
///
/// Each step yields the amount of work completed so far, out of [`total`](Operation::total).
/// The iterator is fused after the first error.
pub trait Operation: Iterator<Item = Result<u32>> {
    /// Amount of work the operation consists of. Can grow while an erase is running because
    /// the bootloader does not say up front how much there is to do.
    fn total(&self) -> u32;

    /// Status message to show while the operation runs.
    fn label(&self) -> &'static str;

    /// Runs the operation to completion.
    fn execute(&mut self) -> Result<()> {
        for step in self {
            step?;
        }
        Ok(())
    }

    /// Runs the operation to completion, reporting every step.
    fn execute_with(&mut self, listener: &mut dyn StatusListener) -> Result<()> {
        while let Some(step) = self.next() {
            let completed = step?;
            listener.set_status(self.label(), completed, self.total());
        }
        Ok(())
    }
}

/// Memory a write or read goes to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Memory {
    Flash,
    Eeprom,
}

/// One write request, with the address as used on the wire.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Chunk {
    pub memory: Memory,
    pub address: u32,
    pub data: Vec<u8>,
}

/// Erases the application flash.
pub struct EraseFlash<'a, T: Transport> {
    handle: &'a mut BootloaderHandle<T>,
    max: u32,
    done: bool,
}

impl<'a, T: Transport> EraseFlash<'a, T> {
    pub(crate) fn new(handle: &'a mut BootloaderHandle<T>) -> Self {
        Self {
            handle,
            max: 0,
            done: false,
        }
    }
}

impl<T: Transport> Operation for EraseFlash<'_, T> {
    fn total(&self) -> u32 {
        self.max
    }

    fn label(&self) -> &'static str {
        "Erasing flash..."
    }
}

impl<T: Transport> Iterator for EraseFlash<'_, T> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        Some(match self.handle.erase_step() {
            Ok(remaining) => {
                let remaining = u32::from(remaining);
                if remaining >= self.max {
                    self.max = remaining + 1;
                }
                if remaining == 0 {
                    self.done = true;
                }
                Ok(self.max - remaining)
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        })
    }
}

/// Writes a planned list of chunks to flash or EEPROM, in order.
pub struct Program<'a, T: Transport> {
    handle: &'a mut BootloaderHandle<T>,
    chunks: std::vec::IntoIter<Chunk>,
    label: &'static str,
    completed: u32,
    total: u32,
    done: bool,
}

impl<'a, T: Transport> Program<'a, T> {
    pub(crate) fn new(
        handle: &'a mut BootloaderHandle<T>,
        chunks: Vec<Chunk>,
        label: &'static str,
    ) -> Self {
        let total = chunks.iter().map(|c| c.data.len() as u32).sum();
        Self {
            handle,
            done: chunks.is_empty(),
            chunks: chunks.into_iter(),
            label,
            completed: 0,
            total,
        }
    }
}

impl<T: Transport> Operation for Program<'_, T> {
    fn total(&self) -> u32 {
        self.total
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

impl<T: Transport> Iterator for Program<'_, T> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let chunk = match self.chunks.next() {
            Some(chunk) => chunk,
            None => {
                self.done = true;
                return None;
            }
        };

        let result = match chunk.memory {
            Memory::Flash => self.handle.write_flash_block(chunk.address, &chunk.data),
            Memory::Eeprom => self.handle.write_eeprom_block(chunk.address, &chunk.data),
        };
        Some(match result {
            Ok(()) => {
                self.completed += chunk.data.len() as u32;
                Ok(self.completed)
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        })
    }
}

/// Reads a memory region into a buffer in fixed-size chunks.
pub struct Read<'a, 'd, T: Transport> {
    handle: &'a mut BootloaderHandle<T>,
    memory: Memory,
    address: u32,
    chunks: ChunksMut<'d, u8>,
    completed: u32,
    length: u32,
    done: bool,
}

impl<'a, 'd, T: Transport> Read<'a, 'd, T> {
    pub(crate) fn new(
        handle: &'a mut BootloaderHandle<T>,
        memory: Memory,
        address: u32,
        buffer: &'d mut [u8],
        chunk_size: usize,
    ) -> Self {
        Self {
            handle,
            memory,
            address,
            length: buffer.len() as u32,
            done: buffer.is_empty(),
            chunks: buffer.chunks_mut(chunk_size),
            completed: 0,
        }
    }
}

impl<T: Transport> Operation for Read<'_, '_, T> {
    fn total(&self) -> u32 {
        self.length
    }

    fn label(&self) -> &'static str {
        match self.memory {
            Memory::Flash => "Reading flash...",
            Memory::Eeprom => "Reading EEPROM...",
        }
    }
}

impl<T: Transport> Iterator for Read<'_, '_, T> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let chunk = match self.chunks.next() {
            Some(chunk) => chunk,
            None => {
                self.done = true;
                return None;
            }
        };

        let address = self.address + self.completed;
        let result = match self.memory {
            Memory::Flash => self.handle.read_flash_block(address, chunk),
            Memory::Eeprom => self.handle.read_eeprom_block(address, chunk),
        };
        Some(match result {
            Ok(()) => {
                self.completed += chunk.len() as u32;
                Ok(self.completed)
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        })
    }
}

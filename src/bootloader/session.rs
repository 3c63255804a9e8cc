use super::handle::BootloaderHandle;
use super::operation::{Memory, Operation, StatusListener};
use super::types::{BootloaderType, MemorySet, UploadType};
use crate::archive::Image;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Where a [`Session`] is in the upgrade sequence.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionState {
    Idle,
    Initialized,
    Erased,
    Flashing,
    Verifying,
    Restarted,

    /// A request failed. The device is in an unknown state and the session cannot be used
    /// any more.
    Failed,
}

impl SessionState {
    /// The session can still talk to the bootloader.
    fn is_live(self) -> bool {
        !matches!(self, SessionState::Failed | SessionState::Restarted)
    }
}

fn run<O: Operation>(
    mut operation: O,
    listener: &mut Option<Box<dyn StatusListener>>,
) -> Result<()> {
    match listener {
        Some(listener) => operation.execute_with(&mut **listener),
        None => operation.execute(),
    }
}

/// Drives a bootloader through initialize, erase, write, verify and restart, refusing
/// requests that do not fit the current state.
///
/// ```rust, no_run
/// use tic_usb::archive::Archive;
/// use tic_usb::Context;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let archive = Archive::from_file("tic_t825.fmi")?;
/// let mut context = Context::new()?;
/// let bootloader = context.pick_bootloader(None)?;
/// let image = archive
///     .find_image(bootloader.usb_vendor_id(), bootloader.usb_product_id())
///     .ok_or("The archive has no image for this device.")?;
///
/// let mut session = bootloader.open()?;
/// session.set_status_listener(|status: &str, done: u32, total: u32| {
///     println!("{} {}/{}", status, done, total)
/// });
/// session.apply_image(image)?;
/// session.restart()?;
/// # Ok(())
/// # }
/// ```
pub struct Session<T: Transport> {
    handle: BootloaderHandle<T>,
    state: SessionState,
    listener: Option<Box<dyn StatusListener>>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, kind: &'static BootloaderType) -> Self {
        Self {
            handle: BootloaderHandle::new(transport, kind),
            state: SessionState::Idle,
            listener: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn kind(&self) -> &'static BootloaderType {
        self.handle.kind()
    }

    /// Receives a `(status, completed, total)` update for every step of every operation.
    pub fn set_status_listener(&mut self, listener: impl StatusListener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn into_transport(self) -> T {
        self.handle.into_transport()
    }

    fn require(&self, allowed: &[SessionState], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn require_live(&self) -> Result<()> {
        if self.state.is_live() {
            Ok(())
        } else {
            Err(Error::InvalidState {
                expected: "a session that has not failed or restarted",
                actual: self.state,
            })
        }
    }

    fn enter(&mut self, state: SessionState) {
        if self.state != state {
            log::debug!("bootloader session: {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Moves to `Failed` if talking to the device went wrong.
    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(error) = &result {
            log::debug!("bootloader session failed: {}", error);
            self.enter(SessionState::Failed);
        }
        result
    }

    /// Prepares the bootloader for an upload of the given type.
    pub fn initialize(&mut self, upload_type: UploadType) -> Result<()> {
        self.require(
            &[SessionState::Idle, SessionState::Initialized],
            "Idle or Initialized",
        )?;
        let result = self.handle.initialize(upload_type);
        self.track(result)?;
        self.enter(SessionState::Initialized);
        Ok(())
    }

    /// Initializes with an upload type every model of this bootloader accepts, for callers
    /// that only want to erase.
    pub fn initialize_default(&mut self) -> Result<()> {
        let upload_type = self.kind().default_upload_type();
        self.initialize(upload_type)
    }

    /// Erases the application flash and, where the bootloader can access it, the first EEPROM
    /// byte.
    pub fn erase_flash(&mut self) -> Result<()> {
        self.require(&[SessionState::Initialized], "Initialized")?;
        let result = run(self.handle.erase_flash(), &mut self.listener);
        self.track(result)?;
        if self.kind().supports_eeprom_access {
            let result = self.handle.erase_eeprom_first_byte();
            self.track(result)?;
        }
        log::info!("flash erased");
        self.enter(SessionState::Erased);
        Ok(())
    }

    /// Writes the blocks of a firmware image. Flash must have been erased.
    pub fn write_image(&mut self, image: &Image) -> Result<()> {
        self.require(
            &[SessionState::Erased, SessionState::Flashing],
            "Erased or Flashing",
        )?;
        let operation = self.handle.write_image(image)?;
        let result = run(operation, &mut self.listener);
        self.track(result)?;
        log::info!("wrote {} blocks", image.blocks.len());
        self.enter(SessionState::Flashing);
        Ok(())
    }

    /// Writes a plain image covering the whole application region.
    pub fn write_flash_plain(&mut self, image: &[u8]) -> Result<()> {
        self.require(
            &[SessionState::Erased, SessionState::Flashing],
            "Erased or Flashing",
        )?;
        let operation = self.handle.write_flash_plain(image)?;
        let result = run(operation, &mut self.listener);
        self.track(result)?;
        log::info!("wrote plain flash image");
        self.enter(SessionState::Flashing);
        Ok(())
    }

    /// Initializes, erases and writes a firmware image in one go.
    pub fn apply_image(&mut self, image: &Image) -> Result<()> {
        // Reject bad images before the device is touched.
        self.handle.plan_image(image)?;
        self.initialize(image.upload_type)?;
        self.erase_flash()?;
        self.write_image(image)
    }

    /// Reads the whole application region.
    pub fn read_flash(&mut self) -> Result<Vec<u8>> {
        self.require_live()?;
        let mut buffer = vec![0; self.kind().app_size as usize];
        let operation = self.handle.read_flash(&mut buffer)?;
        let result = run(operation, &mut self.listener);
        self.track(result)?;
        Ok(buffer)
    }

    /// Reads the device's memories back and compares them with an image that was written.
    pub fn verify_image(&mut self, image: &Image) -> Result<()> {
        self.require(
            &[SessionState::Flashing, SessionState::Verifying],
            "Flashing or Verifying",
        )?;
        let kind = self.kind();
        let chunks = self.handle.plan_image(image)?;
        let needs_eeprom = chunks
            .iter()
            .any(|c| c.memory == Memory::Eeprom);
        kind.ensure_flash_reading()?;
        if needs_eeprom {
            kind.ensure_eeprom_access()?;
        }

        self.enter(SessionState::Verifying);
        let flash = self.read_flash()?;
        let eeprom = if needs_eeprom {
            self.read_eeprom()?
        } else {
            Vec::new()
        };

        for chunk in &chunks {
            let (memory, base) = match chunk.memory {
                Memory::Flash => (&flash, kind.app_address),
                Memory::Eeprom => (&eeprom, kind.eeprom_address),
            };
            let offset = (chunk.address - base) as usize;
            let actual = &memory[offset..offset + chunk.data.len()];
            if let Some(i) = chunk.data.iter().zip(actual).position(|(a, b)| a != b) {
                let address = chunk.address + i as u32;
                log::debug!("verification failed at 0x{:06x}", address);
                return self.track(Err(Error::VerificationFailed { address }));
            }
        }
        log::info!("image verified");
        Ok(())
    }

    /// Reads the whole EEPROM.
    pub fn read_eeprom(&mut self) -> Result<Vec<u8>> {
        self.require_live()?;
        let mut buffer = vec![0; self.kind().eeprom_size as usize];
        let operation = self.handle.read_eeprom(&mut buffer)?;
        let result = run(operation, &mut self.listener);
        self.track(result)?;
        Ok(buffer)
    }

    /// Writes the whole EEPROM. The bootloader must have been initialized.
    pub fn write_eeprom(&mut self, image: &[u8]) -> Result<()> {
        self.require(
            &[
                SessionState::Initialized,
                SessionState::Erased,
                SessionState::Flashing,
                SessionState::Verifying,
            ],
            "an initialized bootloader",
        )?;
        let operation = self.handle.write_eeprom(image)?;
        let result = run(operation, &mut self.listener);
        self.track(result)
    }

    /// Sets every EEPROM byte to 0xFF.
    pub fn erase_eeprom(&mut self) -> Result<()> {
        let blank = vec![0xFF; self.kind().eeprom_size as usize];
        self.write_eeprom(&blank)
    }

    /// Erases a set of memories, initializing the bootloader first if needed.
    pub fn erase(&mut self, memories: MemorySet) -> Result<()> {
        let kind = self.kind();
        kind.ensure_erasing(memories)?;
        if self.state == SessionState::Idle {
            self.initialize_default()?;
        }
        if kind.includes_flash(memories) {
            self.erase_flash()?;
        }
        if kind.includes_eeprom(memories) {
            self.erase_eeprom()?;
        }
        Ok(())
    }

    /// Asks whether the application in flash is valid.
    pub fn check_application(&mut self) -> Result<bool> {
        self.require_live()?;
        let result = self.handle.check_application();
        self.track(result)
    }

    /// Restarts the device into its application. The session is finished afterwards.
    pub fn restart(&mut self) -> Result<()> {
        self.require_live()?;
        let result = self.handle.restart();
        self.track(result)?;
        log::info!("device restarted");
        self.enter(SessionState::Restarted);
        Ok(())
    }
}

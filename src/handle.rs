use crate::bootloader::REQUEST_START_BOOTLOADER;
use crate::error::{Error, Result, TransferError};
use crate::product::Product;
use crate::settings::layout::{NOT_INITIALIZED, SETTINGS_SIZE};
use crate::settings::{decode, encode, Settings};
use crate::transport::{Transport, REQUEST_TYPE_IN, REQUEST_TYPE_OUT, REQUEST_TYPE_STANDARD_IN};

const REQUEST_REINITIALIZE: u8 = 0x10;
const REQUEST_SET_SETTING: u8 = 0x13;
const REQUEST_GET_SETTING: u8 = 0xA8;

/// Largest response the firmware sends to a single request.
const MAX_RESPONSE_SIZE: usize = 128;

/// Highest firmware major version this crate knows how to talk to.
pub const FIRMWARE_VERSION_MAJOR_MAX: u8 = 1;

const REQUEST_GET_DESCRIPTOR: u8 = 6;
const DESCRIPTOR_TYPE_STRING: u16 = 3;
const MODIFICATION_STRING_INDEX: u16 = 4;

/// Formats a BCD firmware version as "X.YY", with a leading digit only when it is nonzero.
fn format_version(bcd: u16) -> String {
    let digit = |shift: u16| char::from(b'0' + ((bcd >> shift) & 0xF) as u8);
    let mut version = String::with_capacity(5);
    if bcd & 0xF000 != 0 {
        version.push(digit(12));
    }
    version.push(digit(8));
    version.push('.');
    version.push(digit(4));
    version.push(digit(0));
    version
}

/// An open connection to a Tic running its native firmware.
pub struct TicHandle<T: Transport> {
    transport: T,
    product: Product,
    firmware_version: u16,
    firmware_version_string: Option<String>,
}

impl<T: Transport> TicHandle<T> {
    /// Wraps a transport to a Tic whose device descriptor reported `firmware_version` (BCD).
    /// Fails if the firmware is too new for this crate.
    pub fn new(transport: T, product: Product, firmware_version: u16) -> Result<Self> {
        if (firmware_version >> 8) as u8 > FIRMWARE_VERSION_MAJOR_MAX {
            return Err(Error::UnsupportedFirmware(format_version(firmware_version)));
        }

        Ok(Self {
            transport,
            product,
            firmware_version,
            firmware_version_string: None,
        })
    }

    pub fn product(&self) -> Product {
        self.product
    }

    /// Firmware version in BCD, as reported in the device descriptor.
    pub fn firmware_version(&self) -> u16 {
        self.firmware_version
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Firmware version followed by the modification string, e.g. "1.04" or "1.04nc".
    ///
    /// A failure to read the modification string is not an error; a '?' is appended instead.
    /// The result is cached.
    pub fn firmware_version_string(&mut self) -> &str {
        if self.firmware_version_string.is_none() {
            let mut version = format_version(self.firmware_version);
            let mut buffer = [0u8; 256];
            match self.transport.read_control(
                REQUEST_TYPE_STANDARD_IN,
                REQUEST_GET_DESCRIPTOR,
                (DESCRIPTOR_TYPE_STRING << 8) | MODIFICATION_STRING_INDEX,
                0,
                &mut buffer,
            ) {
                // A lone dash means the firmware is unmodified.
                Ok(4) if buffer[2] == b'-' => {}
                Ok(transferred) => {
                    version.extend(
                        buffer[2..transferred.max(2)]
                            .iter()
                            .step_by(2)
                            .map(|&c| char::from(c)),
                    );
                }
                Err(error) => {
                    log::debug!("Could not read the firmware modification string: {}", error);
                    version.push('?');
                }
            }
            self.firmware_version_string = Some(version);
        }
        self.firmware_version_string.as_deref().unwrap_or_default()
    }

    /// Reads the settings stored in the device's non-volatile memory.
    pub fn get_settings(&mut self) -> Result<Settings> {
        let mut buffer = [0u8; SETTINGS_SIZE];
        let mut offset = 1;
        while offset < SETTINGS_SIZE {
            let end = (offset + MAX_RESPONSE_SIZE).min(SETTINGS_SIZE);
            let segment = &mut buffer[offset..end];
            let transferred = self
                .transport
                .read_control(
                    REQUEST_TYPE_IN,
                    REQUEST_GET_SETTING,
                    0,
                    offset as u16,
                    segment,
                )
                .map_err(|source| Error::Transfer {
                    context: "There was an error reading settings from the device",
                    source,
                })?;
            if transferred != segment.len() {
                return Err(Error::TransferLength {
                    context: "reading settings",
                    expected: segment.len(),
                    actual: transferred,
                });
            }
            offset = end;
        }

        log::debug!("Read {} settings bytes", SETTINGS_SIZE - 1);
        Ok(decode(self.product, &buffer))
    }

    /// Writes settings to the device's non-volatile memory.
    ///
    /// The settings are fixed before they are written, without reporting warnings, so nothing
    /// invalid reaches the device. Call [`Settings::fix`] first to see what would change. The
    /// device only applies them after [`reinitialize`](Self::reinitialize).
    pub fn set_settings(&mut self, settings: &Settings) -> Result<()> {
        let buffer = encode(&settings.fixed());
        for (offset, &byte) in buffer.iter().enumerate().skip(1) {
            self.set_setting_byte(offset as u8, byte)
                .map_err(|source| Error::Transfer {
                    context: "There was an error applying settings to the device",
                    source,
                })?;
        }
        log::info!("Wrote settings for {}", self.product.info().full_name);
        Ok(())
    }

    /// Marks the stored settings as uninitialized and reinitializes, which makes the firmware
    /// load its defaults.
    pub fn restore_defaults(&mut self) -> Result<()> {
        self.set_setting_byte(NOT_INITIALIZED, 1)
            .map_err(|source| Error::Transfer {
                context: "There was an error restoring the default settings",
                source,
            })?;
        self.reinitialize()
    }

    /// Makes the device reload its settings from non-volatile memory.
    pub fn reinitialize(&mut self) -> Result<()> {
        self.transport
            .write_control(REQUEST_TYPE_OUT, REQUEST_REINITIALIZE, 0, 0, &[])
            .map_err(|source| Error::Transfer {
                context: "There was an error reinitializing the device",
                source,
            })?;
        Ok(())
    }

    /// Restarts the device into its bootloader. The handle is useless afterwards.
    pub fn start_bootloader(mut self) -> Result<()> {
        self.transport
            .write_control(REQUEST_TYPE_OUT, REQUEST_START_BOOTLOADER, 0, 0, &[])
            .map_err(|source| Error::Transfer {
                context: "Failed to start bootloader",
                source,
            })?;
        log::info!("Started the bootloader of {}", self.product);
        Ok(())
    }

    fn set_setting_byte(&mut self, offset: u8, byte: u8) -> std::result::Result<(), TransferError> {
        self.transport
            .write_control(
                REQUEST_TYPE_OUT,
                REQUEST_SET_SETTING,
                u16::from(byte),
                u16::from(offset),
                &[],
            )
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{ControlMode, StepMode};
    use crate::transport::mock::MockTransport;

    fn tic(mock: &mut MockTransport) -> TicHandle<&mut MockTransport> {
        TicHandle::new(mock, Product::T825, 0x0104).unwrap()
    }

    #[test]
    fn newer_major_versions_are_refused() {
        let mut mock = MockTransport::new();
        match TicHandle::new(&mut mock, Product::T825, 0x0200) {
            Err(Error::UnsupportedFirmware(version)) => assert_eq!(version, "2.00"),
            _ => panic!("firmware 2.00 was accepted"),
        }
        assert!(TicHandle::new(&mut mock, Product::T825, 0x0199).is_ok());
    }

    #[test]
    fn version_formatting() {
        assert_eq!(format_version(0x0104), "1.04");
        assert_eq!(format_version(0x1234), "12.34");
    }

    #[test]
    fn firmware_version_string_appends_the_modification_string() {
        let mut mock = MockTransport::new();
        mock.reply(
            REQUEST_GET_DESCRIPTOR,
            Ok(vec![6, 3, b'n', 0, b'c', 0]),
        );
        let mut handle = tic(&mut mock);
        assert_eq!(handle.firmware_version_string(), "1.04nc");
        assert_eq!(handle.firmware_version_string(), "1.04nc");
        drop(handle);

        let descriptor = &mock.requests_with(REQUEST_GET_DESCRIPTOR);
        assert_eq!(descriptor.len(), 1);
        assert_eq!(descriptor[0].request_type, REQUEST_TYPE_STANDARD_IN);
        assert_eq!(descriptor[0].value, 0x0304);
    }

    #[test]
    fn firmware_version_string_ignores_a_dash_and_marks_failures() {
        let mut mock = MockTransport::new();
        mock.reply(REQUEST_GET_DESCRIPTOR, Ok(vec![4, 3, b'-', 0]));
        assert_eq!(tic(&mut mock).firmware_version_string(), "1.04");

        let mut mock = MockTransport::new();
        mock.reply(REQUEST_GET_DESCRIPTOR, Err(TransferError::Timeout));
        assert_eq!(tic(&mut mock).firmware_version_string(), "1.04?");
    }

    #[test]
    fn settings_round_trip_through_the_device() {
        let mut mock = MockTransport::new();
        mock.with_memory(REQUEST_GET_SETTING, REQUEST_SET_SETTING, vec![0; SETTINGS_SIZE]);

        let mut settings = Settings::new(Product::T825);
        settings.control_mode = ControlMode::STEP_DIR;
        settings.step_mode = StepMode::MICROSTEP8;
        settings.max_speed = 2_000_000;

        let mut handle = tic(&mut mock);
        handle.set_settings(&settings).unwrap();
        assert_eq!(handle.get_settings().unwrap(), settings.fixed());
        drop(handle);

        // Offset 0 is left alone and every other byte is written once.
        let writes = mock.requests_with(REQUEST_SET_SETTING);
        assert_eq!(writes.len(), SETTINGS_SIZE - 1);
        assert_eq!(writes[0].index, 1);
        assert_eq!(mock.memory()[0], 0);

        let reads = mock.requests_with(REQUEST_GET_SETTING);
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].index, 1);
        assert_eq!(reads[0].data.len(), SETTINGS_SIZE - 1);
    }

    #[test]
    fn invalid_settings_are_fixed_before_writing() {
        let mut mock = MockTransport::new();
        mock.with_memory(REQUEST_GET_SETTING, REQUEST_SET_SETTING, vec![0; SETTINGS_SIZE]);

        let mut settings = Settings::new(Product::T825);
        settings.step_mode = StepMode(200);

        let mut handle = tic(&mut mock);
        handle.set_settings(&settings).unwrap();
        let stored = handle.get_settings().unwrap();
        assert!(stored.step_mode.is_valid());
        // The caller's copy is untouched.
        assert_eq!(settings.step_mode, StepMode(200));
    }

    #[test]
    fn short_settings_reads_fail() {
        let mut mock = MockTransport::new();
        mock.reply(REQUEST_GET_SETTING, Ok(vec![0; 10]));
        match tic(&mut mock).get_settings() {
            Err(Error::TransferLength { actual: 10, .. }) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn write_failures_carry_context() {
        let mut mock = MockTransport::new();
        mock.reply(REQUEST_SET_SETTING, Err(TransferError::Disconnected));
        let error = tic(&mut mock)
            .set_settings(&Settings::new(Product::T825))
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "There was an error applying settings to the device: The device is disconnected."
        );
    }

    #[test]
    fn restore_defaults_clears_the_initialized_flag_and_reinitializes() {
        let mut mock = MockTransport::new();
        tic(&mut mock).restore_defaults().unwrap();

        let requests: Vec<(u8, u16, u16)> = mock
            .requests
            .iter()
            .map(|r| (r.request, r.value, r.index))
            .collect();
        assert_eq!(
            requests,
            [(REQUEST_SET_SETTING, 1, 0), (REQUEST_REINITIALIZE, 0, 0)]
        );
    }

    #[test]
    fn start_bootloader_sends_the_request() {
        let mut mock = MockTransport::new();
        tic(&mut mock).start_bootloader().unwrap();
        assert_eq!(mock.requests_with(REQUEST_START_BOOTLOADER).len(), 1);
    }
}

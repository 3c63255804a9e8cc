use std::fmt;
use std::result::Result as StdResult;
use thiserror::Error;

/// Errors which can occur while talking to a device or processing its data.
#[derive(Debug, Error)]
pub enum Error {
    /// An operation could not be performed because it was prohibited by safety checks (e.g.
    /// writing outside of the application flash region).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// It was attempted to open a connection to a device which does not exist.
    #[error("No matching device was found.")]
    NotFound,

    /// The request was not specific enough and returned multiple matches where only a single
    /// one is supported.
    #[error("There are multiple matching devices. Specify a serial number.")]
    TooManyMatches,

    /// The connected device or bootloader cannot do what was asked of it.
    #[error("{0}")]
    Unsupported(&'static str),

    /// The device runs firmware that is newer than this library understands.
    #[error("The device has new firmware ({0}) that is not supported by this software.")]
    UnsupportedFirmware(String),

    /// A bootloader session was asked to do something its current state does not allow.
    #[error("The bootloader session is in the {actual:?} state but this operation needs {expected}.")]
    InvalidState {
        expected: &'static str,
        actual: crate::bootloader::SessionState,
    },

    /// A USB control transfer failed.
    #[error("{context}: {source}")]
    Transfer {
        context: &'static str,
        #[source]
        source: TransferError,
    },

    /// The device completed a transfer but moved fewer bytes than required.
    #[error("Incorrect transfer length while {context}: expected {expected}, got {actual}.")]
    TransferLength {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The bootloader rejected a request and explained why.
    #[error("{context}: {error}")]
    Device {
        context: &'static str,
        error: DeviceError,
    },

    /// Reading memory back did not match what was written.
    #[error("Verification failed at address 0x{address:06x}.")]
    VerificationFailed { address: u32 },

    /// A firmware archive could not be processed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A settings text document could not be read.
    #[error("Line {line}: {message}")]
    Text { line: usize, message: String },

    /// An error occurred while enumerating or opening USB devices.
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
}

/// Shorthand for a Result with the crate's own Error type.
pub type Result<T> = StdResult<T, Error>;

/// Failure classes of a single control transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
pub enum TransferError {
    /// The device answered with a STALL packet, usually because it rejected the request.
    #[error("The device stalled the request.")]
    Stall,

    #[error("The transfer timed out.")]
    Timeout,

    #[error("Access to the device was denied.")]
    AccessDenied,

    /// The device was unplugged or its handle was closed.
    #[error("The device is disconnected.")]
    Disconnected,

    #[error("USB error: {0}")]
    Other(rusb::Error),
}

impl From<rusb::Error> for TransferError {
    fn from(error: rusb::Error) -> Self {
        match error {
            rusb::Error::Pipe => TransferError::Stall,
            rusb::Error::Timeout => TransferError::Timeout,
            rusb::Error::Access => TransferError::AccessDenied,
            rusb::Error::NoDevice => TransferError::Disconnected,
            other => TransferError::Other(other),
        }
    }
}

/// Error codes reported by the bootloader after an erase request or through the
/// "get last error" request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceError {
    State,
    Length,
    Programming,
    WriteProtection,
    Verification,
    AddressRange,
    AddressOrder,
    AddressAlignment,
    Write,
    EepromVerification,

    /// Used for all error codes the bootloader is not known to produce.
    Unknown(u8),
}

impl DeviceError {
    /// Human-readable description of the error, as a full sentence.
    pub fn description(&self) -> String {
        match self {
            DeviceError::State => "Device is not in the correct state.".into(),
            DeviceError::Length => "Invalid data length.".into(),
            DeviceError::Programming => "Programming error.".into(),
            DeviceError::WriteProtection => "Write protection error.".into(),
            DeviceError::Verification => "Verification error.".into(),
            DeviceError::AddressRange => "Address is not in the correct range.".into(),
            DeviceError::AddressOrder => "Address was not accessed in the correct order.".into(),
            DeviceError::AddressAlignment => "Address does not have the correct alignment.".into(),
            DeviceError::Write => "Write error.".into(),
            DeviceError::EepromVerification => "EEPROM verification error.".into(),
            DeviceError::Unknown(code) => format!("Unknown error code: {}.", code),
        }
    }
}

impl From<u8> for DeviceError {
    fn from(code: u8) -> DeviceError {
        match code {
            1 => DeviceError::State,
            2 => DeviceError::Length,
            3 => DeviceError::Programming,
            4 => DeviceError::WriteProtection,
            5 => DeviceError::Verification,
            6 => DeviceError::AddressRange,
            7 => DeviceError::AddressOrder,
            8 => DeviceError::AddressAlignment,
            9 => DeviceError::Write,
            10 => DeviceError::EepromVerification,
            c => DeviceError::Unknown(c),
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Problems found while reading a firmware archive document.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("There was an error processing the firmware archive. {kind}")]
pub struct ArchiveError {
    pub kind: ArchiveErrorKind,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ArchiveErrorKind {
    #[error("Failed to read file: {0}.")]
    Io(String),

    #[error("XML error: {0}.")]
    Xml(String),

    #[error("The firmware archive root element has an invalid name.")]
    InvalidRoot,

    #[error("The firmware archive format is missing.")]
    MissingFormat,

    #[error("The firmware archive format is different than expected ({0}). Try installing the latest version of this software.")]
    UnsupportedFormat(String),

    #[error("The firmware archive has no images.")]
    NoImages,

    #[error("Firmware image {image} is missing a product ID.")]
    MissingProduct { image: usize },

    #[error("Firmware image {image} has an invalid product ID \"{value}\".")]
    InvalidProduct { image: usize, value: String },

    #[error("Firmware image {image} has an invalid upload type \"{value}\".")]
    InvalidUploadType { image: usize, value: String },

    #[error("Firmware image {image} has no blocks in it.")]
    NoBlocks { image: usize },

    #[error("Block {block} of firmware image {image} is missing an address.")]
    MissingAddress { image: usize, block: usize },

    #[error("Block {block} of firmware image {image} has an invalid address \"{value}\".")]
    InvalidAddress {
        image: usize,
        block: usize,
        value: String,
    },

    #[error("Block {block} of firmware image {image} has missing or invalid contents.")]
    MissingContents { image: usize, block: usize },

    #[error("Block {block} of firmware image {image} has an odd number of characters.")]
    OddLength { image: usize, block: usize },

    #[error("Block {block} of firmware image {image} has an invalid hex digit.")]
    InvalidHexDigit { image: usize, block: usize },
}

impl From<ArchiveErrorKind> for ArchiveError {
    fn from(kind: ArchiveErrorKind) -> Self {
        ArchiveError { kind }
    }
}

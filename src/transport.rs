//! The control transfer interface every device handle in this crate talks through.

use crate::error::TransferError;
use rusb::{DeviceHandle, UsbContext};
use std::time::Duration;

/// Request type of a vendor-specific, device-directed OUT transfer.
pub const REQUEST_TYPE_OUT: u8 = 0x40;

/// Request type of a vendor-specific, device-directed IN transfer.
pub const REQUEST_TYPE_IN: u8 = 0xC0;

/// Request type of a standard, device-directed IN transfer (e.g. GET_DESCRIPTOR).
pub const REQUEST_TYPE_STANDARD_IN: u8 = 0x80;

/// Synchronous USB control transfers on a device that is exclusively owned by the caller.
///
/// Closing the device is done by dropping the transport.
pub trait Transport {
    /// Performs an IN control transfer and returns the number of bytes read into `buffer`.
    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buffer: &mut [u8],
    ) -> Result<usize, TransferError>;

    /// Performs an OUT control transfer and returns the number of bytes written.
    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransferError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buffer: &mut [u8],
    ) -> Result<usize, TransferError> {
        (**self).read_control(request_type, request, value, index, buffer)
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransferError> {
        (**self).write_control(request_type, request, value, index, data)
    }
}

/// Outcome of a write transfer, sorted by what the caller should do about it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransferOutcome {
    /// The transfer went through and moved this many bytes.
    Done(usize),

    /// The device stalled the request. It may be able to say why.
    Stalled,

    /// Anything else. Asking the device for details would be meaningless.
    Failed(TransferError),
}

impl From<Result<usize, TransferError>> for TransferOutcome {
    fn from(result: Result<usize, TransferError>) -> Self {
        match result {
            Ok(transferred) => TransferOutcome::Done(transferred),
            Err(TransferError::Stall) => TransferOutcome::Stalled,
            Err(error) => TransferOutcome::Failed(error),
        }
    }
}

/// [`Transport`] over an open rusb device handle.
pub struct UsbTransport<T: UsbContext> {
    handle: DeviceHandle<T>,
    timeout: Duration,
}

impl<T: UsbContext> UsbTransport<T> {
    /// Wraps an open handle, using the crate's default per-transfer timeout.
    pub fn new(handle: DeviceHandle<T>) -> Self {
        Self {
            handle,
            timeout: crate::TIMEOUT,
        }
    }

    /// Changes the time a single transfer may take before it fails with
    /// [`TransferError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Gives access to the underlying rusb handle, e.g. to read string descriptors.
    pub fn handle(&self) -> &DeviceHandle<T> {
        &self.handle
    }
}

impl<T: UsbContext> Transport for UsbTransport<T> {
    fn read_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buffer: &mut [u8],
    ) -> Result<usize, TransferError> {
        log::trace!(
            "control in: type 0x{:02x} request 0x{:02x} value 0x{:04x} index 0x{:04x} length {}",
            request_type,
            request,
            value,
            index,
            buffer.len()
        );
        Ok(self
            .handle
            .read_control(request_type, request, value, index, buffer, self.timeout)?)
    }

    fn write_control(
        &mut self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> Result<usize, TransferError> {
        log::trace!(
            "control out: type 0x{:02x} request 0x{:02x} value 0x{:04x} index 0x{:04x} length {}",
            request_type,
            request,
            value,
            index,
            data.len()
        );
        Ok(self
            .handle
            .write_control(request_type, request, value, index, data, self.timeout)?)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! A scripted transport that records every request and answers from per-request queues.

    use super::*;
    use std::collections::{HashMap, VecDeque};

    /// One recorded control transfer.
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub struct Request {
        pub request_type: u8,
        pub request: u8,
        pub value: u16,
        pub index: u16,
        /// Data sent for OUT transfers, requested length (as zeros) for IN transfers.
        pub data: Vec<u8>,
    }

    type Reply = Result<Vec<u8>, TransferError>;

    #[derive(Default)]
    pub struct MockTransport {
        pub requests: Vec<Request>,
        replies: HashMap<u8, VecDeque<Reply>>,
        fallback: HashMap<u8, Reply>,
        memory: Option<(u8, u8, Vec<u8>)>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues a single reply for the next transfer with this request code. For IN
        /// transfers the bytes are copied into the buffer, for OUT transfers their length is
        /// reported as the number of bytes written.
        pub fn reply(&mut self, request: u8, reply: Reply) -> &mut Self {
            self.replies.entry(request).or_default().push_back(reply);
            self
        }

        /// Reply used once the queue for this request code is empty.
        pub fn always(&mut self, request: u8, reply: Reply) -> &mut Self {
            self.fallback.insert(request, reply);
            self
        }

        /// Serves reads with `read_request` from `memory` at offset wIndex and stores bytes
        /// written with `write_request` (wValue = byte, wIndex = offset).
        pub fn with_memory(&mut self, read_request: u8, write_request: u8, memory: Vec<u8>) {
            self.memory = Some((read_request, write_request, memory));
        }

        pub fn memory(&self) -> &[u8] {
            &self.memory.as_ref().expect("no memory configured").2
        }

        pub fn requests_with(&self, request: u8) -> Vec<&Request> {
            self.requests
                .iter()
                .filter(|r| r.request == request)
                .collect()
        }

        fn next_reply(&mut self, request: u8) -> Option<Reply> {
            if let Some(reply) = self
                .replies
                .get_mut(&request)
                .and_then(|queue| queue.pop_front())
            {
                return Some(reply);
            }
            self.fallback.get(&request).cloned()
        }
    }

    impl Transport for MockTransport {
        fn read_control(
            &mut self,
            request_type: u8,
            request: u8,
            value: u16,
            index: u16,
            buffer: &mut [u8],
        ) -> Result<usize, TransferError> {
            self.requests.push(Request {
                request_type,
                request,
                value,
                index,
                data: vec![0; buffer.len()],
            });

            if let Some((read_request, _, memory)) = &self.memory {
                if *read_request == request {
                    let start = (index as usize).min(memory.len());
                    let end = (start + buffer.len()).min(memory.len());
                    let length = end - start;
                    buffer[..length].copy_from_slice(&memory[start..end]);
                    return Ok(length);
                }
            }

            match self.next_reply(request) {
                Some(Ok(bytes)) => {
                    let length = bytes.len().min(buffer.len());
                    buffer[..length].copy_from_slice(&bytes[..length]);
                    Ok(length)
                }
                Some(Err(error)) => Err(error),
                None => Ok(0),
            }
        }

        fn write_control(
            &mut self,
            request_type: u8,
            request: u8,
            value: u16,
            index: u16,
            data: &[u8],
        ) -> Result<usize, TransferError> {
            self.requests.push(Request {
                request_type,
                request,
                value,
                index,
                data: data.to_vec(),
            });

            if let Some((_, write_request, memory)) = &mut self.memory {
                if *write_request == request {
                    memory[index as usize] = value as u8;
                    return Ok(0);
                }
            }

            match self.next_reply(request) {
                Some(Ok(bytes)) => Ok(bytes.len()),
                None => Ok(data.len()),
                Some(Err(error)) => Err(error),
            }
        }
    }
}

//! Asynchronous USB request model shared by the transport and endpoint backends.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{GadgetError, descriptors::EndpointDescriptor};

/// Invoked by the endpoint, in its own context, when a request finishes.
///
/// Must not block.
pub type Completion = Arc<dyn Fn(UsbRequest) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    /// Queued or not yet submitted.
    Pending,
    Complete,
    /// The endpoint was disabled while the request was outstanding.
    Cancelled,
    /// The transfer failed on the wire.
    Failed(String),
}

/// A bulk transfer with an owned buffer.
///
/// Dropping the request releases its buffer, so every path out of a
/// completion handler either re-queues it or lets it go exactly once.
pub struct UsbRequest {
    buf: Vec<u8>,
    /// Bytes to transfer: the payload for IN, the buffer size for OUT.
    pub length: usize,
    /// Bytes actually transferred.
    pub actual: usize,
    pub status: RequestStatus,
    complete: Option<Completion>,
}

impl fmt::Debug for UsbRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsbRequest")
            .field("length", &self.length)
            .field("actual", &self.actual)
            .field("status", &self.status)
            .field("has_completion", &self.complete.is_some())
            .finish()
    }
}

impl UsbRequest {
    /// A zeroed request of `len` bytes.
    pub fn alloc(len: usize) -> Result<Self, GadgetError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| GadgetError::AllocationFailure { len })?;
        buf.resize(len, 0);

        Ok(Self {
            buf,
            length: len,
            actual: 0,
            status: RequestStatus::Pending,
            complete: None,
        })
    }

    /// A request carrying a copy of `data`.
    pub fn with_data(data: &[u8]) -> Result<Self, GadgetError> {
        let mut request = Self::alloc(data.len())?;
        request.buf.copy_from_slice(data);
        Ok(request)
    }

    pub fn set_completion(&mut self, complete: Completion) {
        self.complete = Some(complete);
    }

    /// The whole buffer, for the endpoint to fill or send.
    pub fn buf(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    pub fn buf_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        &mut self.buf[..len]
    }

    /// The transferred bytes.
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.actual.min(self.len())]
    }

    fn len(&self) -> usize {
        self.length.min(self.buf.len())
    }

    /// Back to a submittable state, keeping buffer and completion.
    pub fn reset(&mut self) {
        self.actual = 0;
        self.status = RequestStatus::Pending;
    }

    /// Record the outcome and hand the request to its completion handler.
    ///
    /// Without a handler the request is simply dropped.
    pub fn complete(mut self, status: RequestStatus, actual: usize) {
        self.status = status;
        self.actual = actual.min(self.length);
        if let Some(complete) = self.complete.clone() {
            complete(self);
        }
    }
}

#[derive(Error, Debug)]
#[error("failed to queue request")]
pub struct QueueError {
    /// Returned to the caller, which decides whether to free or retry it.
    pub request: UsbRequest,
    #[source]
    pub source: GadgetError,
}

/// One direction of a bulk pipe.
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;

    /// Endpoint address, direction bit included.
    fn address(&self) -> u8;

    fn enable(&self, descriptor: &EndpointDescriptor) -> Result<(), GadgetError>;

    /// Completes every outstanding request with [`RequestStatus::Cancelled`].
    fn disable(&self);

    /// Submits `request`. Its completion runs later, never from inside this call.
    fn queue(&self, request: UsbRequest) -> Result<(), QueueError>;
}

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Sender, TrySendError};
use log::{debug, error, warn};
use usbd_scsi::Emulator;

use crate::{
    GadgetError,
    descriptors::COMMAND_BUFFER_LEN,
    endpoint::{Completion, Endpoint, RequestStatus, UsbRequest},
    worker::Work,
};

/// Builds the IN request carrying a response.
type InAllocator = fn(&[u8]) -> Result<UsbRequest, GadgetError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Passed,
    Failed,
}

/// Outcome of one command round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub status: CommandStatus,
    pub transfer_len: usize,
    /// The IN response was queued.
    pub responded: bool,
    /// The OUT request went back on the endpoint.
    pub rearmed: bool,
}

/// Drives the OUT (command) and IN (response) bulk endpoints.
///
/// Exactly one OUT request is outstanding while armed. Its completion only
/// forwards the request to the command worker, which runs
/// [`dispatch`](Self::dispatch) and puts the request back on the endpoint.
/// IN requests are created per response and dropped on completion.
///
/// Every [`arm`](Self::arm) or [`disarm`](Self::disarm) starts a new
/// generation; commands from an older generation are released, not re-armed.
/// Anything queued on behalf of a generation is queued while holding the
/// generation lock, so it cannot interleave with a disarm or a new arm.
pub struct BulkTransport {
    ep_in: Arc<dyn Endpoint>,
    ep_out: Arc<dyn Endpoint>,
    work: Sender<Work>,
    generation: Mutex<u64>,
    in_complete: Completion,
    alloc_in: InAllocator,
}

impl BulkTransport {
    pub fn new(ep_in: Arc<dyn Endpoint>, ep_out: Arc<dyn Endpoint>, work: Sender<Work>) -> Self {
        let in_name = ep_in.name().to_string();
        Self {
            ep_in,
            ep_out,
            work,
            generation: Mutex::new(0),
            in_complete: Arc::new(move |request: UsbRequest| {
                if let RequestStatus::Failed(reason) = &request.status {
                    error!("Bulk IN transfer error on {in_name}: {reason}");
                }
            }),
            alloc_in: UsbRequest::with_data,
        }
    }

    pub fn ep_in(&self) -> &Arc<dyn Endpoint> {
        &self.ep_in
    }

    pub fn ep_out(&self) -> &Arc<dyn Endpoint> {
        &self.ep_out
    }

    fn generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates the command buffer and queues it on the OUT endpoint.
    pub fn arm(self: &Arc<Self>) -> Result<(), GadgetError> {
        let mut current = self.generation();
        *current += 1;
        let generation = *current;

        let mut request = UsbRequest::alloc(COMMAND_BUFFER_LEN)?;
        let transport = Arc::downgrade(self);
        request.set_completion(Arc::new(move |request: UsbRequest| {
            match transport.upgrade() {
                Some(transport) => transport.on_out_complete(request, generation),
                None => debug!("Command request completed after transport was dropped"),
            }
        }));

        self.ep_out.queue(request).map_err(|err| {
            error!("Failed to queue OUT request on {}: {}", self.ep_out.name(), err.source);
            err.source
        })?;
        debug!("Armed {} (generation {generation})", self.ep_out.name());
        Ok(())
    }

    /// Invalidates the outstanding command request so it will not be re-armed.
    pub fn disarm(&self) {
        *self.generation() += 1;
    }

    /// OUT completion. Runs in the endpoint's context and never blocks.
    pub fn on_out_complete(&self, request: UsbRequest, generation: u64) {
        match &request.status {
            RequestStatus::Cancelled => {
                debug!("Command request on {} cancelled", self.ep_out.name());
            }
            RequestStatus::Failed(reason) => {
                error!("Bulk OUT transfer error on {}: {reason}", self.ep_out.name());
                self.rearm_if_current(request, generation);
            }
            RequestStatus::Complete | RequestStatus::Pending => {
                match self.work.try_send(Work::Command {
                    request,
                    generation,
                }) {
                    Ok(()) => {}
                    Err(TrySendError::Full(work)) => {
                        error!("Command queue full, dropping command");
                        if let Work::Command { request, .. } = work {
                            self.rearm_if_current(request, generation);
                        }
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        warn!("Command worker stopped, releasing command request");
                    }
                }
            }
        }
    }

    /// Emulates the received CDB, queues the response on IN and re-arms OUT.
    ///
    /// Returns `None` for a request whose generation ended before or while it
    /// executed. Such a request and its response are released.
    pub fn dispatch(
        &self,
        emulator: &Emulator,
        request: UsbRequest,
        generation: u64,
        response: &mut [u8],
    ) -> Option<DispatchReport> {
        if *self.generation() != generation {
            debug!("Dropping command from stale generation {generation}");
            return None;
        }

        let (status, transfer_len) = match emulator.execute(request.data(), response) {
            Ok(len) => (CommandStatus::Passed, len),
            Err(err) => {
                error!("Failed to handle scsi command: {err}");
                (CommandStatus::Failed, 0)
            }
        };

        let current = self.generation();
        if *current != generation {
            debug!("Generation {generation} ended during command, dropping response");
            return None;
        }
        let responded = self.respond(&response[..transfer_len]);
        let rearmed = self.rearm(request);
        drop(current);

        Some(DispatchReport {
            status,
            transfer_len,
            responded,
            rearmed,
        })
    }

    fn respond(&self, data: &[u8]) -> bool {
        let mut request = match (self.alloc_in)(data) {
            Ok(request) => request,
            Err(err) => {
                error!("Failed to allocate IN request: {err}");
                return false;
            }
        };
        request.set_completion(self.in_complete.clone());

        match self.ep_in.queue(request) {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to queue IN request on {}: {}", self.ep_in.name(), err.source);
                false
            }
        }
    }

    fn rearm_if_current(&self, request: UsbRequest, generation: u64) -> bool {
        let current = self.generation();
        *current == generation && self.rearm(request)
    }

    /// Callers hold the generation lock.
    fn rearm(&self, mut request: UsbRequest) -> bool {
        request.reset();
        match self.ep_out.queue(request) {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to requeue OUT request on {}: {}", self.ep_out.name(), err.source);
                false
            }
        }
    }
}

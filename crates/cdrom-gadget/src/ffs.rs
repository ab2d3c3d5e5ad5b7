//! [`Endpoint`] implementation over FunctionFS bulk endpoint files.
//!
//! Each endpoint runs one I/O thread that takes queued requests in order,
//! performs the blocking transfer and calls the request's completion.
//!
//! Every enable starts a new epoch and queued requests carry the epoch they
//! were queued in. The I/O thread cancels any request whose epoch is no
//! longer live, so nothing queued before a disable survives a re-enable.

use std::{
    io::ErrorKind,
    sync::{
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use bytes::{Bytes, BytesMut};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};
use usb_gadget::function::custom::{EndpointReceiver, EndpointSender};

use crate::{
    GadgetError,
    descriptors::EndpointDescriptor,
    endpoint::{Endpoint, QueueError, RequestStatus, UsbRequest},
};

/// How often a blocked transfer checks whether its endpoint was disabled.
const IO_POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Pipe {
    Out(EndpointReceiver),
    In(EndpointSender),
}

/// Enable epochs shared between an endpoint handle and its I/O thread.
#[derive(Default)]
struct PipeState {
    epoch: AtomicU64,
    enabled: AtomicBool,
    /// Epoch of the request the I/O thread currently holds.
    in_flight: Mutex<Option<u64>>,
    idle: Condvar,
}

impl PipeState {
    fn enable(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Ends the current epoch and returns the first epoch after it.
    fn disable(&self) -> u64 {
        self.enabled.store(false, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current(&self) -> Option<u64> {
        self.enabled
            .load(Ordering::SeqCst)
            .then(|| self.epoch.load(Ordering::SeqCst))
    }

    fn is_live(&self, epoch: u64) -> bool {
        self.current() == Some(epoch)
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<u64>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, epoch: u64) {
        *self.in_flight() = Some(epoch);
    }

    fn finish(&self) {
        *self.in_flight() = None;
        self.idle.notify_all();
    }

    /// Blocks until the I/O thread holds no request from before `epoch`.
    fn wait_settled(&self, epoch: u64) {
        let guard = self.in_flight();
        let _guard = self
            .idle
            .wait_while(guard, |held| held.is_some_and(|held| held < epoch))
            .unwrap_or_else(PoisonError::into_inner);
    }
}

type Tagged = (u64, UsbRequest);

pub struct FfsEndpoint {
    name: String,
    address: u8,
    state: Arc<PipeState>,
    tx: Mutex<Option<Sender<Tagged>>>,
    rx: Receiver<Tagged>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl FfsEndpoint {
    pub fn bulk_out(receiver: EndpointReceiver, address: u8) -> Result<Self, GadgetError> {
        Self::spawn(format!("ep{}out", address & 0x0f), address, Pipe::Out(receiver))
    }

    pub fn bulk_in(sender: EndpointSender, address: u8) -> Result<Self, GadgetError> {
        Self::spawn(format!("ep{}in", address & 0x0f), address, Pipe::In(sender))
    }

    fn spawn(name: String, address: u8, pipe: Pipe) -> Result<Self, GadgetError> {
        let state = Arc::new(PipeState::default());
        let (tx, rx) = unbounded();

        let thread_state = state.clone();
        let thread_rx = rx.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_pipe(pipe, thread_rx, thread_state))
            .map_err(|source| GadgetError::Spawn {
                name: "ffs-endpoint",
                source,
            })?;

        Ok(Self {
            name,
            address,
            state,
            tx: Mutex::new(Some(tx)),
            rx,
            join: Mutex::new(Some(join)),
        })
    }

    fn transport_error(&self, reason: impl Into<String>) -> GadgetError {
        GadgetError::Transport {
            endpoint: self.name.clone(),
            reason: reason.into(),
        }
    }
}

impl Endpoint for FfsEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn address(&self) -> u8 {
        self.address
    }

    fn enable(&self, descriptor: &EndpointDescriptor) -> Result<(), GadgetError> {
        debug!(
            "Enabling {} with max packet size {}",
            self.name, descriptor.max_packet_size
        );
        self.state.enable();
        Ok(())
    }

    fn disable(&self) {
        let next = self.state.disable();
        while let Ok((_, request)) = self.rx.try_recv() {
            request.complete(RequestStatus::Cancelled, 0);
        }
        self.state.wait_settled(next);
        debug!("Disabled {}", self.name);
    }

    fn queue(&self, request: UsbRequest) -> Result<(), QueueError> {
        let Some(epoch) = self.state.current() else {
            return Err(QueueError {
                request,
                source: self.transport_error("endpoint disabled"),
            });
        };

        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = tx.as_ref() else {
            return Err(QueueError {
                request,
                source: self.transport_error("endpoint closed"),
            });
        };
        tx.send((epoch, request)).map_err(|err| QueueError {
            request: err.into_inner().1,
            source: self.transport_error("endpoint thread exited"),
        })
    }
}

impl Drop for FfsEndpoint {
    fn drop(&mut self) {
        self.state.disable();
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(join) = self.join.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = join.join();
        }
    }
}

fn run_pipe(mut pipe: Pipe, rx: Receiver<Tagged>, state: Arc<PipeState>) {
    while let Ok((epoch, request)) = rx.recv() {
        state.begin(epoch);
        let live = || state.is_live(epoch);
        let (status, actual, request) = match &mut pipe {
            Pipe::Out(receiver) => receive(receiver, request, live),
            Pipe::In(sender) => send(sender, request, live),
        };
        request.complete(status, actual);
        state.finish();
    }
    debug!("Endpoint thread exiting");
}

fn receive(
    receiver: &mut EndpointReceiver,
    mut request: UsbRequest,
    live: impl Fn() -> bool,
) -> (RequestStatus, usize, UsbRequest) {
    loop {
        if !live() {
            return (RequestStatus::Cancelled, 0, request);
        }

        let capacity = request.buf().len();
        match receiver.recv_and_fetch_timeout(BytesMut::with_capacity(capacity), IO_POLL_INTERVAL) {
            Ok(data) => {
                let len = data.len().min(capacity);
                request.buf_mut()[..len].copy_from_slice(&data[..len]);
                return (RequestStatus::Complete, len, request);
            }
            Err(err) if err.kind() == ErrorKind::TimedOut => continue,
            Err(err) => {
                warn!("Bulk OUT receive failed: {err}");
                return (RequestStatus::Failed(err.to_string()), 0, request);
            }
        }
    }
}

fn send(
    sender: &mut EndpointSender,
    request: UsbRequest,
    live: impl Fn() -> bool,
) -> (RequestStatus, usize, UsbRequest) {
    if !live() {
        return (RequestStatus::Cancelled, 0, request);
    }

    let data = Bytes::copy_from_slice(request.buf());
    let len = data.len();
    loop {
        match sender.send_and_flush_timeout(data.clone(), IO_POLL_INTERVAL) {
            Ok(()) => return (RequestStatus::Complete, len, request),
            // A timed out send has already been cancelled.
            Err(err) if err.kind() == ErrorKind::TimedOut => {
                if !live() {
                    return (RequestStatus::Cancelled, 0, request);
                }
            }
            Err(err) => return (RequestStatus::Failed(err.to_string()), 0, request),
        }
    }
}

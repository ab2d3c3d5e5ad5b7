use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use cdrom_backing::BackingError;
use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, info, warn};
use usbd_scsi::Emulator;

use crate::{GadgetError, endpoint::UsbRequest, transport::BulkTransport};

const WORKER_THREAD_NAME: &str = "cdrom-worker";

/// Jobs for the command worker, the only context allowed to block on the
/// backing device.
pub enum Work {
    /// A received command request tagged with the transport generation it was armed in.
    Command {
        request: UsbRequest,
        generation: u64,
    },
    Open {
        reply: Sender<Result<(), BackingError>>,
    },
    Close {
        reply: Sender<()>,
    },
    PollMedia,
    /// Answered once every job queued before it has finished.
    Barrier {
        reply: Sender<()>,
    },
    Shutdown,
}

pub fn channel(queue_depth: usize) -> (Sender<Work>, Receiver<Work>) {
    bounded(queue_depth.max(1))
}

pub struct CommandWorker {
    tx: Sender<Work>,
    join: Option<JoinHandle<()>>,
}

impl CommandWorker {
    pub fn spawn(
        tx: Sender<Work>,
        rx: Receiver<Work>,
        transport: Arc<BulkTransport>,
        emulator: Emulator,
        response_capacity: usize,
    ) -> Result<Self, GadgetError> {
        let join = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(rx, transport, emulator, response_capacity))
            .map_err(|source| GadgetError::Spawn {
                name: WORKER_THREAD_NAME,
                source,
            })?;

        Ok(Self {
            tx,
            join: Some(join),
        })
    }

    pub fn sender(&self) -> Sender<Work> {
        self.tx.clone()
    }

    /// Opens the backing device on the worker and waits for the result.
    pub fn open(&self) -> Result<(), GadgetError> {
        let (reply, result) = bounded(1);
        self.tx
            .send(Work::Open { reply })
            .map_err(|_| GadgetError::WorkerUnavailable)?;
        Ok(result.recv().map_err(|_| GadgetError::WorkerUnavailable)??)
    }

    /// Closes the backing device once every queued command has run.
    pub fn close(&self) -> Result<(), GadgetError> {
        let (reply, done) = bounded(1);
        self.tx
            .send(Work::Close { reply })
            .map_err(|_| GadgetError::WorkerUnavailable)?;
        done.recv().map_err(|_| GadgetError::WorkerUnavailable)
    }

    /// Waits until the worker has finished everything queued so far.
    pub fn barrier(&self) -> Result<(), GadgetError> {
        let (reply, done) = bounded(1);
        self.tx
            .send(Work::Barrier { reply })
            .map_err(|_| GadgetError::WorkerUnavailable)?;
        done.recv().map_err(|_| GadgetError::WorkerUnavailable)
    }

    pub fn shutdown(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = self.tx.send(Work::Shutdown);
            if join.join().is_err() {
                warn!("Command worker panicked");
            }
        }
    }
}

impl Drop for CommandWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    rx: Receiver<Work>,
    transport: Arc<BulkTransport>,
    emulator: Emulator,
    response_capacity: usize,
) {
    let mut response = vec![0u8; response_capacity];
    let backing = emulator.backing().clone();

    while let Ok(work) = rx.recv() {
        match work {
            Work::Command {
                request,
                generation,
            } => {
                if let Some(report) =
                    transport.dispatch(&emulator, request, generation, &mut response)
                {
                    debug!("Command done: {report:?}");
                }
            }
            Work::Open { reply } => {
                let _ = reply.send(backing.open());
            }
            Work::Close { reply } => {
                backing.close();
                let _ = reply.send(());
            }
            Work::PollMedia => {
                if backing.poll_media_changed() {
                    info!("Media change detected on {}", backing.path().display());
                }
            }
            Work::Barrier { reply } => {
                let _ = reply.send(());
            }
            Work::Shutdown => break,
        }
    }

    let dropped = rx.try_iter().count();
    if dropped > 0 {
        debug!("Command worker released {dropped} queued jobs");
    }
}

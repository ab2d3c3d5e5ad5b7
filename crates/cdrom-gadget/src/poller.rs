use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use log::debug;

use crate::{GadgetError, worker::Work};

const POLLER_THREAD_NAME: &str = "cdrom-media-poller";

/// Periodically asks the command worker to check for a media change.
///
/// A tick is skipped while the worker still has queued work.
pub struct MediaPoller {
    stop: Option<Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl MediaPoller {
    pub fn spawn(work: Sender<Work>, interval: Duration) -> Result<Self, GadgetError> {
        let (stop, stopped) = bounded(1);
        let join = thread::Builder::new()
            .name(POLLER_THREAD_NAME.to_string())
            .spawn(move || run_poller(work, stopped, interval))
            .map_err(|source| GadgetError::Spawn {
                name: POLLER_THREAD_NAME,
                source,
            })?;

        Ok(Self {
            stop: Some(stop),
            join: Some(join),
        })
    }

    pub fn stop(&mut self) {
        // Disconnecting wakes the thread.
        self.stop.take();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for MediaPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_poller(work: Sender<Work>, stopped: Receiver<()>, interval: Duration) {
    loop {
        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if !work.is_empty() {
                    continue;
                }
                match work.try_send(Work::PollMedia) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Disconnected(_)) => break,
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Media poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn submits_polls_until_stopped() {
        let (tx, rx) = bounded(4);
        let mut poller = MediaPoller::spawn(tx, Duration::from_millis(10)).unwrap();

        let work = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(work, Work::PollMedia));

        poller.stop();
        while rx.try_recv().is_ok() {}
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    pub fn skips_ticks_while_worker_is_busy() {
        let (tx, rx) = bounded(4);
        tx.send(Work::Shutdown).unwrap();
        let mut poller = MediaPoller::spawn(tx, Duration::from_millis(5)).unwrap();

        std::thread::sleep(Duration::from_millis(50));
        poller.stop();
        assert_eq!(rx.len(), 1);
    }
}

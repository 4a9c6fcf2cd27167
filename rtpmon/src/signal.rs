//! One-shot signals shared between probe tasks
//!
//! Both signals are built on crossbeam channels so that tasks can wait on
//! them inside `select!` next to their packet or ticker channels.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Create a linked first-packet gate and waiter
pub fn first_packet_gate() -> (FirstPacketGate, FirstPacketWaiter) {
    let (tx, rx) = channel::bounded(1);
    (FirstPacketGate { tx: Some(tx) }, FirstPacketWaiter { rx })
}

/// Firing side of the "first packet observed" signal
#[derive(Debug)]
pub struct FirstPacketGate {
    tx: Option<Sender<()>>,
}

impl FirstPacketGate {
    /// Open the gate; returns true only on the first call
    pub fn fire(&mut self) -> bool {
        match self.tx.take() {
            Some(tx) => {
                // The waiter may already be gone; nothing to release then
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Whether the gate has been opened
    pub fn has_fired(&self) -> bool {
        self.tx.is_none()
    }
}

/// Waiting side of the "first packet observed" signal
#[derive(Debug)]
pub struct FirstPacketWaiter {
    rx: Receiver<()>,
}

impl FirstPacketWaiter {
    /// Block until the first packet is observed
    ///
    /// Returns false if the gate was dropped without firing.
    pub fn wait(self) -> bool {
        self.rx.recv().is_ok()
    }

    /// Block for at most `timeout`; hands the waiter back if it did not open
    pub fn wait_timeout(self, timeout: Duration) -> Result<bool, Self> {
        match self.rx.recv_timeout(timeout) {
            Ok(()) => Ok(true),
            Err(RecvTimeoutError::Disconnected) => Ok(false),
            Err(RecvTimeoutError::Timeout) => Err(self),
        }
    }
}

/// Create a linked shutdown trigger and listener
pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownListener) {
    let (tx, rx) = channel::bounded(0);
    (ShutdownTrigger { tx: Some(tx) }, ShutdownListener { rx })
}

/// Broadcasts shutdown to every listener by disconnecting the channel
///
/// Dropping the trigger signals shutdown as well.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: Option<Sender<()>>,
}

impl ShutdownTrigger {
    /// Signal shutdown; idempotent
    pub fn trigger(&mut self) {
        self.tx = None;
    }
}

/// Cloneable shutdown listener
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: Receiver<()>,
}

impl ShutdownListener {
    /// Whether shutdown has been signalled
    pub fn is_triggered(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Channel that becomes ready (disconnected) on shutdown, for `select!`
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_gate_fires_once() {
        let (mut gate, waiter) = first_packet_gate();
        assert!(!gate.has_fired());
        assert!(gate.fire());
        assert!(!gate.fire());
        assert!(gate.has_fired());
        assert!(waiter.wait());
    }

    #[test]
    fn test_gate_releases_waiting_thread() {
        let (mut gate, waiter) = first_packet_gate();
        let handle = thread::spawn(move || waiter.wait());

        thread::sleep(Duration::from_millis(10));
        gate.fire();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_dropped_gate_releases_with_false() {
        let (gate, waiter) = first_packet_gate();
        drop(gate);
        assert!(!waiter.wait());
    }

    #[test]
    fn test_wait_timeout_hands_back_waiter() {
        let (mut gate, waiter) = first_packet_gate();
        let waiter = waiter
            .wait_timeout(Duration::from_millis(5))
            .expect_err("gate has not fired");

        gate.fire();
        assert_eq!(waiter.wait_timeout(Duration::from_millis(5)).ok(), Some(true));
    }

    #[test]
    fn test_shutdown_reaches_all_listeners() {
        let (mut trigger, listener) = shutdown_channel();
        let other = listener.clone();
        assert!(!listener.is_triggered());

        trigger.trigger();
        assert!(listener.is_triggered());
        assert!(other.is_triggered());
        trigger.trigger();
    }
}

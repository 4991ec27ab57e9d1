//! Engine-to-GUI event reporting.

use std::sync::mpsc::Sender;

/// Events the engine publishes while running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverEvent {
    /// Human-readable status line for the log and status display.
    Status(String),
    /// A newly accepted countdown reading, minutes and seconds.
    Timer(u32, u32),
    /// The run reached a terminal state.
    Completed,
}

/// Receives engine events. Implementations must tolerate being called from
/// the worker thread at poll cadence.
pub trait ObserverSink: Send {
    fn status(&mut self, message: &str);
    fn timer(&mut self, minutes: u32, seconds: u32);
    fn completed(&mut self);
}

/// Forwards events over an mpsc channel to the GUI. A disconnected receiver
/// is ignored so a closed window never kills the worker.
pub struct ChannelSink {
    tx: Sender<ObserverEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<ObserverEvent>) -> Self {
        Self { tx }
    }
}

impl ObserverSink for ChannelSink {
    fn status(&mut self, message: &str) {
        crate::log(message);
        let _ = self.tx.send(ObserverEvent::Status(message.to_string()));
    }

    fn timer(&mut self, minutes: u32, seconds: u32) {
        let _ = self.tx.send(ObserverEvent::Timer(minutes, seconds));
    }

    fn completed(&mut self) {
        let _ = self.tx.send(ObserverEvent::Completed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_channel_sink_forwards_events() {
        let (tx, rx) = mpsc::channel();
        let mut sink = ChannelSink::new(tx);
        sink.status("armed");
        sink.timer(0, 59);
        sink.completed();

        assert_eq!(rx.recv().unwrap(), ObserverEvent::Status("armed".into()));
        assert_eq!(rx.recv().unwrap(), ObserverEvent::Timer(0, 59));
        assert_eq!(rx.recv().unwrap(), ObserverEvent::Completed);
    }

    #[test]
    fn test_disconnected_receiver_is_ignored() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        // Must not panic.
        sink.status("late");
        sink.completed();
    }
}

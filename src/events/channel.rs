//! Crossbeam-backed event channel.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Cloneable sending half handed to the engine and importer
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Events sent after the receiver is gone are dropped.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receiving half, owned by whatever renders progress
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Ends when every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

pub struct EventChannel;

impl EventChannel {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// Sender whose receiver is already gone, for headless runs and tests
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

//! Event channel implementation using crossbeam-channel.
//!
//! Provides a thread-safe way to send events from the pipeline stages
//! to whatever is watching the run.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Sends events from the pipeline stages.
///
/// Cheap to clone; each stage holds its own copy.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event.
    ///
    /// If the receiver is dropped, the event is silently discarded so that
    /// progress reporting stays optional.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Receives events from the pipeline.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Returns an iterator over received events
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create a new unbounded event channel.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }

    /// Create a bounded event channel with the specified capacity.
    ///
    /// A slow subscriber then throttles the pipeline instead of letting
    /// events pile up.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        let (sender, receiver) = bounded(capacity);
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose events go nowhere.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{PipelineEvent, WalkEvent};
    use std::path::PathBuf;
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Walk(WalkEvent::FileFound {
                path: PathBuf::from("/backups/a.jpg"),
            }));
        });

        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Walk(WalkEvent::FileFound { path }) => {
                assert_eq!(path, PathBuf::from("/backups/a.jpg"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Pipeline(PipelineEvent::Started));
    }

    #[test]
    fn receiver_iteration_ends_when_senders_drop() {
        let (sender, receiver) = EventChannel::bounded(4);
        sender.send(Event::Pipeline(PipelineEvent::Started));
        sender.send(Event::Pipeline(PipelineEvent::Started));
        drop(sender);

        assert_eq!(receiver.iter().count(), 2);
        assert!(receiver.try_recv().is_none());
    }
}

//! The fingerprinting stage of the pipeline.

use super::{ContentHasher, FingerprintedItem};
use crate::core::scanner::WorkItem;
use crate::events::{Event, EventSender, HashEvent};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error};

/// Message from the fingerprinter to the merge engine.
///
/// A dropped item travels on only as its sequence number, so the merge
/// engine can keep walk order when several fingerprinters run at once.
#[derive(Debug)]
pub enum Fingerprinted {
    /// Item hashed successfully
    Hashed(FingerprintedItem),
    /// Item could not be read; nothing to merge
    Dropped { seq: u64 },
}

impl Fingerprinted {
    /// Walk-order position of the message
    pub fn seq(&self) -> u64 {
        match self {
            Fingerprinted::Hashed(item) => item.seq(),
            Fingerprinted::Dropped { seq } => *seq,
        }
    }
}

/// Worker that hashes work items and forwards them downstream
pub struct Fingerprinter {
    hasher: ContentHasher,
    events: EventSender,
}

impl Fingerprinter {
    /// Create a fingerprinter reporting through `events`
    pub fn new(hasher: ContentHasher, events: EventSender) -> Self {
        Self { hasher, events }
    }

    /// Hash a single item. Failures are logged and yield `Dropped`.
    pub fn fingerprint(&self, item: WorkItem) -> Fingerprinted {
        match self.hasher.hash_file(item.source_path()) {
            Ok(digest) => {
                debug!(path = %item.source_path().display(), %digest, "hashed file");
                self.events.send(Event::Hash(HashEvent::FileHashed {
                    path: item.source_path().to_path_buf(),
                    digest: digest.to_hex(),
                }));
                Fingerprinted::Hashed(item.with_digest(digest))
            }
            Err(e) => {
                error!(path = %item.source_path().display(), "couldn't calculate checksum: {}", e);
                self.events.send(Event::Hash(HashEvent::Error {
                    path: item.source_path().to_path_buf(),
                    message: e.to_string(),
                }));
                Fingerprinted::Dropped { seq: item.seq() }
            }
        }
    }

    /// Consume `input` until it is closed and drained.
    ///
    /// `output` is dropped on return; once every fingerprinter holding a
    /// clone has returned, the merge engine's queue is closed.
    /// Returns the number of items dropped.
    pub fn run(&self, input: Receiver<WorkItem>, output: Sender<Fingerprinted>) -> usize {
        let mut dropped = 0;

        for item in input.iter() {
            let message = self.fingerprint(item);
            if matches!(message, Fingerprinted::Dropped { .. }) {
                dropped += 1;
            }
            if output.send(message).is_err() {
                error!("merge engine stopped accepting work");
                break;
            }
        }

        dropped
    }
}

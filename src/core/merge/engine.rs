//! Merge engine implementation.

use super::MergeReport;
use crate::core::hasher::{Fingerprinted, FingerprintedItem};
use crate::core::index::DigestIndex;
use crate::core::transfer::{TransferMethod, TransferOutcome, Transferer};
use crate::error::{IndexError, TransferError};
use crate::events::{Event, EventSender, MergeEvent};
use crossbeam_channel::Receiver;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// What the engine did with one item
#[derive(Debug)]
pub enum MergeOutcome {
    /// New content, placed at the destination
    Transferred(TransferOutcome),
    /// Content already placed earlier in the run
    Duplicate,
    /// New content, but the transfer failed
    TransferFailed(TransferError),
    /// The index could not be consulted
    IndexFailed(IndexError),
}

/// Applies the dedup rule and owns the digest index
pub struct MergeEngine {
    index: Box<dyn DigestIndex>,
    transferer: Transferer,
    events: EventSender,
    report: MergeReport,
}

impl MergeEngine {
    /// Create an engine that takes exclusive ownership of `index`
    pub fn new(index: Box<dyn DigestIndex>, transferer: Transferer, events: EventSender) -> Self {
        Self {
            index,
            transferer,
            events,
            report: MergeReport::default(),
        }
    }

    /// Counters so far
    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    /// Finish and hand back the counters; the index is dropped here.
    pub fn into_report(self) -> MergeReport {
        self.report
    }

    /// Apply the dedup rule to one item
    pub fn process(&mut self, item: FingerprintedItem) -> MergeOutcome {
        let source = item.source_path();
        let dest = item.dest_path();

        match self.index.get(item.digest()) {
            Ok(None) => {}
            Ok(Some(first)) => {
                debug!(
                    path = %source.display(),
                    first = %first.display(),
                    "skipping file since its content already exists"
                );
                self.report.duplicates += 1;
                self.events.send(Event::Merge(MergeEvent::DuplicateSkipped {
                    source: source.to_path_buf(),
                    digest: item.digest().to_hex(),
                }));
                return MergeOutcome::Duplicate;
            }
            Err(e) => {
                error!(
                    path = %source.display(),
                    "unable to check whether content exists: {}. Skipping.",
                    e
                );
                self.report.index_errors += 1;
                self.events.send(Event::Merge(MergeEvent::IndexError {
                    source: source.to_path_buf(),
                    message: e.to_string(),
                }));
                return MergeOutcome::IndexFailed(e);
            }
        }

        match self.transferer.transfer(source, dest) {
            Ok(outcome) => {
                if let Err(e) = self.index.set(item.digest(), source) {
                    // The file is placed; a later duplicate will hit the
                    // exclusive-create check or land a second copy.
                    error!(path = %source.display(), "unable to record digest: {}", e);
                    self.report.index_errors += 1;
                    self.events.send(Event::Merge(MergeEvent::IndexError {
                        source: source.to_path_buf(),
                        message: e.to_string(),
                    }));
                }

                self.report.transferred += 1;
                self.report.bytes_transferred += outcome.bytes;
                if matches!(outcome.method, TransferMethod::CopiedAfterRenameFailed { .. }) {
                    self.report.fallback_copies += 1;
                }

                self.events.send(Event::Merge(MergeEvent::Transferred {
                    source: source.to_path_buf(),
                    destination: dest.to_path_buf(),
                    bytes: outcome.bytes,
                }));
                MergeOutcome::Transferred(outcome)
            }
            Err(e) => {
                error!(
                    from = %source.display(),
                    to = %dest.display(),
                    "couldn't transfer file: {}",
                    e
                );
                self.report.transfer_failures += 1;
                self.events.send(Event::Merge(MergeEvent::TransferFailed {
                    source: source.to_path_buf(),
                    message: e.to_string(),
                }));
                MergeOutcome::TransferFailed(e)
            }
        }
    }

    /// Consume fingerprinted items until the queue is closed and drained.
    ///
    /// Messages may arrive out of walk order when several fingerprinters
    /// feed the queue; they are buffered and processed strictly by
    /// sequence number.
    pub fn run(&mut self, input: Receiver<Fingerprinted>) {
        let mut next_seq = 0u64;
        let mut pending: BTreeMap<u64, Fingerprinted> = BTreeMap::new();

        for message in input.iter() {
            pending.insert(message.seq(), message);

            while let Some(message) = pending.remove(&next_seq) {
                self.handle(message);
                next_seq += 1;
            }
        }

        // A fingerprinter that stopped early can leave gaps behind
        for (_, message) in std::mem::take(&mut pending) {
            self.handle(message);
        }
    }

    fn handle(&mut self, message: Fingerprinted) {
        match message {
            Fingerprinted::Hashed(item) => {
                self.process(item);
            }
            Fingerprinted::Dropped { .. } => self.report.hash_failures += 1,
        }
    }
}

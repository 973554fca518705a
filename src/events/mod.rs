//! # Events Module
//!
//! Event-driven progress reporting for the merge pipeline.
//!
//! ## Design
//! Every stage receives an `EventSender` when it is constructed and reports
//! what it did through it. Nothing is printed from a global; a UI subscribes
//! to the receiver and decides what to show.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Merge(MergeEvent::Transferred { destination, .. }) = event {
//!             println!("placed {}", destination.display());
//!         }
//!     }
//! });
//!
//! pipeline.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;

//! # Events Module
//!
//! Progress reporting for detection requests, batches and model loading.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Batch(BatchEvent::Progress(p)) = event {
//!             println!("{}/{} checked, {} flagged", p.completed, p.total, p.flagged);
//!         }
//!     }
//! });
//!
//! detector.detect_batch(&paths, &sender);
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;

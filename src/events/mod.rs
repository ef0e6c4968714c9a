//! # Events Module
//!
//! Progress reporting for scans, disposals and imports.
//!
//! ## Design
//! The core library emits events through channels, so the CLI (or any
//! other front end) can render progress without the engine knowing about it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Scan(ScanEvent::Progress(p)) = event {
//!             println!("Classified {}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! detector.scan_with_events(&root, &token, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;

//! # Events Module
//!
//! Progress and completion notifications for any front end.
//!
//! ## Design
//! The core emits events through a channel. The CLI drives a progress bar
//! from `DistanceEvent::Progress` and reports the outcome from
//! `PipelineEvent::Finished`, which every run emits exactly once.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Distance(DistanceEvent::Progress(p)) => {
//!                 println!("Computing distances: {}%", p.percent())
//!             }
//!             Event::Pipeline(PipelineEvent::Finished { success, message }) => {
//!                 println!("{success}: {message}")
//!             }
//!             _ => {}
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

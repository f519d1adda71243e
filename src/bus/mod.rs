//! In-process event bus for monitor status, snapshot and alert events.
//!
//! The event bus provides:
//! - Publish-subscribe fan-out of monitor events
//! - Event batching before events leave the process
//!
//! # Architecture
//!
//! Events flow from the broadcaster → EventBus → EventBatcher → sink:
//! - `EventBus`: In-memory broadcast channel for immediate distribution
//! - `EventBatcher`: Buffers events (100ms/50 events) before handing them to a `BatchSink`
//! - Status and alert events bypass the buffer so degraded state shows up at once

mod batcher;
mod event_bus;
pub mod event_types;

pub use batcher::{BatchSink, EventBatcher, JsonLinesSink};
pub use event_bus::{BusEvent, EventBus};

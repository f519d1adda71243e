//! Remote seismic feed access.
//!
//! ## Structure
//!
//! - `types`: Event model and feed window enum
//! - `error`: Per-attempt and terminal fetch errors
//! - `traits`: `EventSource` seam consumed by the broadcaster
//! - `parse`: GeoJSON feature collection parsing
//! - `client`: Single-attempt HTTP client
//! - `fetcher`: Retrying `EventSource` built on the client

mod parse;

pub mod client;
pub mod error;
pub mod fetcher;
pub mod traits;
pub mod types;

pub use client::{FeedClient, DEFAULT_FEED_BASE_URL};
pub use error::{FeedError, FetchFailure};
pub use fetcher::{Fetcher, RetryPolicy};
pub use parse::parse_feature_collection;
pub use traits::EventSource;
pub use types::{FeedWindow, QuakeEvent};

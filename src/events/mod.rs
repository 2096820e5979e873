// src/events/mod.rs

//! Asset-event notification channel: announces freshly compiled outputs
//! to external consumers (e.g. a running game hot-reloading assets) over
//! a length-prefixed TCP stream.

pub mod service;
pub mod wire;

pub use service::{AssetEventService, AssetEventSink, DEFAULT_EVENT_PORT};
pub use wire::MessageKind;

// src/intake/mod.rs — Inbound message handling for the watched channel

pub mod dedup;
pub mod event;
pub mod pipeline;
pub mod reply;

pub use dedup::EventDeduplicator;
pub use event::{FilterReason, MessageEvent};
pub use pipeline::{EventOutcome, IntakePipeline, MatchOutcome, PipelineSettings};

//! # Callflow Audit
//!
//! Append-only record of every transition the engine makes.
//!
//! The webhook path never waits on the sink: [`InteractionLogger::record`]
//! enqueues onto a bounded channel and a background task drains it into an
//! [`InteractionSink`](callflow_core::event::InteractionSink). A full queue
//! or a failing sink costs log records, never a call.

pub mod logger;
pub mod sink;

pub use logger::{InteractionLogger, LoggerTask};
pub use sink::{JsonLinesSink, MemorySink, TracingSink};

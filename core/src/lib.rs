//! Callflow Core - protocol-agnostic building blocks of the call-flow engine.
//!
//! - `model`: the authored `Flow` / `Step` graph
//! - `turn`: the per-webhook `CallTurn` and the `InteractionLogEntry` audit record
//! - `synapse` / `event`: contracts for the external flow store and log sink
//! - `config`: engine configuration
//! - `error`: the engine failure taxonomy

pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod synapse;
pub mod turn;

pub mod prelude {
    pub use crate::config::{EngineConfig, Mode, SignaturePolicy};
    pub use crate::error::{EngineError, RepositoryError, SinkError};
    pub use crate::event::InteractionSink;
    pub use crate::model::{Flow, FlowCatalog, PhoneLine, Step, StepOptions, StepType};
    pub use crate::synapse::FlowRepository;
    pub use crate::turn::{CallTurn, InteractionLogEntry};
}

pub use error::EngineError;
pub use model::{Flow, Step, StepType};
pub use turn::{CallTurn, InteractionLogEntry};

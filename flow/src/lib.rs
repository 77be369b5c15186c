//! Callflow Flow - Step Resolution Layer
//!
//! This crate defines the **structural** aspects of a call:
//! - `Resolution`: the outcome of one webhook's transition
//! - `resolve`: the single-edge state transition function
//! - `lint`: authoring-time checks over a `Flow`
//!
//! **IMPORTANT**: This layer is Pure Rust - no HTTP, no IO, no Async.
//! Resolving the same `(flow, step, input)` twice yields the same result.

pub mod lint;
pub mod state;
pub mod transition;

pub use lint::{FlowIssue, IssueKind, Severity, is_dtmf_key, lint};
pub use state::{Edge, Resolution};
pub use transition::{ResolveError, fallback_step, resolve};

//! # Callflow Guard
//!
//! Request guard for carrier webhooks. The carrier signs every webhook with
//! the account auth token; [`SignatureGuard`] verifies the signature and
//! applies the configured [`SignaturePolicy`](callflow_core::config::SignaturePolicy).
//!
//! ```text
//! Enforce  + bad signature  -> EngineError::AuthenticationFailure (401)
//! LogOnly  + bad signature  -> warn!, request served
//! ```

pub mod policy;
pub mod signature;

pub use policy::{SignatureGuard, Verdict};
pub use signature::{SIGNATURE_HEADER, SignatureValidator};

//! Callflow HTTP - carrier webhook ingress
//!
//! Hyper 1.0 native. Decodes the carrier's form-encoded webhooks into
//! [`WebhookRequest`](callflow_runtime::WebhookRequest)s, reconstructs the
//! URL the carrier signed, and writes the controller's reply back as
//! `text/xml`.

pub mod ingress;
pub mod request;

pub use ingress::{HttpIngress, IngressError, MAX_BODY_BYTES};
pub use request::{decode_pairs, external_base_url};

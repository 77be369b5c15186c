//! Callflow Runtime - the Webhook Controller
//!
//! Wires the pure layers (`callflow-flow`, `callflow-voice`) to their async
//! collaborators: the flow repository, the signature guard and the
//! interaction logger. Transport-agnostic; `callflow-http` feeds it.

pub mod controller;
pub mod repository;
pub mod route;

pub mod prelude {
    pub use crate::controller::{WebhookController, WebhookReply, WebhookRequest};
    pub use crate::repository::InMemoryFlowRepository;
    pub use crate::route::WebhookRoute;
}

pub use controller::{WebhookController, WebhookReply, WebhookRequest};
pub use repository::InMemoryFlowRepository;
pub use route::WebhookRoute;

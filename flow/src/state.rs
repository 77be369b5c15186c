//! Resolution - where the call goes next
//!
//! Every webhook advances the state machine by at most one edge. The
//! `Resolution` says which edge (if any) was taken and which step the
//! response must render.

use callflow_core::model::{DEFAULT_TRANSITION_KEY, Step};

/// The transition-table key that selected the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    /// Exact caller-input match.
    Input(String),
    /// The reserved `default` key.
    Default,
}

impl Edge {
    pub fn key(&self) -> &str {
        match self {
            Edge::Input(key) => key,
            Edge::Default => DEFAULT_TRANSITION_KEY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'f> {
    /// An edge was taken. `used_fallback` is set when the edge target did
    /// not exist and the fallback policy picked `step`.
    Advance {
        from: &'f Step,
        edge: Edge,
        step: &'f Step,
        used_fallback: bool,
    },
    /// No edge matched; the call stays on `step`.
    Stay { step: &'f Step },
}

impl<'f> Resolution<'f> {
    /// The step to render for this webhook.
    pub fn step(&self) -> &'f Step {
        match self {
            Resolution::Advance { step, .. } | Resolution::Stay { step } => step,
        }
    }

    pub fn used_fallback(&self) -> bool {
        matches!(
            self,
            Resolution::Advance {
                used_fallback: true,
                ..
            }
        )
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, Resolution::Stay { .. })
    }

    pub fn edge(&self) -> Option<&Edge> {
        match self {
            Resolution::Advance { edge, .. } => Some(edge),
            Resolution::Stay { .. } => None,
        }
    }
}

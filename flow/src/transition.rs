//! Transition - the single-edge state transition function
//!
//! States are `(flow id, step id)` pairs. One call to [`resolve`] moves along
//! at most one edge; multi-hop advancement happens through carrier redirects,
//! never by chaining here.

use crate::state::{Edge, Resolution};
use callflow_core::model::{Flow, Step};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("flow `{flow_id}` has no steps")]
    EmptyFlow { flow_id: String },
}

/// Compute the next state of `flow` from the round-tripped step id and the
/// caller input.
///
/// 1. The current step is `current_step_id`, or the entry step when the id is
///    absent or unknown.
/// 2. An exact input match wins over `default`; no match and no `default`
///    yields [`Resolution::Stay`].
/// 3. A target id that does not exist is replaced by [`fallback_step`] and
///    flagged with `used_fallback`.
pub fn resolve<'f>(
    flow: &'f Flow,
    current_step_id: Option<&str>,
    caller_input: Option<&str>,
) -> Result<Resolution<'f>, ResolveError> {
    let current = current_step_id
        .and_then(|id| flow.step(id))
        .or_else(|| flow.entry_step())
        .ok_or_else(|| ResolveError::EmptyFlow {
            flow_id: flow.id.clone(),
        })?;

    let selected = caller_input
        .and_then(|input| {
            current
                .target_for(input)
                .map(|target| (Edge::Input(input.to_string()), target))
        })
        .or_else(|| current.default_target().map(|target| (Edge::Default, target)));

    let Some((edge, target_id)) = selected else {
        return Ok(Resolution::Stay { step: current });
    };

    let (step, used_fallback) = match flow.step(target_id) {
        Some(step) => (step, false),
        None => (fallback_step(flow).unwrap_or(current), true),
    };

    Ok(Resolution::Advance {
        from: current,
        edge,
        step,
        used_fallback,
    })
}

/// The recovery target for an unresolvable reference: `main_menu`, else the
/// first step of the flow.
pub fn fallback_step(flow: &Flow) -> Option<&Step> {
    flow.main_menu().or_else(|| flow.steps.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn front_desk() -> Flow {
        serde_json::from_value(json!({
            "id": "flow-1",
            "name": "Front desk",
            "isActive": true,
            "phoneLineId": "line-1",
            "steps": [
                { "id": "welcome", "type": "welcome", "message": "Welcome",
                  "nextSteps": { "default": "main_menu" } },
                { "id": "main_menu", "type": "menu", "message": "Press 1 for sales, 2 for support",
                  "nextSteps": { "1": "sales", "2": "support", "3": "billing", "default": "main_menu" } },
                { "id": "sales", "type": "transfer", "message": "Connecting you to sales",
                  "options": { "transferNumber": "+15550101" } },
                { "id": "support", "type": "record", "message": "Leave a message" },
                { "id": "account", "type": "gather", "message": "Enter your account number",
                  "nextSteps": { "1234": "support" } },
                { "id": "goodbye", "type": "hangup", "message": "Goodbye" }
            ]
        }))
        .unwrap()
    }

    fn advanced_to<'f>(resolution: &Resolution<'f>) -> &'f str {
        match resolution {
            Resolution::Advance { step, .. } => &step.id,
            Resolution::Stay { step } => panic!("expected advance, stayed on {}", step.id),
        }
    }

    #[test]
    fn test_exact_input_match() {
        let flow = front_desk();
        let res = resolve(&flow, Some("main_menu"), Some("1")).unwrap();

        assert_eq!(advanced_to(&res), "sales");
        assert_eq!(res.edge(), Some(&Edge::Input("1".into())));
        assert!(!res.used_fallback());
    }

    #[test]
    fn test_exact_match_beats_default() {
        let flow = front_desk();
        let res = resolve(&flow, Some("main_menu"), Some("2")).unwrap();
        assert_eq!(advanced_to(&res), "support");
    }

    #[test]
    fn test_unmapped_input_takes_default() {
        let flow = front_desk();
        let res = resolve(&flow, Some("main_menu"), Some("9")).unwrap();

        assert_eq!(advanced_to(&res), "main_menu");
        assert_eq!(res.edge(), Some(&Edge::Default));
        assert!(!res.used_fallback());
    }

    #[test]
    fn test_no_input_takes_default() {
        let flow = front_desk();
        let res = resolve(&flow, Some("welcome"), None).unwrap();
        assert_eq!(advanced_to(&res), "main_menu");
    }

    #[test]
    fn test_no_match_and_no_default_stays() {
        let flow = front_desk();
        let res = resolve(&flow, Some("account"), Some("0000")).unwrap();

        assert!(res.is_stay());
        assert_eq!(res.step().id, "account");
        assert_eq!(res.edge(), None);
        assert!(!res.used_fallback());
    }

    #[test]
    fn test_dangling_target_falls_back_to_main_menu() {
        let flow = front_desk();
        let res = resolve(&flow, Some("main_menu"), Some("3")).unwrap();

        assert_eq!(advanced_to(&res), "main_menu");
        assert!(res.used_fallback());
    }

    #[test]
    fn test_dangling_target_without_main_menu_uses_first_step() {
        let mut flow = front_desk();
        flow.steps.retain(|step| step.id != "main_menu");
        flow.steps[0]
            .next_steps
            .insert("default".into(), "nowhere".into());

        let res = resolve(&flow, Some("welcome"), None).unwrap();
        assert_eq!(advanced_to(&res), "welcome");
        assert!(res.used_fallback());
    }

    #[test]
    fn test_missing_current_step_starts_at_entry() {
        let flow = front_desk();

        let absent = resolve(&flow, None, None).unwrap();
        let unknown = resolve(&flow, Some("deleted_step"), None).unwrap();

        for res in [absent, unknown] {
            match res {
                Resolution::Advance { from, step, .. } => {
                    assert_eq!(from.id, "welcome");
                    assert_eq!(step.id, "main_menu");
                }
                Resolution::Stay { .. } => panic!("entry step has a default edge"),
            }
        }
    }

    #[test]
    fn test_resolution_is_pure() {
        let flow = front_desk();
        for (step, input) in [
            (Some("main_menu"), Some("1")),
            (Some("main_menu"), Some("3")),
            (Some("account"), None),
            (None, None),
        ] {
            let first = resolve(&flow, step, input).unwrap();
            let second = resolve(&flow, step, input).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_empty_flow_is_an_error() {
        let mut flow = front_desk();
        flow.steps.clear();
        assert_eq!(
            resolve(&flow, Some("main_menu"), Some("1")),
            Err(ResolveError::EmptyFlow {
                flow_id: "flow-1".into()
            })
        );
    }

    #[test]
    fn test_fallback_step() {
        let mut flow = front_desk();
        assert_eq!(fallback_step(&flow).map(|s| s.id.as_str()), Some("main_menu"));

        flow.steps.retain(|step| step.id != "main_menu");
        assert_eq!(fallback_step(&flow).map(|s| s.id.as_str()), Some("welcome"));
    }
}

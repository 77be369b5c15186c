//! Continuation URLs.
//!
//! The step id rides in the `step` query parameter of every URL the engine
//! hands to the carrier. The next webhook is self-describing as a result.

use callflow_core::turn::{REPLAY_PARAM, STEP_PARAM};

/// Engine routes, relative to the public base URL.
pub mod paths {
    /// Main webhook; every continuation lands here unless noted otherwise.
    pub const VOICE: &str = "/voice";
    /// Input-processing endpoint for `gather` steps without a custom action.
    pub const GATHER: &str = "/voice/gather";
    /// `record` action: closing remark after the caller finishes recording.
    pub const RECORDED: &str = "/voice/recorded";
    pub const RECORDING_STATUS: &str = "/voice/recording-status";
    pub const TRANSCRIPTION: &str = "/voice/transcription";
    pub const CALL_STATUS: &str = "/voice/call-status";
}

/// Builds continuation URLs under the externally visible base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    base_url: String,
}

impl Continuation {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}{path}?step={step_id}`
    pub fn url(&self, path: &str, step_id: &str) -> String {
        let query = serde_urlencoded::to_string(&[(STEP_PARAM, step_id)]).unwrap_or_default();
        format!("{}{}?{}", self.base_url, path, query)
    }

    pub fn voice(&self, step_id: &str) -> String {
        self.url(paths::VOICE, step_id)
    }

    /// `{base}/voice?step={step_id}&replay=1`: the next webhook renders
    /// `step_id` again without taking an edge from it.
    pub fn replay(&self, step_id: &str) -> String {
        let query = serde_urlencoded::to_string(&[(STEP_PARAM, step_id), (REPLAY_PARAM, "1")])
            .unwrap_or_default();
        format!("{}{}?{}", self.base_url, paths::VOICE, query)
    }

    /// An author-supplied URL; relative paths are resolved against the base.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

/// Extract the step id from a continuation URL.
pub fn step_from_url(url: &str) -> Option<String> {
    query_param(url, STEP_PARAM)
}

/// Whether a continuation URL asks for its step to be rendered again.
pub fn is_replay_url(url: &str) -> bool {
    query_param(url, REPLAY_PARAM).is_some_and(|value| value == "1")
}

fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).ok()?;
    pairs
        .into_iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_step() {
        let urls = Continuation::new("https://ivr.example.com/");
        assert_eq!(urls.base_url(), "https://ivr.example.com");
        assert_eq!(
            urls.voice("main_menu"),
            "https://ivr.example.com/voice?step=main_menu"
        );
        assert_eq!(
            urls.url(paths::GATHER, "a b&c"),
            "https://ivr.example.com/voice/gather?step=a+b%26c"
        );
    }

    #[test]
    fn test_step_round_trips() {
        let urls = Continuation::new("https://ivr.example.com");
        for id in ["main_menu", "a b&c", "ünïcode", "1=2"] {
            assert_eq!(step_from_url(&urls.voice(id)).as_deref(), Some(id));
        }
        assert_eq!(step_from_url("https://ivr.example.com/voice"), None);
    }

    #[test]
    fn test_replay_url_keeps_the_step() {
        let urls = Continuation::new("https://ivr.example.com");
        let replay = urls.replay("main_menu");
        assert_eq!(
            replay,
            "https://ivr.example.com/voice?step=main_menu&replay=1"
        );
        assert_eq!(step_from_url(&replay).as_deref(), Some("main_menu"));
        assert!(is_replay_url(&replay));
        assert!(!is_replay_url(&urls.voice("main_menu")));
    }

    #[test]
    fn test_resolve_custom_action() {
        let urls = Continuation::new("https://ivr.example.com");
        assert_eq!(
            urls.resolve("https://other.test/hook"),
            "https://other.test/hook"
        );
        assert_eq!(
            urls.resolve("/custom/input"),
            "https://ivr.example.com/custom/input"
        );
        assert_eq!(
            urls.resolve("custom/input"),
            "https://ivr.example.com/custom/input"
        );
    }
}

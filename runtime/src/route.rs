use callflow_voice::paths;

/// Carrier-facing webhook endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookRoute {
    /// Main webhook; renders the next step.
    Voice,
    /// Input endpoint for `gather` steps; renders the next step.
    Gather,
    /// `record` action; closing remark.
    Recorded,
    RecordingStatus,
    Transcription,
    CallStatus,
}

impl WebhookRoute {
    pub const ALL: [WebhookRoute; 6] = [
        WebhookRoute::Voice,
        WebhookRoute::Gather,
        WebhookRoute::Recorded,
        WebhookRoute::RecordingStatus,
        WebhookRoute::Transcription,
        WebhookRoute::CallStatus,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            WebhookRoute::Voice => paths::VOICE,
            WebhookRoute::Gather => paths::GATHER,
            WebhookRoute::Recorded => paths::RECORDED,
            WebhookRoute::RecordingStatus => paths::RECORDING_STATUS,
            WebhookRoute::Transcription => paths::TRANSCRIPTION,
            WebhookRoute::CallStatus => paths::CALL_STATUS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_distinct_voice_routes() {
        let paths: std::collections::HashSet<&str> =
            WebhookRoute::ALL.iter().map(|route| route.path()).collect();
        assert_eq!(paths.len(), WebhookRoute::ALL.len());
        assert!(paths.iter().all(|path| path.starts_with("/voice")));
    }
}

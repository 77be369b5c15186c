//! # Voice Markup Document
//!
//! A small typed model of the carrier's XML voice-control language. Only the
//! verbs the engine emits are modelled. `Display` writes the document.

use std::fmt;

pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

const DIAL_STATUS_EVENTS: &str = "initiated ringing answered completed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, verb: impl Into<Verb>) -> Self {
        self.verbs.push(verb.into());
        self
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Whether the document ends the call rather than handing control back.
    pub fn ends_call(&self) -> bool {
        matches!(self.verbs.last(), Some(Verb::Hangup))
    }

    /// URLs in this document the carrier will request to continue the call.
    pub fn continuation_urls(&self) -> Vec<&str> {
        self.verbs
            .iter()
            .filter_map(|verb| match verb {
                Verb::Gather(gather) => Some(gather.action.as_str()),
                Verb::Redirect(url) => Some(url.as_str()),
                Verb::Record(record) => Some(record.action.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn to_xml(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VoiceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        if self.verbs.is_empty() {
            return f.write_str("<Response/>");
        }
        f.write_str("<Response>")?;
        for verb in &self.verbs {
            write!(f, "{verb}")?;
        }
        f.write_str("</Response>")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Say(Say),
    Gather(Gather),
    Record(Record),
    Dial(Dial),
    /// Unconditional POST redirect to the given URL.
    Redirect(String),
    Hangup,
}

impl From<Say> for Verb {
    fn from(say: Say) -> Self {
        Verb::Say(say)
    }
}

impl From<Gather> for Verb {
    fn from(gather: Gather) -> Self {
        Verb::Gather(gather)
    }
}

impl From<Record> for Verb {
    fn from(record: Record) -> Self {
        Verb::Record(record)
    }
}

impl From<Dial> for Verb {
    fn from(dial: Dial) -> Self {
        Verb::Dial(dial)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Say(say) => write!(f, "{say}"),
            Verb::Gather(gather) => write!(f, "{gather}"),
            Verb::Record(record) => write!(f, "{record}"),
            Verb::Dial(dial) => write!(f, "{dial}"),
            Verb::Redirect(url) => write!(f, r#"<Redirect method="POST">{}</Redirect>"#, Escaped(url)),
            Verb::Hangup => f.write_str("<Hangup/>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Say {
    pub text: String,
    pub voice: Option<String>,
    pub language: Option<String>,
}

impl fmt::Display for Say {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<Say")?;
        attr_opt(f, "voice", self.voice.as_deref())?;
        attr_opt(f, "language", self.language.as_deref())?;
        write!(f, ">{}</Say>", Escaped(&self.text))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gather {
    pub num_digits: u32,
    pub timeout: u32,
    pub finish_on_key: Option<String>,
    pub action: String,
    pub prompt: Option<Say>,
}

impl fmt::Display for Gather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<Gather")?;
        attr(f, "input", "dtmf")?;
        attr(f, "numDigits", &self.num_digits.to_string())?;
        attr(f, "timeout", &self.timeout.to_string())?;
        attr_opt(f, "finishOnKey", self.finish_on_key.as_deref())?;
        attr(f, "action", &self.action)?;
        attr(f, "method", "POST")?;
        match &self.prompt {
            Some(say) => write!(f, ">{say}</Gather>"),
            None => f.write_str("/>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub max_length: u32,
    pub finish_on_key: String,
    pub action: String,
    pub recording_status_callback: String,
    pub transcribe_callback: String,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<Record")?;
        attr(f, "maxLength", &self.max_length.to_string())?;
        attr(f, "finishOnKey", &self.finish_on_key)?;
        attr(f, "action", &self.action)?;
        attr(f, "method", "POST")?;
        attr(f, "recordingStatusCallback", &self.recording_status_callback)?;
        attr(f, "recordingStatusCallbackMethod", "POST")?;
        attr(f, "transcribe", "true")?;
        attr(f, "transcribeCallback", &self.transcribe_callback)?;
        f.write_str("/>")
    }
}

/// Outbound leg for a transfer. The new leg is always recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dial {
    pub number: String,
    pub status_callback: String,
    pub recording_status_callback: String,
}

impl fmt::Display for Dial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<Dial")?;
        attr(f, "record", "record-from-answer")?;
        attr(f, "recordingStatusCallback", &self.recording_status_callback)?;
        f.write_str("><Number")?;
        attr(f, "statusCallback", &self.status_callback)?;
        attr(f, "statusCallbackEvent", DIAL_STATUS_EVENTS)?;
        attr(f, "statusCallbackMethod", "POST")?;
        write!(f, ">{}</Number></Dial>", Escaped(&self.number))
    }
}

fn attr(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(f, r#" {name}="{}""#, Escaped(value))
}

fn attr_opt(f: &mut fmt::Formatter<'_>, name: &str, value: Option<&str>) -> fmt::Result {
    match value {
        Some(value) => attr(f, name, value),
        None => Ok(()),
    }
}

/// XML-escapes text and attribute values.
struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut last = 0;
        for (idx, ch) in self.0.char_indices() {
            let replacement = match ch {
                '&' => "&amp;",
                '<' => "&lt;",
                '>' => "&gt;",
                '"' => "&quot;",
                '\'' => "&apos;",
                _ => continue,
            };
            f.write_str(&self.0[last..idx])?;
            f.write_str(replacement)?;
            last = idx + ch.len_utf8();
        }
        f.write_str(&self.0[last..])
    }
}

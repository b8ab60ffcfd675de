use askama::Template;
use chrono::{Local, NaiveTime};
use std::fmt;
use std::sync::Arc;

use super::{Denylist, Identity};
use crate::error::ChatError;

/// Sender label used for join/leave notices.
pub const SERVER_LABEL: &str = "server";

/// A message as received from one session, before formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub text: String,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
        }
    }
}

/// Fully formatted payload fanned out to sessions. Clones share the same
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound(Arc<str>);

impl Outbound {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Outbound {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for Outbound {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for Outbound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One broadcast line. The label is trusted markup, the text is escaped.
#[derive(Template)]
#[template(source = "{{ time }} {{ sender|safe }}: {{ text }}", ext = "html")]
struct ChatLine<'a> {
    time: String,
    sender: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct Codec {
    denylist: Arc<Denylist>,
}

impl Codec {
    pub fn new(denylist: Arc<Denylist>) -> Self {
        Self { denylist }
    }

    pub fn encode(&self, message: &ChatMessage) -> Result<Outbound, ChatError> {
        self.encode_at(message, Local::now().time())
    }

    /// Formats `message` as `HH:MM:SS <sender>: <text>`.
    ///
    /// The text is masked, then `:shortcode:` emoji are expanded, then it is
    /// HTML-escaped by the template. The sender label is emitted as is.
    pub fn encode_at(&self, message: &ChatMessage, time: NaiveTime) -> Result<Outbound, ChatError> {
        let masked = self.denylist.mask(&message.text);
        let text = expand_shortcodes(&masked);
        let line = ChatLine {
            time: time.format("%H:%M:%S").to_string(),
            sender: &message.sender,
            text: &text,
        }
        .render()?;
        Ok(Outbound::from(line))
    }

    pub fn system(&self, text: impl Into<String>) -> Result<Outbound, ChatError> {
        self.encode(&ChatMessage::new(SERVER_LABEL, text))
    }

    /// Direct line sent to a newly connected session only.
    pub fn greeting(&self, identity: &Identity) -> Outbound {
        Outbound::from(format!("Connected! You are {}", identity.label()))
    }
}

/// Replaces every `:name:` that names a known emoji. Unknown names are
/// left untouched.
fn expand_shortcodes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find(':') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let candidate = after
            .find(':')
            .map(|end| &after[..end])
            .filter(|name| !name.is_empty() && !name.contains(char::is_whitespace))
            .and_then(|name| emojis::get_by_shortcode(name).map(|emoji| (name, emoji)));

        match candidate {
            Some((name, emoji)) => {
                out.push_str(emoji.as_str());
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push(':');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

//! Heartbeat acknowledgement detection
//!
//! A heartbeat run is expected to answer with [`HEARTBEAT_TOKEN`] when it has
//! nothing to report. Replies that are only the token (optionally with a short
//! trailer) are acks and may be hidden from chat observers.

/// Token a heartbeat run replies with when nothing needs attention
pub const HEARTBEAT_TOKEN: &str = "HEARTBEAT_OK";

/// Longest trailer (in characters) still treated as part of an ack
pub const DEFAULT_HEARTBEAT_ACK_MAX_CHARS: usize = 300;

/// Trailing non-word characters absorbed after a trailing token
const MAX_TRAILING_PUNCTUATION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripMode {
    /// Reply to a heartbeat poll; short trailers still count as an ack
    Heartbeat,
    /// Ordinary message; only a bare token is an ack
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripResult {
    pub should_skip: bool,
    pub text: String,
    pub did_strip: bool,
}

impl StripResult {
    fn skip(did_strip: bool) -> Self {
        Self {
            should_skip: true,
            text: String::new(),
            did_strip,
        }
    }

    fn keep(text: impl Into<String>, did_strip: bool) -> Self {
        Self {
            should_skip: false,
            text: text.into(),
            did_strip,
        }
    }
}

/// Classify `raw` as a heartbeat ack and strip the token from its edges.
pub fn strip_heartbeat_token(raw: &str, mode: StripMode, max_ack_chars: usize) -> StripResult {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return StripResult::skip(false);
    }

    let normalized = strip_markup(trimmed);
    if !trimmed.contains(HEARTBEAT_TOKEN) && !normalized.contains(HEARTBEAT_TOKEN) {
        return StripResult::keep(trimmed, false);
    }

    let original = strip_token_at_edges(trimmed);
    let (text, did_strip) = if original.1 && !original.0.is_empty() {
        original
    } else {
        strip_token_at_edges(&normalized)
    };

    if !did_strip {
        return StripResult::keep(trimmed, false);
    }
    if text.is_empty() {
        return StripResult::skip(true);
    }
    if mode == StripMode::Heartbeat && text.chars().count() <= max_ack_chars {
        return StripResult::skip(true);
    }
    StripResult::keep(text, true)
}

/// Drop simple HTML tags, `&nbsp;` and markdown emphasis around the text.
fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push(' ');
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);

    out.replace("&nbsp;", " ")
        .trim()
        .trim_matches(|c: char| matches!(c, '*' | '`' | '~' | '_'))
        .trim()
        .to_string()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Repeatedly remove the token from the start and end of `raw`.
fn strip_token_at_edges(raw: &str) -> (String, bool) {
    let mut text = raw.trim().to_string();
    let mut did_strip = false;

    loop {
        let mut changed = false;

        if let Some(rest) = text.strip_prefix(HEARTBEAT_TOKEN) {
            text = rest.trim_start().to_string();
            changed = true;
        }

        if let Some(idx) = text.rfind(HEARTBEAT_TOKEN) {
            let tail = &text[idx + HEARTBEAT_TOKEN.len()..];
            if tail.chars().count() <= MAX_TRAILING_PUNCTUATION
                && !tail.chars().any(is_word_char)
            {
                text = text[..idx].trim_end().to_string();
                changed = true;
            }
        }

        if !changed {
            break;
        }
        did_strip = true;
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (collapsed, did_strip)
}

//! Renders a content item into post text under a hard character budget.
//!
//! Lengths are counted in `char`s. What gets kept, in priority order:
//!
//! 1. heading, year and as many whole body sentences as fit
//! 2. the "more information" link
//! 3. the hashtag
//!
//! Whatever comes out is finally cut to the budget, so the limit holds for
//! any input.

use serde::{Deserialize, Serialize};

use crate::domain::{ContentItem, FormattedMessage};

pub const MAX_LENGTH: usize = 280;
pub const DEFAULT_HEADING: &str = "On This Day";
pub const DEFAULT_HASHTAG: &str = "#OnThisDay";
pub const DEFAULT_LINK_LABEL: &str = "For more information visit: ";

/// Message layout settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Hard limit on the rendered message, in characters (default: 280)
    pub max_length: usize,
    /// Text before the year (default: "On This Day")
    pub heading: String,
    /// Trailing hashtag; empty disables it (default: "#OnThisDay")
    pub hashtag: String,
    /// Label placed in front of the reference link
    pub link_label: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_length: MAX_LENGTH,
            heading: DEFAULT_HEADING.to_string(),
            hashtag: DEFAULT_HASHTAG.to_string(),
            link_label: DEFAULT_LINK_LABEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    config: MessageConfig,
}

impl MessageFormatter {
    pub fn new(config: MessageConfig) -> Self {
        Self { config }
    }

    pub fn max_length(&self) -> usize {
        self.config.max_length
    }

    pub fn render(&self, item: &ContentItem) -> FormattedMessage {
        let max = self.config.max_length;
        let prefix = match item.year.as_deref() {
            Some(year) => format!("{}: {}, ", self.config.heading, year),
            None => format!("{}: ", self.config.heading),
        };

        let mut text = prefix.clone();
        let mut len = char_len(&prefix);
        let mut sentences = 0;

        for sentence in split_sentences(&item.body) {
            let n = char_len(sentence);
            if len + n > max {
                break;
            }
            text.push_str(sentence);
            len += n;
            sentences += 1;
        }

        if sentences == 0 {
            // Not even one sentence fits: keep as much of the body as possible.
            text = truncate_chars(&format!("{}{}", prefix, item.body), max).to_string();
            len = char_len(&text);
        }

        if let Some(url) = item.reference_url.as_deref() {
            let suffix = format!("\n\n{}{}", self.config.link_label, url);
            if len + char_len(&suffix) <= max {
                text.push_str(&suffix);
                len += char_len(&suffix);
            }
        }

        if !self.config.hashtag.is_empty() {
            let suffix = format!("\n\n{}", self.config.hashtag);
            if len + char_len(&suffix) <= max {
                text.push_str(&suffix);
            }
        }

        FormattedMessage::new(truncate_chars(&text, max).to_string())
    }
}

/// Render with the default layout and the given budget.
pub fn render(item: &ContentItem, max_length: usize) -> FormattedMessage {
    MessageFormatter::new(MessageConfig {
        max_length,
        ..MessageConfig::default()
    })
    .render(item)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Split after `.`, `!` or `?` (plus closing quotes/brackets) that is
/// followed by whitespace or the end of the text. Concatenating the pieces
/// gives back the input.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if matches!(next, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}') {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            pieces.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

use html_escape::decode_html_entities;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::app::{AlmanacError, Result};
use crate::domain::{ContentBatch, ContentItem};

/// Which list of the "On this day" response to read entries from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSection {
    #[default]
    Selected,
    Events,
    Births,
    Deaths,
    Holidays,
}

impl FeedSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Events => "events",
            Self::Births => "births",
            Self::Deaths => "deaths",
            Self::Holidays => "holidays",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    text: String,
    #[serde(default)]
    year: Option<Value>,
    #[serde(default)]
    pages: Vec<RawPage>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPage {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    titles: Option<RawTitles>,
    #[serde(default)]
    content_urls: Option<RawContentUrls>,
}

#[derive(Debug, Deserialize)]
struct RawTitles {
    #[serde(default)]
    normalized: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawContentUrls {
    #[serde(default)]
    desktop: Option<RawPageUrl>,
}

#[derive(Debug, Deserialize)]
struct RawPageUrl {
    #[serde(default)]
    page: Option<String>,
}

#[derive(Clone)]
pub struct Normalizer {
    section: FeedSection,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(FeedSection::default())
    }
}

impl Normalizer {
    pub fn new(section: FeedSection) -> Self {
        Self { section }
    }

    pub fn section(&self) -> FeedSection {
        self.section
    }

    /// Parse a feed response. Entries that fail shape validation are dropped;
    /// only a body that is not a JSON object at all is an error.
    pub fn normalize(&self, body: &[u8]) -> Result<ContentBatch> {
        let root: Value =
            serde_json::from_slice(body).map_err(|e| AlmanacError::FeedParse(e.to_string()))?;

        let entries = match root.get(self.section.as_str()) {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(AlmanacError::FeedParse(format!(
                    "'{}' is not a list",
                    self.section.as_str()
                )))
            }
            None if root.is_object() => return Ok(ContentBatch::default()),
            None => {
                return Err(AlmanacError::FeedParse(
                    "response is not a JSON object".to_string(),
                ))
            }
        };

        let total = entries.len();
        let batch: ContentBatch = entries.iter().filter_map(normalize_entry).collect();

        if batch.len() < total {
            tracing::debug!(
                "Dropped {} malformed entries from '{}'",
                total - batch.len(),
                self.section.as_str()
            );
        }

        Ok(batch)
    }
}

fn normalize_entry(value: &Value) -> Option<ContentItem> {
    let entry: RawEntry = serde_json::from_value(value.clone()).ok()?;
    let page = entry.pages.into_iter().next().unwrap_or_default();

    let year = entry.year.and_then(|y| match y {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s),
        _ => None,
    });

    let reference_url = page
        .content_urls
        .and_then(|c| c.desktop)
        .and_then(|d| d.page)
        .filter(|u| is_web_url(u));

    let media_search_term = page
        .titles
        .and_then(|t| t.normalized)
        .or(page.title)
        .map(|t| strip_html(&t));

    ContentItem::new(strip_html(&entry.text), year)
        .map(|item| item.with_reference_url(reference_url))
        .map(|item| item.with_media_search_term(media_search_term))
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
        .unwrap_or(false)
}

/// Remove tags, decode entities, and collapse runs of whitespace.
pub fn strip_html(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;
    let mut tag_name = String::new();

    for c in input.chars() {
        if in_tag {
            if c == '>' {
                if is_block_tag(&tag_name) {
                    text.push(' ');
                }
                in_tag = false;
                tag_name.clear();
            } else {
                tag_name.push(c);
            }
        } else if c == '<' {
            in_tag = true;
        } else {
            text.push(c);
        }
    }

    decode_html_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_block_tag(raw: &str) -> bool {
    let name: String = raw
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(name.as_str(), "br" | "p" | "div" | "li" | "ul" | "ol" | "tr" | "td")
}

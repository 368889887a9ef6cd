use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single piece of daily content, already cleaned of markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub body: String,
    pub year: Option<String>,
    pub reference_url: Option<String>,
    pub media_search_term: Option<String>,
}

impl ContentItem {
    /// Returns `None` when the body is blank; items never carry an empty body.
    pub fn new(body: impl Into<String>, year: Option<String>) -> Option<Self> {
        let body = body.into().trim().to_string();
        if body.is_empty() {
            return None;
        }
        let year = year
            .map(|y| y.trim().to_string())
            .filter(|y| !y.is_empty());
        let id = Self::generate_id(year.as_deref(), &body);

        Some(Self {
            id,
            body,
            year,
            reference_url: None,
            media_search_term: None,
        })
    }

    pub fn with_reference_url(mut self, url: Option<String>) -> Self {
        self.reference_url = url;
        self
    }

    pub fn with_media_search_term(mut self, term: Option<String>) -> Self {
        self.media_search_term = term.filter(|t| !t.trim().is_empty());
        self
    }

    /// Generate a deterministic ID from the year and body text
    pub fn generate_id(year: Option<&str>, body: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(year.unwrap_or_default().as_bytes());
        hasher.update([0u8]);
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn short_id(&self) -> &str {
        &self.id[..12.min(self.id.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_body_rejected() {
        assert!(ContentItem::new("", None).is_none());
        assert!(ContentItem::new("   \n", Some("1900".into())).is_none());
    }

    #[test]
    fn test_body_and_year_trimmed() {
        let item = ContentItem::new("  Event A. ", Some(" 1900 ".into())).unwrap();
        assert_eq!(item.body, "Event A.");
        assert_eq!(item.year.as_deref(), Some("1900"));
    }

    #[test]
    fn test_blank_year_dropped() {
        let item = ContentItem::new("Event A.", Some("".into())).unwrap();
        assert_eq!(item.year, None);
    }

    #[test]
    fn test_id_generation_deterministic() {
        let a = ContentItem::new("Event A.", Some("1900".into())).unwrap();
        let b = ContentItem::new("Event A.", Some("1900".into())).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn test_id_depends_on_year() {
        let a = ContentItem::generate_id(Some("1900"), "Event A.");
        let b = ContentItem::generate_id(Some("1901"), "Event A.");
        let c = ContentItem::generate_id(None, "Event A.");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_id_is_hex_sha256() {
        let id = ContentItem::generate_id(Some("1900"), "Event A.");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_blank_media_term_dropped() {
        let item = ContentItem::new("Event A.", None)
            .unwrap()
            .with_media_search_term(Some("  ".into()));
        assert_eq!(item.media_search_term, None);
    }
}

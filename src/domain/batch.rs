use serde::{Deserialize, Serialize};

use super::ContentItem;

/// One fetch's worth of content. Only ever holds valid items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBatch {
    items: Vec<ContentItem>,
}

impl ContentBatch {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&ContentItem> {
        self.items.get(index)
    }

    pub fn contains(&self, item: &ContentItem) -> bool {
        self.items.iter().any(|i| i.id == item.id)
    }

    /// Append `item` unless an item with the same id is already present.
    pub fn push(&mut self, item: ContentItem) -> bool {
        if self.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove and return the item at `index`; order of the rest is not kept.
    pub fn take(&mut self, index: usize) -> Option<ContentItem> {
        if index < self.items.len() {
            Some(self.items.swap_remove(index))
        } else {
            None
        }
    }
}

impl FromIterator<ContentItem> for ContentBatch {
    fn from_iter<I: IntoIterator<Item = ContentItem>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(body: &str) -> ContentItem {
        ContentItem::new(body, None).unwrap()
    }

    #[test]
    fn test_take_removes_item() {
        let mut batch = ContentBatch::new(vec![item("A."), item("B."), item("C.")]);
        let taken = batch.take(0).unwrap();
        assert_eq!(taken.body, "A.");
        assert_eq!(batch.len(), 2);
        assert!(!batch.contains(&taken));
    }

    #[test]
    fn test_take_out_of_range() {
        let mut batch = ContentBatch::new(vec![item("A.")]);
        assert!(batch.take(1).is_none());
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_push_skips_same_id() {
        let mut batch = ContentBatch::new(vec![item("A.")]);
        assert!(!batch.push(item("A.")));
        assert!(batch.push(item("B.")));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(ContentBatch::default().is_empty());
    }
}

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::app::{AlmanacError, Result};
use crate::domain::{ContentBatch, ContentItem};

/// Uniform-random choice over a batch, driven by an injected random source.
pub struct Selector {
    rng: Box<dyn RngCore + Send>,
}

impl Selector {
    pub fn new(rng: Box<dyn RngCore + Send>) -> Self {
        Self { rng }
    }

    pub fn from_entropy() -> Self {
        Self::new(Box::new(StdRng::from_entropy()))
    }

    /// Reproducible selection for tests and dry runs
    pub fn seeded(seed: u64) -> Self {
        Self::new(Box::new(StdRng::seed_from_u64(seed)))
    }

    pub fn pick_index(&mut self, batch: &ContentBatch) -> Result<usize> {
        if batch.is_empty() {
            return Err(AlmanacError::EmptyBatch);
        }
        Ok(self.rng.gen_range(0..batch.len()))
    }

    pub fn pick<'a>(&mut self, batch: &'a ContentBatch) -> Result<(usize, &'a ContentItem)> {
        let index = self.pick_index(batch)?;
        let item = batch.get(index).ok_or(AlmanacError::EmptyBatch)?;
        Ok((index, item))
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(n: usize) -> ContentBatch {
        (0..n)
            .map(|i| ContentItem::new(format!("Event {}.", i), None).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_batch_is_error() {
        let mut selector = Selector::seeded(1);
        let err = selector.pick(&ContentBatch::default()).unwrap_err();
        assert!(matches!(err, AlmanacError::EmptyBatch));
    }

    #[test]
    fn test_pick_returns_member_of_batch() {
        let mut selector = Selector::seeded(42);
        for size in 1..20 {
            let batch = batch(size);
            for _ in 0..50 {
                let (index, item) = selector.pick(&batch).unwrap();
                assert!(index < size);
                assert!(batch.contains(item));
            }
        }
    }

    #[test]
    fn test_single_item_always_chosen() {
        let mut selector = Selector::from_entropy();
        let batch = batch(1);
        assert_eq!(selector.pick_index(&batch).unwrap(), 0);
    }

    #[test]
    fn test_same_seed_same_choices() {
        let batch = batch(10);
        let mut a = Selector::seeded(7);
        let mut b = Selector::seeded(7);
        let picks_a: Vec<_> = (0..10).map(|_| a.pick_index(&batch).unwrap()).collect();
        let picks_b: Vec<_> = (0..10).map(|_| b.pick_index(&batch).unwrap()).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_every_index_reachable() {
        let batch = batch(4);
        let mut selector = Selector::seeded(3);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[selector.pick_index(&batch).unwrap()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}

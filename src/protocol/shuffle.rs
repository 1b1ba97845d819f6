//! Random order without replacement.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// A random ordering of `0..len`, consumed front to back.
///
/// Generated once per activation, so drawing "one not yet shown" is a
/// cursor bump instead of removing from a shrinking list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    order: Vec<usize>,
    cursor: usize,
}

impl Permutation {
    pub fn new<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(rng);
        Self { order, cursor: 0 }
    }

    /// Reproducible permutation for a given seed.
    pub fn seeded(len: usize, seed: u64) -> Self {
        Self::new(len, &mut StdRng::seed_from_u64(seed))
    }

    /// `0..len` in order.
    pub fn identity(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
            cursor: 0,
        }
    }

    /// Next unused index.
    pub fn next_index(&mut self) -> Option<usize> {
        let index = self.order.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(index)
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The whole ordering, including indices already drawn.
    pub fn as_slice(&self) -> &[usize] {
        &self.order
    }
}

impl Iterator for Permutation {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.next_index()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

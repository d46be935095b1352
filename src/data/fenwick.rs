use crate::error::{try_copy, try_vec, Result};

/// Bucket counters stored as a Fenwick (binary indexed) tree.
///
/// Node `i` (1-based) holds the sum of the counters in `(i - lowbit(i), i]`, which makes both
/// incrementing a bucket and finding the bucket at a given cumulative rank O(log N).
#[derive(Debug)]
pub(crate) struct Fenwick {
    tree: Vec<u64>,
}

#[inline]
fn lowbit(i: usize) -> usize { i & i.wrapping_neg() }

impl Fenwick {
    /// Creates a tree of `len` zeroed counters.
    pub fn with_len(len: usize) -> Result<Fenwick> {
        let mut tree = try_vec(len)?;
        tree.resize(len, 0);
        Ok(Fenwick { tree })
    }

    /// Builds a tree from plain per-bucket counters in O(N).
    pub fn from_counts(counts: &[u64]) -> Result<Fenwick> {
        let mut tree = try_copy(counts)?;
        let len = tree.len();
        for i in 1..=len {
            let parent = i + lowbit(i);
            if parent <= len {
                tree[parent - 1] += tree[i - 1];
            }
        }

        Ok(Fenwick { tree })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.tree.len() }

    /// Adds one to the counter at `index`.
    pub fn increment(&mut self, index: usize) {
        let len = self.tree.len();
        let mut i = index + 1;
        while i <= len {
            self.tree[i - 1] += 1;
            i += lowbit(i);
        }
    }

    /// Sum of the counters at `0..=index`.
    #[cfg(test)]
    pub fn prefix_sum(&self, index: usize) -> u64 {
        let mut sum = 0;
        let mut i = index + 1;
        while i > 0 {
            sum += self.tree[i - 1];
            i -= lowbit(i);
        }
        sum
    }

    /// Finds the smallest index whose cumulative counter reaches `rank`.
    ///
    /// `rank` must be at least 1 and at most the total of all counters; otherwise the result is
    /// clamped to the last bucket.
    pub fn search(&self, rank: u64) -> usize {
        let len = self.tree.len();
        let mut step = 1usize << (usize::BITS - 1 - len.leading_zeros());
        let mut position = 0;
        let mut remaining = rank;

        while step > 0 {
            let next = position + step;
            if next <= len && self.tree[next - 1] < remaining {
                position = next;
                remaining -= self.tree[next - 1];
            }
            step >>= 1;
        }

        position.min(len - 1)
    }

    /// Recovers the plain per-bucket counters in O(N).
    pub fn counts(&self) -> Result<Vec<u64>> { Ok(decode(try_copy(&self.tree)?)) }

    /// Like `counts`, but allocates infallibly.
    pub fn to_counts(&self) -> Vec<u64> { decode(self.tree.clone()) }

    pub fn clear(&mut self) {
        for node in self.tree.iter_mut() {
            *node = 0;
        }
    }

    pub fn try_clone(&self) -> Result<Fenwick> {
        Ok(Fenwick {
            tree: try_copy(&self.tree)?,
        })
    }
}

/// Turns tree nodes back into plain counters, in place.
fn decode(mut counts: Vec<u64>) -> Vec<u64> {
    let len = counts.len();
    for i in (1..=len).rev() {
        let parent = i + lowbit(i);
        if parent <= len {
            counts[parent - 1] -= counts[i - 1];
        }
    }
    counts
}

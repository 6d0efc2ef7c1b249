//! Depth-first enumeration of strictly increasing combinations.
//!
//! The [`CombinationGenerator`] walks the search tree for a set of
//! [`SearchParameters`] and groups every valid combination into fixed-size
//! [`Batch`]es. Full batches are handed to a caller-supplied callback while the
//! search is suspended, which keeps memory bounded by a single batch no matter
//! how large the result set grows.
//!
//! ## Pruning
//!
//! - Candidates for a slot start at `floor` (previous element + 1), which
//!   enforces strict increase and rules out permutations.
//! - A candidate `i` with `i * remaining_slots > remaining_target` ends the
//!   loop: every later element is at least `i`, so nothing larger can fit.
//! - The last slot only tries `min(remaining_target, bound)`.
//!
//! ## Cancellation
//!
//! A [`CancellationToken`] is checked on every recursive entry. A cancelled
//! search returns [`Error::Cancelled`] without calling the batch callback
//! again.

use crate::{Batch, Combination, Error, Result, SearchParameters, Value};
use tokio_util::sync::CancellationToken;


/// Outcome of a completed enumeration.
#[derive(Debug)]
pub struct Enumeration {
    /// Combinations found after the last full batch was drained. May be
    /// partially filled or empty.
    pub remainder: Batch,
    /// Grand total of combinations found, including `remainder`.
    pub total: u64,
}

impl Enumeration {
    /// Number of combinations that were handed to the batch callback.
    pub fn drained(&self) -> u64 {
        self.total - self.remainder.len() as u64
    }
}

/// Backtracking generator over strictly increasing combinations.
///
/// # Example
///
/// ```
/// use summands::{CombinationGenerator, SearchParameters};
///
/// let params = SearchParameters::new(5, 2, 0).unwrap();
/// let generator = CombinationGenerator::new(params, 16).unwrap();
///
/// let found: Vec<Vec<u64>> = generator
///     .collect()
///     .unwrap()
///     .iter()
///     .map(|c| c.values().to_vec())
///     .collect();
/// assert_eq!(found, vec![vec![1, 4], vec![2, 3]]);
/// ```
#[derive(Clone, Debug)]
pub struct CombinationGenerator {
    params: SearchParameters,
    batch_size: usize,
    cancel: CancellationToken,
}

impl CombinationGenerator {
    /// Creates a generator that drains results in batches of `batch_size`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if `batch_size` is zero.
    pub fn new(params: SearchParameters, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::invalid("batch size must be greater than 0"));
        }
        Ok(Self {
            params,
            batch_size,
            cancel: CancellationToken::new(),
        })
    }

    /// Attaches a cancellation token checked on every recursive entry.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn params(&self) -> &SearchParameters {
        &self.params
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Runs the full search.
    ///
    /// `on_batch_full` is called inline every time the batch reaches capacity
    /// and blocks the search until it returns. It may read the batch or take
    /// its contents, but it must not keep a reference to it: the batch is
    /// cleared as soon as the callback returns. `on_progress` then receives the
    /// running total.
    ///
    /// The final, possibly partial batch is returned in the [`Enumeration`]
    /// rather than passed to the callback.
    ///
    /// # Errors
    ///
    /// - Any error returned by `on_batch_full` aborts the search and is
    ///   propagated unchanged.
    /// - [`Error::Cancelled`] if the cancellation token fires.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            level = "debug",
            skip_all,
            fields(
                target = self.params.target(),
                length = self.params.length(),
                bound = self.params.bound(),
            )
        )
    )]
    pub fn enumerate<F, P>(&self, on_batch_full: F, on_progress: P) -> Result<Enumeration>
    where
        F: FnMut(&mut Batch) -> Result<()>,
        P: FnMut(u64),
    {
        let mut search = Search {
            bound: self.params.bound(),
            batch: Batch::with_capacity(self.batch_size),
            found: 0,
            cancel: &self.cancel,
            on_batch_full,
            on_progress,
        };

        let mut current = Vec::with_capacity(self.params.length());
        search.descend(&mut current, self.params.target(), self.params.length(), 1)?;

        let total = search.found + search.batch.len() as u64;

        #[cfg(feature = "tracing")]
        tracing::debug!(total, remainder = search.batch.len(), "Search finished");

        Ok(Enumeration {
            remainder: search.batch,
            total,
        })
    }

    /// Collects every combination into memory.
    ///
    /// Only suitable for small searches; use [`enumerate`](Self::enumerate)
    /// with a sink for anything that may not fit in memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the cancellation token fires.
    pub fn collect(&self) -> Result<Vec<Combination>> {
        let mut all = Vec::new();
        let outcome = self.enumerate(
            |batch| {
                all.extend(batch.take());
                Ok(())
            },
            |_| {},
        )?;
        all.extend(outcome.remainder.into_vec());
        Ok(all)
    }
}

struct Search<'a, F, P> {
    bound: Value,
    batch: Batch,
    found: u64,
    cancel: &'a CancellationToken,
    on_batch_full: F,
    on_progress: P,
}

impl<F, P> Search<'_, F, P>
where
    F: FnMut(&mut Batch) -> Result<()>,
    P: FnMut(u64),
{
    fn descend(
        &mut self,
        current: &mut Vec<Value>,
        remaining: Value,
        slots: usize,
        floor: Value,
    ) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if slots == 0 {
            if remaining == 0 {
                self.emit(current)?;
            }
            return Ok(());
        }

        let ceiling = remaining.min(self.bound);

        if slots == 1 {
            // Only the largest admissible value is tried for the last slot.
            if floor <= ceiling {
                current.push(ceiling);
                let res =
                    self.descend(current, remaining - ceiling, 0, ceiling.saturating_add(1));
                current.pop();
                res?;
            }
            return Ok(());
        }

        let slots_value = slots as Value;
        for candidate in floor..=ceiling {
            if candidate.saturating_mul(slots_value) > remaining {
                break;
            }
            current.push(candidate);
            let res = self.descend(
                current,
                remaining - candidate,
                slots - 1,
                candidate.saturating_add(1),
            );
            current.pop();
            res?;
        }

        Ok(())
    }

    fn emit(&mut self, current: &[Value]) -> Result<()> {
        if !self.batch.push(Combination::from(current)) {
            return Ok(());
        }

        let drained = self.batch.len() as u64;
        (self.on_batch_full)(&mut self.batch)?;
        self.found += drained;
        self.batch.clear();

        #[cfg(feature = "tracing")]
        tracing::trace!(total = self.found, "Batch drained");

        (self.on_progress)(self.found);
        Ok(())
    }
}

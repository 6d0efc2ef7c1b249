use crate::Value;
use core::{fmt, ops::Deref};

/// A strictly increasing sequence of positive values summing to the search
/// target.
///
/// Combinations are immutable once produced. Each one owns its own storage so
/// it can outlive the generator's scratch buffer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Combination(Box<[Value]>);

impl Combination {
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn sum(&self) -> Value {
        self.0.iter().sum()
    }

    /// Returns `true` if every element is strictly greater than the previous
    /// one.
    pub fn is_strictly_increasing(&self) -> bool {
        self.0.windows(2).all(|w| w[0] < w[1])
    }
}

impl From<&[Value]> for Combination {
    fn from(values: &[Value]) -> Self {
        Self(values.into())
    }
}

impl From<Vec<Value>> for Combination {
    fn from(values: Vec<Value>) -> Self {
        Self(values.into_boxed_slice())
    }
}

impl Deref for Combination {
    type Target = [Value];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}

/// A pre-allocated buffer of combinations with a fixed capacity.
///
/// The generator fills a batch during the search and hands it to the batch
/// callback once it is full. The callback may read it or [`take`] its
/// contents; afterwards the generator clears it and keeps going.
///
/// [`take`]: Batch::take
#[derive(Debug)]
pub struct Batch {
    items: Vec<Combination>,
    capacity: usize,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a combination and reports whether the batch is now full.
    pub fn push(&mut self, combination: Combination) -> bool {
        if self.items.capacity() == 0 {
            self.items.reserve_exact(self.capacity);
        }
        self.items.push(combination);
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[Combination] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Moves the buffered combinations out. The batch keeps no buffer until
    /// the next [`push`](Self::push) allocates a full-capacity one.
    pub fn take(&mut self) -> Vec<Combination> {
        core::mem::take(&mut self.items)
    }

    pub fn into_vec(self) -> Vec<Combination> {
        self.items
    }
}

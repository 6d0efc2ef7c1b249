use crate::{Error, Result, Value, resolve_bound};
use core::fmt;

/// Validated input of a combination search.
///
/// `target` and `length` must be positive. The requested bound `ub` is either
/// `0` (use [`resolve_bound`]) or an explicit value in `1..=target`. The
/// resolved bound is computed once here so every later stage (generator,
/// output naming) sees the same value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SearchParameters {
    target: Value,
    length: usize,
    requested_bound: Value,
    bound: Value,
}

impl SearchParameters {
    /// Creates parameters, rejecting anything outside the valid domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if `target` or `length` is zero,
    /// or if `ub` is non-zero and greater than `target`.
    ///
    /// # Example
    ///
    /// ```
    /// use summands::SearchParameters;
    ///
    /// let params = SearchParameters::new(5, 2, 0).unwrap();
    /// assert_eq!(params.bound(), 5);
    /// assert_eq!(params.key(), "5-2-5");
    ///
    /// assert!(SearchParameters::new(5, 2, 6).is_err());
    /// ```
    pub fn new(target: Value, length: usize, ub: Value) -> Result<Self> {
        if ub > target {
            return Err(Error::invalid(format!(
                "upper bound {ub} must not exceed target {target}"
            )));
        }
        Self::build(target, length, ub)
    }

    /// Creates parameters, treating an out-of-range `ub` as unset.
    ///
    /// This is the lenient form-style rule: a bound above the target falls back
    /// to the default bound instead of failing the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if `target` or `length` is zero.
    pub fn normalized(target: Value, length: usize, ub: Value) -> Result<Self> {
        let ub = if ub > target { 0 } else { ub };
        Self::build(target, length, ub)
    }

    fn build(target: Value, length: usize, requested_bound: Value) -> Result<Self> {
        if target == 0 {
            return Err(Error::invalid("target must be greater than 0"));
        }
        if length == 0 {
            return Err(Error::invalid("length must be greater than 0"));
        }

        let bound = if requested_bound == 0 {
            resolve_bound(target, length)
        } else {
            requested_bound
        };

        Ok(Self {
            target,
            length,
            requested_bound,
            bound,
        })
    }

    pub const fn target(&self) -> Value {
        self.target
    }

    pub const fn length(&self) -> usize {
        self.length
    }

    /// The bound as supplied by the caller; `0` when the default was used.
    pub const fn requested_bound(&self) -> Value {
        self.requested_bound
    }

    /// The effective inclusive bound for every element.
    pub const fn bound(&self) -> Value {
        self.bound
    }

    /// Naming key shared by every output file of this search:
    /// `{target}-{length}-{bound}`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SearchParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.target, self.length, self.bound)
    }
}

use crate::Value;

/// Resolves the default upper bound for a search when the caller left it
/// unset (`ub == 0`).
///
/// The bound is the target itself. A single-element search must end on the
/// target exactly, and for longer searches every element is strictly below
/// the target anyway, so this never excludes a valid combination. When
/// `length > target` nothing can be produced and the search still terminates
/// because the generator's pruning rejects every first candidate.
///
/// The resolved bound becomes part of every output file name, so it must stay
/// stable for a given `(target, length)`.
///
/// # Example
///
/// ```
/// use summands::resolve_bound;
///
/// assert_eq!(resolve_bound(5, 2), 5);
/// assert_eq!(resolve_bound(10, 1), 10);
/// ```
#[must_use]
pub const fn resolve_bound(target: Value, _length: usize) -> Value {
    target
}

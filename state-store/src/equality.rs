//! Shallow change detection
//!
//! The store decides whether a write changed anything by comparing the
//! current snapshot with the candidate one level deep. Scalars compare by
//! value; composites compare by identity (`Arc::ptr_eq`). A nested object
//! rebuilt with equal contents therefore counts as a change, while an outer
//! object re-spread with the very same children does not.

use std::sync::Arc;

use serde_json::Number;

use crate::snapshot::Snapshot;

/// Identity comparison
///
/// Same value for scalars, same allocation for arrays and objects.
pub fn identical(a: &Snapshot, b: &Snapshot) -> bool {
    match (a, b) {
        (Snapshot::Null, Snapshot::Null) => true,
        (Snapshot::Bool(x), Snapshot::Bool(y)) => x == y,
        (Snapshot::Number(x), Snapshot::Number(y)) => numbers_identical(x, y),
        (Snapshot::String(x), Snapshot::String(y)) => x == y,
        (Snapshot::Array(x), Snapshot::Array(y)) => Arc::ptr_eq(x, y),
        (Snapshot::Object(x), Snapshot::Object(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

/// Shallow structural equality
///
/// Identical values are equal. Otherwise both sides must be composites of
/// the same kind with the same number of entries, and every entry of `a`
/// must be present in `b` with an identical value.
pub fn shallow_equal(a: &Snapshot, b: &Snapshot) -> bool {
    if identical(a, b) {
        return true;
    }

    match (a, b) {
        (Snapshot::Object(x), Snapshot::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| identical(value, other)))
        }
        (Snapshot::Array(x), Snapshot::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(v, w)| identical(v, w))
        }
        _ => false,
    }
}

// 1 and 1.0 are the same number
fn numbers_identical(x: &Number, y: &Number) -> bool {
    if x == y {
        return true;
    }
    if x.is_f64() || y.is_f64() {
        return matches!((x.as_f64(), y.as_f64()), (Some(a), Some(b)) if a == b);
    }
    false
}

//! Small formatting helpers shared across the data model.

use std::fmt;

/// Wraps a `Display` value so it can be used where a `Debug` impl is expected.
///
/// Useful for `debug_struct` fields backed by types whose `Display` is the
/// canonical human-readable representation (e.g. reversed hex hashes) but
/// which don't derive `Debug` in that form.
pub struct DisplayToDebug<T>(pub T);

impl<T: fmt::Display> fmt::Debug for DisplayToDebug<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

//! Router behaviour switches.

/// Options fixed when a [`ReactorRouter`](crate::ReactorRouter) is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Cache the set of buckets matching each dispatched type. The cache is
    /// dropped whenever a bucket is created or a type is declared.
    pub cache_matches: bool,
    /// Publish a `ReactorCount` whenever a reactor is attached or detached.
    pub report_counts: bool,
    /// Turn panics in pull and query reactors into `ReactorError::Panicked`
    /// instead of unwinding through the caller.
    pub catch_panics: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            cache_matches: true,
            report_counts: true,
            catch_panics: true,
        }
    }
}

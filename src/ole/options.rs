//! Configuration for opening compound files.

/// Options controlling how strictly a compound file is read.
///
/// # Examples
///
/// ```rust
/// use msiole::ole::ReaderOptions;
///
/// let options = ReaderOptions::new()
///     .with_max_stream_size(64 * 1024 * 1024)
///     .with_strict_names(false);
/// assert_eq!(options.max_stream_size, 64 * 1024 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Largest declared stream size `read_all` will materialize.
    ///
    /// Streams declaring more are reported as corrupted instead of being
    /// allocated.
    pub max_stream_size: u64,
    /// Reject sibling entries whose names compare equal (case-insensitive).
    pub strict_names: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_stream_size: 2 * 1024 * 1024 * 1024,
            strict_names: true,
        }
    }
}

impl ReaderOptions {
    /// Create options with default values.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest stream size `read_all` accepts.
    #[inline]
    pub fn with_max_stream_size(mut self, max: u64) -> Self {
        self.max_stream_size = max;
        self
    }

    /// Set whether duplicate sibling names are treated as corruption.
    #[inline]
    pub fn with_strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }
}

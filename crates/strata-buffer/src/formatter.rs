//! Page formatter contract for newly allocated blocks.

use strata_storage::Page;

/// Writes the initial on-disk structure of a freshly allocated block.
///
/// A formatter is invoked only when a buffer acquires a brand-new
/// block. It sees the recycled page image of the slot being reused and
/// must overwrite everything it cares about.
pub trait PageFormatter: Send + Sync {
    /// Formats the page image for a new block.
    fn format(&self, page: &mut Page);
}

/// Formatter that zero-fills a new block.
pub struct ZeroFormatter;

impl PageFormatter for ZeroFormatter {
    fn format(&self, page: &mut Page) {
        page.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_formatter_clears_recycled_page() {
        let mut page = Page::new();
        page.set_i32(0, 1234);

        ZeroFormatter.format(&mut page);

        assert!(page.as_slice().iter().all(|&b| b == 0));
    }
}

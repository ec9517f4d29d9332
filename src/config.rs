//! Tunable knobs for the digest pipeline: the character ceiling, the
//! per-category size windows and the category orders used by the
//! deduplicator and the assembler. Documentation styles differ, so none
//! of these are hard-coded at the call sites.

use crate::classify::{Category, SPAN_VOCABULARY};

/// Inclusive character window a fragment must fall into to be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeWindow {
    pub min: usize,
    pub max: usize,
}

impl SizeWindow {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Size windows per category. `None` means the category is never
/// size-filtered; code blocks default to that since cURL examples and
/// signatures must not be lost to truncation.
#[derive(Debug, Clone)]
pub struct CategoryWindows {
    pub code: Option<SizeWindow>,
    pub table: Option<SizeWindow>,
    pub heading: Option<SizeWindow>,
    pub list: Option<SizeWindow>,
    pub paragraph: Option<SizeWindow>,
    pub div: Option<SizeWindow>,
    pub span: Option<SizeWindow>,
    pub blockquote: Option<SizeWindow>,
    pub section: Option<SizeWindow>,
}

impl CategoryWindows {
    pub fn window(&self, category: Category) -> Option<SizeWindow> {
        match category {
            Category::Code => self.code,
            Category::Table => self.table,
            Category::Heading => self.heading,
            Category::List => self.list,
            Category::Paragraph => self.paragraph,
            Category::Div => self.div,
            Category::Span => self.span,
            Category::Blockquote => self.blockquote,
            Category::Section => self.section,
        }
    }
}

impl Default for CategoryWindows {
    fn default() -> Self {
        Self {
            code: None,
            table: Some(SizeWindow::new(10, 2000)),
            heading: Some(SizeWindow::new(3, 200)),
            list: Some(SizeWindow::new(10, 1200)),
            paragraph: Some(SizeWindow::new(10, 800)),
            div: Some(SizeWindow::new(10, 1000)),
            span: Some(SizeWindow::new(1, 50)),
            blockquote: Some(SizeWindow::new(10, 600)),
            section: Some(SizeWindow::new(50, 1500)),
        }
    }
}

/// Configuration for classify/dedupe/assemble over one page.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Hard ceiling on the digest's cumulative character count.
    pub ceiling: usize,
    /// Digests below this size carry no mineable signal and the page is
    /// skipped as "no relevant content".
    pub min_chars: usize,
    pub windows: CategoryWindows,
    /// Tokens a span must contain to be extracted standalone.
    pub span_vocabulary: Vec<String>,
    /// Order the deduplicator visits categories in. Containers must go
    /// coarse to fine so a small-enough ancestor swallows its children.
    pub dedupe_order: Vec<Category>,
    /// Order the assembler emits categories in, highest signal first.
    pub assembly_order: Vec<Category>,
}

impl DigestConfig {
    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            ceiling: 20_000,
            min_chars: 100,
            windows: CategoryWindows::default(),
            span_vocabulary: SPAN_VOCABULARY.iter().map(|word| (*word).to_string()).collect(),
            dedupe_order: vec![
                Category::Code,
                Category::Table,
                Category::Heading,
                Category::List,
                Category::Section,
                Category::Div,
                Category::Paragraph,
                Category::Blockquote,
                Category::Span,
            ],
            assembly_order: vec![
                Category::Code,
                Category::Table,
                Category::Heading,
                Category::List,
                Category::Paragraph,
                Category::Div,
                Category::Span,
                Category::Blockquote,
                Category::Section,
            ],
        }
    }
}

//! The classify module decides, per document node, which content
//! category it belongs to and whether its text is small enough to be
//! extracted whole. Different HTML containers carry API documentation at
//! different granularities, so the size windows are category-specific
//! and hard: an oversized paragraph is rejected outright, not truncated.

use crate::config::DigestConfig;
use crate::content::DocumentNode;

/// Content categories in extraction priority order. Code and tables
/// carry the densest API signal; sections are the coarsest containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Code,
    Table,
    Heading,
    List,
    Paragraph,
    Div,
    Span,
    Blockquote,
    Section,
}

impl Category {
    /// Maps an HTML tag name to its category, if the tag is one the
    /// pipeline extracts from at all.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "code" | "pre" => Some(Self::Code),
            "table" => Some(Self::Table),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(Self::Heading),
            "ul" | "ol" | "dl" => Some(Self::List),
            "p" => Some(Self::Paragraph),
            "div" => Some(Self::Div),
            "span" => Some(Self::Span),
            "blockquote" => Some(Self::Blockquote),
            "section" | "article" => Some(Self::Section),
            _ => None,
        }
    }

    /// Section header used for this category in the assembled digest.
    pub fn label(self) -> &'static str {
        match self {
            Self::Code => "Code blocks",
            Self::Table => "Tables",
            Self::Heading => "Headings",
            Self::List => "Lists",
            Self::Paragraph => "Paragraphs",
            Self::Div => "Content blocks",
            Self::Span => "Inline terms",
            Self::Blockquote => "Notes",
            Self::Section => "Sections",
        }
    }
}

/// Tokens that make a bare span worth keeping: HTTP verbs, auth terms
/// and schema type names. Everything else at span granularity is icons,
/// counters and other incidental chrome.
pub const SPAN_VOCABULARY: &[&str] = &[
    "get", "post", "put", "patch", "delete", "head", "options", "token", "bearer", "oauth",
    "auth", "authorization", "apikey", "key", "secret", "credentials", "string", "integer",
    "boolean", "object", "array", "number", "null", "required", "optional", "header",
    "endpoint", "parameter",
];

/// What the classifier decided about a node's size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Inside the category window; extract the node whole.
    Extract,
    /// Above the window; skip, but leave descendants eligible.
    Oversized,
    /// Below the window; skip.
    TooSmall,
}

/// Categorizes a node and judges its text against the category's size
/// window. Pure over the node and the already-computed text size.
///
/// Returns `None` for nodes with no category or with empty text; that is
/// a skip, never an error. Code is exempt from size filtering. Spans are
/// additionally gated on the API vocabulary so short incidental spans do
/// not flood the digest.
pub fn classify(node: &DocumentNode, config: &DigestConfig) -> Option<(Category, Verdict)> {
    let category = node.category?;
    if node.text.trim().is_empty() {
        return None;
    }

    if category == Category::Span && !matches_vocabulary(&node.text, &config.span_vocabulary) {
        return None;
    }

    let verdict = match config.windows.window(category) {
        None => Verdict::Extract,
        Some(window) => {
            if node.size < window.min {
                Verdict::TooSmall
            } else if node.size > window.max {
                Verdict::Oversized
            } else {
                Verdict::Extract
            }
        }
    };

    Some((category, verdict))
}

/// A span qualifies when any of its whitespace-separated tokens equals a
/// vocabulary word, case-insensitively.
fn matches_vocabulary(text: &str, vocabulary: &[String]) -> bool {
    text.split_whitespace().any(|token| {
        let token = token
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        vocabulary.iter().any(|word| word == &token)
    })
}

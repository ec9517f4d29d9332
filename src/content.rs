//! The content module turns a scraped page's HTML into a flat,
//! index-addressed tree of document nodes. Node identity is the arena
//! index, assigned in a single pre-order pass, so the deduplicator can
//! mark whole subtrees covered with a contiguous index range instead of
//! relying on object identity.

use scraper::{ElementRef, Html, Selector as ScraperSelector};

use crate::classify::Category;

/// Stable identity of a node within one page's arena.
pub type NodeId = usize;

/// Raw markup kept per node is capped at this many characters; it is a
/// debugging aid, not digest input.
const MARKUP_PREVIEW_LIMIT: usize = 400;

/// One node of the parsed page tree.
///
/// Nodes are created once per scrape of a page, immutable after parse
/// and discarded after digest assembly. `subtree_end` is the exclusive
/// end of this node's descendant range in pre-order, so the descendants
/// of node `id` are exactly the ids in `id + 1 .. subtree_end`.
#[derive(Debug, Clone)]
pub struct DocumentNode {
    pub id: NodeId,
    pub tag: String,
    pub classes: Vec<String>,
    pub category: Option<Category>,
    /// Whitespace-collapsed text of the node and all its descendants.
    pub text: String,
    /// Text size in characters, precomputed for the classifier.
    pub size: usize,
    /// Truncated raw markup.
    pub markup: String,
    pub subtree_end: NodeId,
}

/// A page's parsed tree: title plus the pre-order node arena.
#[derive(Debug)]
pub struct PageContent {
    pub title: Option<String>,
    nodes: Vec<DocumentNode>,
}

impl PageContent {
    /// Parses HTML into the node arena. Invalid markup is handled the
    /// way browsers handle it; this never fails.
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let title = parse_title(&document);

        let mut nodes = Vec::new();
        push_subtree(&mut nodes, document.root_element());

        Self { title, nodes }
    }

    pub fn nodes(&self) -> &[DocumentNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&DocumentNode> {
        self.nodes.get(id)
    }

    /// Ids of all descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> std::ops::Range<NodeId> {
        match self.nodes.get(id) {
            Some(node) => id + 1..node.subtree_end,
            None => id..id,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Appends `element` and its element descendants to the arena in
/// pre-order, then backfills the subtree end once the size is known.
fn push_subtree(nodes: &mut Vec<DocumentNode>, element: ElementRef) {
    let id = nodes.len();
    let tag = element.value().name().to_lowercase();
    let text = collapse_whitespace(element.text());

    nodes.push(DocumentNode {
        id,
        category: Category::from_tag(&tag),
        tag,
        classes: element.value().classes().map(str::to_string).collect(),
        size: text.chars().count(),
        text,
        markup: truncate_chars(&element.html(), MARKUP_PREVIEW_LIMIT),
        subtree_end: id + 1,
    });

    for child in element.child_elements() {
        push_subtree(nodes, child);
    }

    let end = nodes.len();
    if let Some(node) = nodes.get_mut(id) {
        node.subtree_end = end;
    }
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined = parts.collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(markup: &str, limit: usize) -> String {
    markup.chars().take(limit).collect()
}

/// Parses the page title, falling back to the first h1/h2 when the
/// title element is missing or blank.
fn parse_title(document: &Html) -> Option<String> {
    for tag in ["title", "h1", "h2"] {
        if let Ok(tag_selector) = ScraperSelector::parse(tag)
            && let Some(tag_element) = document.select(&tag_selector).next()
        {
            let tag_text = collapse_whitespace(tag_element.text());
            if !tag_text.is_empty() {
                return Some(tag_text);
            }
        }
    }

    None
}

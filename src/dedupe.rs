//! The dedupe module walks a page's node arena in category priority
//! order and selects the fragments that will feed the digest, making
//! sure no node is emitted twice. Extracting a container covers its
//! whole subtree; skipping an oversized container covers nothing, which
//! leaves its smaller descendants individually eligible later in the
//! pass. That asymmetry is the heart of the algorithm.

use crate::classify::{Category, Verdict, classify};
use crate::config::DigestConfig;
use crate::content::{NodeId, PageContent};

/// One fragment selected for inclusion in the digest. Never mutated
/// after creation.
#[derive(Debug, Clone)]
pub struct ExtractionRecord {
    pub category: Category,
    pub text: String,
    /// Character size of `text`.
    pub size: usize,
    /// Arena id of the node the fragment came from.
    pub node: NodeId,
}

/// Nodes already represented by an ancestor's extraction record. Grows
/// monotonically during the priority pass and is discarded with the
/// page.
#[derive(Debug)]
pub struct CoveredSet {
    bits: Vec<bool>,
}

impl CoveredSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: vec![false; capacity],
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.bits.get(id).copied().unwrap_or(false)
    }

    pub fn cover(&mut self, id: NodeId) {
        if let Some(bit) = self.bits.get_mut(id) {
            *bit = true;
        }
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|bit| **bit).count()
    }
}

/// Selects extraction records from a page, one priority pass over the
/// configured category order.
///
/// Per node in document order: a covered node is skipped; a node inside
/// its category window is emitted and its entire subtree covered; an
/// oversized node is skipped without covering anything. A node with no
/// children and oversized text is simply dropped, there is nothing
/// smaller to recover.
pub fn dedupe(content: &PageContent, config: &DigestConfig) -> Vec<ExtractionRecord> {
    let mut covered = CoveredSet::new(content.len());
    let mut selected = Vec::new();

    for category in &config.dedupe_order {
        for node in content.nodes() {
            if node.category != Some(*category) || covered.contains(node.id) {
                continue;
            }

            match classify(node, config) {
                Some((_, Verdict::Extract)) => {
                    selected.push(ExtractionRecord {
                        category: *category,
                        text: node.text.clone(),
                        size: node.size,
                        node: node.id,
                    });
                    covered.cover(node.id);
                    for descendant in content.descendants(node.id) {
                        covered.cover(descendant);
                    }
                }
                // Oversized or too small: nothing emitted, nothing
                // covered.
                Some((_, Verdict::Oversized | Verdict::TooSmall)) | None => {}
            }
        }
    }

    selected
}

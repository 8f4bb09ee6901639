//! Topological hand detector over a contour tree.
//!
//! A thresholded hand gives an outer contour whose child contours (the gaps
//! between raised fingers) each enclose leaf contours. The classifier looks
//! for that child/grandchild shape instead of measuring finger geometry.

use crate::{
    constants::{MAX_CHILDLESS_CHILDREN, MAX_CHILDREN, MIN_CHILDREN},
    contour::ContourNode,
};
use opencv::core::Point2f;
use serde::{Deserialize, Serialize};

/// Child/grandchild bounds a contour must satisfy to count as a hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandSignature {
    /// Fewest children of the hand contour
    pub min_children: usize,
    /// Most children of the hand contour
    pub max_children: usize,
    /// How many of those children may be leaves
    pub max_childless_children: usize,
}

impl Default for HandSignature {
    fn default() -> Self {
        Self {
            min_children: MIN_CHILDREN,
            max_children: MAX_CHILDREN,
            max_childless_children: MAX_CHILDLESS_CHILDREN,
        }
    }
}

impl HandSignature {
    /// Whether `node` has the hand shape
    #[must_use]
    pub fn matches(&self, node: &ContourNode) -> bool {
        let children = node.children();
        if children.len() < self.min_children || children.len() > self.max_children {
            return false;
        }

        let mut childless = 0;
        for child in children {
            if child.is_leaf() {
                childless += 1;
                if childless > self.max_childless_children {
                    return false;
                }
            }
            // Grandchildren must be leaves
            if child.children().iter().any(|grandchild| !grandchild.is_leaf()) {
                return false;
            }
        }
        true
    }
}

/// A contour recognised as a hand in the current frame
#[derive(Debug, Clone)]
pub struct HandMatch<'a> {
    /// The matched contour
    pub node: &'a ContourNode,
    /// Children of the first child: the raised finger count
    pub fingers: u32,
    pub centroid: Point2f,
    pub area: f64,
}

impl<'a> HandMatch<'a> {
    fn new(node: &'a ContourNode) -> Self {
        let fingers = node
            .children()
            .first()
            .map_or(0, |first| u32::try_from(first.children().len()).unwrap_or(u32::MAX));
        Self {
            node,
            fingers,
            centroid: node.centroid(),
            area: node.area(),
        }
    }
}

/// Finds every hand-shaped subtree of a contour tree
#[derive(Debug, Clone, Copy, Default)]
pub struct HandClassifier {
    signature: HandSignature,
}

impl HandClassifier {
    #[must_use]
    pub const fn new(signature: HandSignature) -> Self {
        Self { signature }
    }

    #[must_use]
    pub const fn signature(&self) -> &HandSignature {
        &self.signature
    }

    /// Depth-first, top-down search from `root` (inclusive).
    ///
    /// Once a node matches its subtree is not searched further, so matches
    /// never overlap. Matches come back in pre-order.
    #[must_use]
    pub fn find_hands<'a>(&self, root: &'a ContourNode) -> Vec<HandMatch<'a>> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.signature.matches(node) {
                found.push(HandMatch::new(node));
            } else {
                stack.extend(node.children().iter().rev());
            }
        }
        found
    }
}

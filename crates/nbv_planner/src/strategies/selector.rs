//! Next-best selection strategies.

use super::NextSelector;
use crate::segment::{SegmentId, SegmentTree};

/// Highest value among the immediate children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImmediateBest;

impl ImmediateBest {
  pub const NAME: &'static str = "immediate_best";
}

impl NextSelector for ImmediateBest {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn select_next_best(&self, tree: &SegmentTree, root: SegmentId) -> Option<usize> {
    argmax(tree.children(root).iter().map(|child| {
      tree
        .get(*child)
        .filter(|segment| segment.is_selectable())
        .and_then(|segment| segment.value())
    }))
  }
}

/// Child whose subtree holds the best value anywhere below it.
///
/// Prefers a branch that leads somewhere good even if its first segment is
/// mediocre.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubsequentBest;

impl SubsequentBest {
  pub const NAME: &'static str = "subsequent_best";

  fn best_in_subtree(tree: &SegmentTree, id: SegmentId) -> Option<f64> {
    std::iter::once(id)
      .chain(tree.descendants(id))
      .filter_map(|node| tree.get(node))
      .filter(|segment| segment.is_selectable())
      .filter_map(|segment| segment.value())
      .reduce(f64::max)
  }
}

impl NextSelector for SubsequentBest {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn select_next_best(&self, tree: &SegmentTree, root: SegmentId) -> Option<usize> {
    argmax(
      tree
        .children(root)
        .iter()
        .map(|child| Self::best_in_subtree(tree, *child)),
    )
  }
}

/// Index of the largest candidate. `None` entries are skipped and ties keep
/// the first index.
fn argmax(candidates: impl Iterator<Item = Option<f64>>) -> Option<usize> {
  let mut best: Option<(usize, f64)> = None;
  for (index, value) in candidates.enumerate() {
    let Some(value) = value.filter(|v| v.is_finite()) else {
      continue;
    };
    if best.map_or(true, |(_, current)| value > current) {
      best = Some((index, value));
    }
  }
  best.map(|(index, _)| index)
}

//! SegmentTree - generational arena of trajectory segments.
//!
//! Segments live in a flat slot vector. Removing a segment bumps its slot's
//! generation and pushes the slot on a free list, so a stale [`SegmentId`]
//! never resolves to a segment allocated later in the same slot.

use std::collections::VecDeque;
use std::fmt;

use super::{TrajectoryPoint, TrajectorySegment};
use crate::error::EvaluationError;

/// Maximum distance between a parent's terminal position and a child's first
/// position.
pub const CONTIGUITY_TOLERANCE: f64 = 1e-6;

/// Handle to a segment in a [`SegmentTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
  index: u32,
  generation: u32,
}

impl SegmentId {
  pub fn index(&self) -> u32 {
    self.index
  }

  pub fn generation(&self) -> u32 {
    self.generation
  }
}

impl fmt::Display for SegmentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}v{}", self.index, self.generation)
  }
}

#[derive(Clone, Debug)]
struct Slot {
  generation: u32,
  segment: Option<TrajectorySegment>,
}

/// Tree of candidate segments rooted at the robot's current state.
///
/// Always holds a root. Cloning gives an independent snapshot.
#[derive(Clone, Debug)]
pub struct SegmentTree {
  slots: Vec<Slot>,
  free: Vec<u32>,
  root: SegmentId,
  len: usize,
}

// A tree always has a root, so it is never empty.
#[allow(clippy::len_without_is_empty)]
impl SegmentTree {
  /// Create a tree holding only a root at `root_state`.
  pub fn new(root_state: TrajectoryPoint) -> Self {
    let mut tree = Self {
      slots: Vec::new(),
      free: Vec::new(),
      root: SegmentId {
        index: 0,
        generation: 0,
      },
      len: 0,
    };
    tree.root = tree.alloc(TrajectorySegment::new(vec![root_state], None));
    tree
  }

  pub fn root(&self) -> SegmentId {
    self.root
  }

  /// Number of live segments, root included.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn contains(&self, id: SegmentId) -> bool {
    self.get(id).is_some()
  }

  pub fn get(&self, id: SegmentId) -> Option<&TrajectorySegment> {
    self
      .slots
      .get(id.index as usize)
      .filter(|slot| slot.generation == id.generation)
      .and_then(|slot| slot.segment.as_ref())
  }

  pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut TrajectorySegment> {
    self
      .slots
      .get_mut(id.index as usize)
      .filter(|slot| slot.generation == id.generation)
      .and_then(|slot| slot.segment.as_mut())
  }

  /// Like [`get`](Self::get), reporting stale ids as an error.
  pub fn segment(&self, id: SegmentId) -> Result<&TrajectorySegment, EvaluationError> {
    self.get(id).ok_or(EvaluationError::UnknownSegment(id))
  }

  pub(crate) fn segment_mut(&mut self, id: SegmentId) -> Result<&mut TrajectorySegment, EvaluationError> {
    self.get_mut(id).ok_or(EvaluationError::UnknownSegment(id))
  }

  /// Append a child segment to `parent`.
  ///
  /// A non-empty trajectory must start at the parent's terminal position.
  /// Empty trajectories are accepted and fail later during scoring.
  pub fn add_child(
    &mut self,
    parent: SegmentId,
    trajectory: Vec<TrajectoryPoint>,
  ) -> Result<SegmentId, EvaluationError> {
    let parent_segment = self.segment(parent)?;
    if let (Some(first), Some(terminal)) = (trajectory.first(), parent_segment.terminal_state()) {
      if first.position.distance(terminal.position) > CONTIGUITY_TOLERANCE {
        return Err(EvaluationError::DiscontiguousTrajectory(parent));
      }
    }

    let id = self.alloc(TrajectorySegment::new(trajectory, Some(parent)));
    self.segment_mut(parent)?.children_mut().push(id);
    Ok(id)
  }

  /// Ordered children of `id`. Empty for unknown ids.
  pub fn children(&self, id: SegmentId) -> &[SegmentId] {
    self.get(id).map(TrajectorySegment::children).unwrap_or(&[])
  }

  /// The `index`-th child of `parent`.
  pub fn child(&self, parent: SegmentId, index: usize) -> Option<SegmentId> {
    self.children(parent).get(index).copied()
  }

  pub fn parent(&self, id: SegmentId) -> Option<SegmentId> {
    self.get(id).and_then(TrajectorySegment::parent)
  }

  /// Edges between the root and `id`; the root has depth 0.
  pub fn depth(&self, id: SegmentId) -> Option<usize> {
    let mut segment = self.get(id)?;
    let mut depth = 0;
    while let Some(parent) = segment.parent() {
      segment = self.get(parent)?;
      depth += 1;
    }
    Some(depth)
  }

  /// All segments below `id` in pre-order, `id` excluded.
  pub fn descendants(&self, id: SegmentId) -> Vec<SegmentId> {
    let mut out = Vec::new();
    let mut stack: Vec<SegmentId> = self.children(id).iter().rev().copied().collect();
    while let Some(next) = stack.pop() {
      out.push(next);
      stack.extend(self.children(next).iter().rev().copied());
    }
    out
  }

  /// Breadth-first layers below the root. `levels()[0]` are the root's
  /// children.
  pub fn levels(&self) -> Vec<Vec<SegmentId>> {
    let mut levels = Vec::new();
    let mut current: Vec<SegmentId> = self.children(self.root).to_vec();
    while !current.is_empty() {
      let next: Vec<SegmentId> = current
        .iter()
        .flat_map(|id| self.children(*id).iter().copied())
        .collect();
      levels.push(current);
      current = next;
    }
    levels
  }

  /// Ids from the root down to `id`, both included. Empty for unknown ids.
  pub fn path_from_root(&self, id: SegmentId) -> Vec<SegmentId> {
    let mut path = VecDeque::new();
    let mut cursor = Some(id);
    while let Some(current) = cursor {
      let Some(segment) = self.get(current) else {
        return Vec::new();
      };
      path.push_front(current);
      cursor = segment.parent();
    }
    path.into()
  }

  /// Make `id` the new root.
  ///
  /// The subtree below `id` is kept. Everything else is removed. The new
  /// root's trajectory shrinks to its terminal state and its scores are
  /// cleared. Returns the number of segments removed.
  pub fn reroot(&mut self, id: SegmentId) -> Result<usize, EvaluationError> {
    let terminal = *self
      .segment(id)?
      .terminal_state()
      .ok_or(EvaluationError::EmptyTrajectory)?;

    let mut keep = vec![false; self.slots.len()];
    keep[id.index as usize] = true;
    for descendant in self.descendants(id) {
      keep[descendant.index as usize] = true;
    }

    let mut pruned = 0;
    for index in 0..self.slots.len() {
      if !keep[index] && self.slots[index].segment.is_some() {
        self.release(index as u32);
        pruned += 1;
      }
    }

    let root = self.segment_mut(id)?;
    root.trajectory = vec![terminal];
    root.set_parent(None);
    root.clear_scores();
    self.root = id;
    Ok(pruned)
  }

  /// Drop every segment and start over from a single root.
  pub fn reset(&mut self, root_state: TrajectoryPoint) {
    for index in 0..self.slots.len() {
      if self.slots[index].segment.is_some() {
        self.release(index as u32);
      }
    }
    self.root = self.alloc(TrajectorySegment::new(vec![root_state], None));
  }

  /// Remove `id` and its subtree. Returns the number of segments removed.
  ///
  /// The root itself is never removed; passing it clears its children.
  pub fn remove_subtree(&mut self, id: SegmentId) -> Result<usize, EvaluationError> {
    let parent = self.segment(id)?.parent();
    let mut doomed = self.descendants(id);

    match parent {
      Some(parent) => {
        self.segment_mut(parent)?.children_mut().retain(|child| *child != id);
        doomed.push(id);
      }
      None => self.segment_mut(id)?.children_mut().clear(),
    }

    for victim in &doomed {
      self.release(victim.index);
    }
    Ok(doomed.len())
  }

  /// Clear the scores of `id` and everything below it. Returns the number of
  /// segments touched.
  pub fn invalidate_subtree(&mut self, id: SegmentId) -> Result<usize, EvaluationError> {
    let mut ids = self.descendants(id);
    ids.push(id);
    for target in &ids {
      self.segment_mut(*target)?.clear_scores();
    }
    Ok(ids.len())
  }

  /// All live segments in slot order.
  pub fn iter(&self) -> impl Iterator<Item = (SegmentId, &TrajectorySegment)> + '_ {
    self.slots.iter().enumerate().filter_map(|(index, slot)| {
      slot.segment.as_ref().map(|segment| {
        (
          SegmentId {
            index: index as u32,
            generation: slot.generation,
          },
          segment,
        )
      })
    })
  }

  // ===========================================================================
  // Slot management
  // ===========================================================================

  fn alloc(&mut self, segment: TrajectorySegment) -> SegmentId {
    self.len += 1;
    if let Some(index) = self.free.pop() {
      let slot = &mut self.slots[index as usize];
      slot.segment = Some(segment);
      return SegmentId {
        index,
        generation: slot.generation,
      };
    }

    self.slots.push(Slot {
      generation: 0,
      segment: Some(segment),
    });
    SegmentId {
      index: (self.slots.len() - 1) as u32,
      generation: 0,
    }
  }

  fn release(&mut self, index: u32) {
    let slot = &mut self.slots[index as usize];
    if slot.segment.take().is_some() {
      slot.generation = slot.generation.wrapping_add(1);
      self.free.push(index);
      self.len -= 1;
    }
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;

//! Candidate trajectory segments and the tree that owns them.
//!
//! ```text
//!            root (executed state, never selected)
//!           /    \
//!         A        B          children are ordered; selection returns
//!        / \        \         an index into the root's child list
//!      A0   A1       B0
//! ```
//!
//! Every segment carries its own gain, cost and value. Scores are filled in
//! stage by stage during a scoring pass and cleared again when the map changes.

use glam::{DQuat, DVec3};
use smallvec::SmallVec;

use crate::error::EvaluationError;

pub mod tree;

pub use tree::{SegmentId, SegmentTree};

/// One timed pose along a trajectory.
///
/// The camera looks along the local +x axis of `orientation`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrajectoryPoint {
  pub position: DVec3,
  pub orientation: DQuat,
  /// Seconds.
  pub time: f64,
}

impl TrajectoryPoint {
  pub fn new(position: DVec3, orientation: DQuat, time: f64) -> Self {
    Self {
      position,
      orientation,
      time,
    }
  }

  /// Pose at `position` facing +x, at time zero.
  pub fn at(position: DVec3) -> Self {
    Self::new(position, DQuat::IDENTITY, 0.0)
  }
}

/// How far a segment got in the current scoring pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScoreStage {
  Unscored,
  GainComputed,
  CostComputed,
  ValueComputed,
  /// A stage failed; see [`TrajectorySegment::failure`].
  Failed,
}

/// A node of the candidate tree.
#[derive(Clone, Debug, Default)]
pub struct TrajectorySegment {
  /// Motion from the parent's terminal state.
  pub trajectory: Vec<TrajectoryPoint>,
  gain: Option<f64>,
  cost: Option<f64>,
  value: Option<f64>,
  failure: Option<EvaluationError>,
  children: SmallVec<[SegmentId; 4]>,
  parent: Option<SegmentId>,
}

impl TrajectorySegment {
  pub(crate) fn new(trajectory: Vec<TrajectoryPoint>, parent: Option<SegmentId>) -> Self {
    Self {
      trajectory,
      parent,
      ..Default::default()
    }
  }

  pub fn gain(&self) -> Option<f64> {
    self.gain
  }

  pub fn cost(&self) -> Option<f64> {
    self.cost
  }

  pub fn value(&self) -> Option<f64> {
    self.value
  }

  /// Error recorded by the last scoring pass, if any stage failed.
  pub fn failure(&self) -> Option<&EvaluationError> {
    self.failure.as_ref()
  }

  pub fn children(&self) -> &[SegmentId] {
    &self.children
  }

  pub fn parent(&self) -> Option<SegmentId> {
    self.parent
  }

  pub fn is_root(&self) -> bool {
    self.parent.is_none()
  }

  /// Last pose of the trajectory.
  pub fn terminal_state(&self) -> Option<&TrajectoryPoint> {
    self.trajectory.last()
  }

  pub fn stage(&self) -> ScoreStage {
    if self.failure.is_some() {
      ScoreStage::Failed
    } else if self.value.is_some() {
      ScoreStage::ValueComputed
    } else if self.cost.is_some() {
      ScoreStage::CostComputed
    } else if self.gain.is_some() {
      ScoreStage::GainComputed
    } else {
      ScoreStage::Unscored
    }
  }

  /// Whether the segment can take part in selection.
  pub fn is_selectable(&self) -> bool {
    self.failure.is_none() && self.value.is_some_and(f64::is_finite)
  }

  /// Read-only view available once both gain and cost are known.
  pub fn scored(&self) -> Option<ScoredSegment<'_>> {
    match (self.gain, self.cost, &self.failure) {
      (Some(gain), Some(cost), None) => Some(ScoredSegment {
        segment: self,
        gain,
        cost,
      }),
      _ => None,
    }
  }

  // A successful stage supersedes any earlier failure.

  pub(crate) fn set_gain(&mut self, gain: f64) {
    self.failure = None;
    self.gain = Some(gain);
  }

  pub(crate) fn set_cost(&mut self, cost: f64) {
    self.failure = None;
    self.cost = Some(cost);
  }

  pub(crate) fn set_value(&mut self, value: f64) {
    self.failure = None;
    self.value = Some(value);
  }

  /// Record a failed stage. The value is withdrawn so the segment cannot be
  /// selected on stale data.
  pub(crate) fn set_failure(&mut self, error: EvaluationError) {
    self.value = None;
    self.failure = Some(error);
  }

  /// Forget all scores and failures.
  pub fn clear_scores(&mut self) {
    self.gain = None;
    self.cost = None;
    self.value = None;
    self.failure = None;
  }

  pub(crate) fn children_mut(&mut self) -> &mut SmallVec<[SegmentId; 4]> {
    &mut self.children
  }

  pub(crate) fn set_parent(&mut self, parent: Option<SegmentId>) {
    self.parent = parent;
  }
}

/// A segment whose gain and cost are both computed.
///
/// Only [`TrajectorySegment::scored`] hands these out, so value strategies
/// never see a half-scored segment.
#[derive(Clone, Copy, Debug)]
pub struct ScoredSegment<'a> {
  segment: &'a TrajectorySegment,
  gain: f64,
  cost: f64,
}

impl<'a> ScoredSegment<'a> {
  pub fn gain(&self) -> f64 {
    self.gain
  }

  pub fn cost(&self) -> f64 {
    self.cost
  }

  pub fn segment(&self) -> &'a TrajectorySegment {
    self.segment
  }
}

//! Cost strategies.
//!
//! With `accumulate` set (the default) a segment's cost includes its parent's,
//! so cost never decreases along a root-to-leaf path. The root contributes 0.

use super::CostComputer;
use crate::config::{ConfigError, ParamMap};
use crate::error::EvaluationError;
use crate::segment::{SegmentId, SegmentTree, TrajectoryPoint, TrajectorySegment};

/// Euclidean length of the trajectory polyline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentLength {
  accumulate: bool,
}

impl SegmentLength {
  pub const NAME: &'static str = "segment_length";

  pub fn new(accumulate: bool) -> Self {
    Self { accumulate }
  }

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    Ok(Self::new(params.get_bool_or("accumulate", true)?))
  }
}

impl CostComputer for SegmentLength {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn compute_cost(&self, tree: &SegmentTree, id: SegmentId) -> Result<f64, EvaluationError> {
    let segment = tree.segment(id)?;
    validate(&segment.trajectory)?;
    let length: f64 = segment
      .trajectory
      .windows(2)
      .map(|pair| pair[0].position.distance(pair[1].position))
      .sum();
    with_parent_cost(tree, segment, length, self.accumulate)
  }
}

/// Elapsed time between the first and last trajectory point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentTime {
  accumulate: bool,
}

impl SegmentTime {
  pub const NAME: &'static str = "segment_time";

  pub fn new(accumulate: bool) -> Self {
    Self { accumulate }
  }

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    Ok(Self::new(params.get_bool_or("accumulate", true)?))
  }
}

impl CostComputer for SegmentTime {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn compute_cost(&self, tree: &SegmentTree, id: SegmentId) -> Result<f64, EvaluationError> {
    let segment = tree.segment(id)?;
    validate(&segment.trajectory)?;
    let (first, last) = match (segment.trajectory.first(), segment.trajectory.last()) {
      (Some(first), Some(last)) => (first, last),
      _ => return Err(EvaluationError::EmptyTrajectory),
    };
    with_parent_cost(tree, segment, last.time - first.time, self.accumulate)
  }
}

/// Reject trajectories no cost can be derived from.
fn validate(trajectory: &[TrajectoryPoint]) -> Result<(), EvaluationError> {
  if trajectory.is_empty() {
    return Err(EvaluationError::EmptyTrajectory);
  }
  if trajectory.windows(2).any(|pair| !(pair[1].time >= pair[0].time)) {
    return Err(EvaluationError::NonMonotonicTime);
  }
  Ok(())
}

fn with_parent_cost(
  tree: &SegmentTree,
  segment: &TrajectorySegment,
  own: f64,
  accumulate: bool,
) -> Result<f64, EvaluationError> {
  if !accumulate {
    return Ok(own);
  }
  let Some(parent_id) = segment.parent() else {
    return Ok(own);
  };
  let parent = tree.segment(parent_id)?;
  if parent.is_root() {
    return Ok(own);
  }
  let parent_cost = parent.cost().ok_or(EvaluationError::ParentUnscored(parent_id))?;
  Ok(parent_cost + own)
}

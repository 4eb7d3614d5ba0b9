//! Error types for scoring, selection and tree maintenance.
//!
//! Configuration problems live in [`crate::config::ConfigError`]; everything
//! here is raised while a tree is being evaluated or updated.

use thiserror::Error;

use crate::segment::SegmentId;
use crate::strategies::StrategyKind;

/// Failure of an evaluator operation.
///
/// Segment-local variants are recorded on the offending segment during a
/// scoring pass and never abort the pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
  /// The segment has no trajectory points.
  #[error("segment trajectory is empty")]
  EmptyTrajectory,

  /// Trajectory timestamps run backwards.
  #[error("segment trajectory timestamps are not monotonic")]
  NonMonotonicTime,

  /// The ray caster cannot produce any rays or samples.
  #[error("degenerate camera model: {0}")]
  DegenerateCamera(&'static str),

  /// Value was requested before gain and cost were both computed.
  #[error("segment {0} has no gain and cost to derive a value from")]
  NotScored(SegmentId),

  /// Cumulative cost needs the parent's cost, which is missing.
  #[error("parent {0} has no cost to accumulate from")]
  ParentUnscored(SegmentId),

  /// The id is stale or never belonged to this tree.
  #[error("segment {0} is not part of the tree")]
  UnknownSegment(SegmentId),

  /// A child trajectory does not start at its parent's terminal state.
  #[error("trajectory does not start at the terminal state of segment {0}")]
  DiscontiguousTrajectory(SegmentId),

  /// No child of the given segment is eligible for selection.
  #[error("segment {0} has no scored children to select from")]
  NoCandidates(SegmentId),

  /// The evaluator was built without the strategy this operation delegates to.
  #[error("no {0} strategy configured")]
  MissingStrategy(StrategyKind),
}

impl EvaluationError {
  /// Whether the planning loop should regrow the tree and try again.
  pub fn requests_regrowth(&self) -> bool {
    matches!(self, EvaluationError::NoCandidates(_))
  }
}

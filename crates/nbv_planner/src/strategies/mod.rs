//! Pluggable evaluation strategies.
//!
//! Each stage of trajectory evaluation is a trait with interchangeable
//! implementations chosen by name at configuration time:
//!
//! ```text
//!   GainComputer ──┐
//!                  ├──► ValueComputer ──► NextSelector ──► (execute) ──► EvaluatorUpdater
//!   CostComputer ──┘
//! ```
//!
//! Strategies compute and return results; the evaluator owns every write to
//! the tree. They depend on the ray caster and the map but never on each
//! other.

use std::fmt;

use crate::bounds::BoundingVolume;
use crate::error::EvaluationError;
use crate::evaluator::TrajectoryEvaluator;
use crate::map::MapQuery;
use crate::ray_caster::RayCaster;
use crate::segment::{ScoredSegment, SegmentId, SegmentTree, TrajectorySegment};

pub mod cost;
pub mod gain;
pub mod selector;
pub mod updater;
pub mod value;

pub use cost::{SegmentLength, SegmentTime};
pub use gain::{Frontier, VoxelWeight};
pub use selector::{ImmediateBest, SubsequentBest};
pub use updater::{RefreshPolicy, ResetTree, Reroot};
pub use value::{Efficiency, ExponentialDiscount, Linear};

/// The strategy interfaces an evaluator is composed of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StrategyKind {
  Gain,
  Cost,
  Value,
  Selector,
  Updater,
}

impl StrategyKind {
  pub const ALL: [StrategyKind; 5] = [
    StrategyKind::Gain,
    StrategyKind::Cost,
    StrategyKind::Value,
    StrategyKind::Selector,
    StrategyKind::Updater,
  ];

  /// Configuration section holding this strategy's parameters.
  pub fn section(&self) -> &'static str {
    match self {
      StrategyKind::Gain => "gain",
      StrategyKind::Cost => "cost",
      StrategyKind::Value => "value",
      StrategyKind::Selector => "selector",
      StrategyKind::Updater => "updater",
    }
  }
}

impl fmt::Display for StrategyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.section())
  }
}

/// Shared read-only inputs for gain computation.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
  pub map: &'a dyn MapQuery,
  pub ray_caster: &'a RayCaster,
  pub bounds: &'a BoundingVolume,
}

/// Expected information from executing a segment.
pub trait GainComputer: Send + Sync + fmt::Debug {
  fn name(&self) -> &'static str;

  fn compute_gain(
    &self,
    segment: &TrajectorySegment,
    ctx: &ScoringContext<'_>,
  ) -> Result<f64, EvaluationError>;
}

/// Resource expenditure of a segment. Results are never negative.
///
/// Gets the whole tree so cumulative implementations can read the parent.
pub trait CostComputer: Send + Sync + fmt::Debug {
  fn name(&self) -> &'static str;

  fn compute_cost(&self, tree: &SegmentTree, id: SegmentId) -> Result<f64, EvaluationError>;
}

/// Scalar utility from gain and cost.
///
/// Must increase with gain and, for positive gain, decrease with cost.
pub trait ValueComputer: Send + Sync + fmt::Debug {
  fn name(&self) -> &'static str;

  fn compute_value(&self, scored: &ScoredSegment<'_>) -> f64;
}

/// Picks the child of `root` to execute next.
///
/// Returns an index into `root`'s children, or `None` if no child is
/// selectable. Ties resolve to the lowest index.
pub trait NextSelector: Send + Sync + fmt::Debug {
  fn name(&self) -> &'static str;

  fn select_next_best(&self, tree: &SegmentTree, root: SegmentId) -> Option<usize>;
}

/// Result of reconciling the tree after execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
  /// The tree was replaced by a bare root and must be regrown.
  RegrowRequested,
  /// The executed segment became the root.
  Rerooted {
    /// Segments discarded.
    pruned: usize,
    /// Segments kept below the new root.
    retained: usize,
  },
}

/// Reconciles the tree once a segment has been executed.
///
/// `parent` is the evaluator that owns this updater, passed per call so the
/// updater can reach the shared ray caster and strategies.
pub trait EvaluatorUpdater: Send + Sync + fmt::Debug {
  fn name(&self) -> &'static str;

  fn update_segments(
    &self,
    tree: &mut SegmentTree,
    executed: SegmentId,
    parent: &TrajectoryEvaluator,
    map: &dyn MapQuery,
  ) -> Result<UpdateOutcome, EvaluationError>;
}

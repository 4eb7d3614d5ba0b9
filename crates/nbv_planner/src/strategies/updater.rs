//! Tree maintenance after a segment has been executed.

use tracing::debug;

use super::{EvaluatorUpdater, UpdateOutcome};
use crate::config::{ConfigError, ParamMap};
use crate::error::EvaluationError;
use crate::evaluator::TrajectoryEvaluator;
use crate::map::MapQuery;
use crate::segment::{SegmentId, SegmentTree};

/// Discard the whole tree and ask the planner to regrow it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetTree;

impl ResetTree {
  pub const NAME: &'static str = "reset_tree";
}

impl EvaluatorUpdater for ResetTree {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn update_segments(
    &self,
    tree: &mut SegmentTree,
    executed: SegmentId,
    _parent: &TrajectoryEvaluator,
    _map: &dyn MapQuery,
  ) -> Result<UpdateOutcome, EvaluationError> {
    let terminal = *tree
      .segment(executed)?
      .terminal_state()
      .ok_or(EvaluationError::EmptyTrajectory)?;
    tree.reset(terminal);
    Ok(UpdateOutcome::RegrowRequested)
  }
}

/// What happens to the scores of retained segments after re-rooting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
  /// Keep scores as they are. Cheap, but they predate the latest map
  /// update, and cumulative costs still include the executed segment.
  Keep,
  /// Clear scores so the next scoring pass recomputes them.
  #[default]
  Invalidate,
  /// Clear scores and rescore right away through the owning evaluator.
  Recompute,
}

impl RefreshPolicy {
  pub fn parse(name: &str) -> Option<Self> {
    match name {
      "keep" => Some(Self::Keep),
      "invalidate" => Some(Self::Invalidate),
      "recompute" => Some(Self::Recompute),
      _ => None,
    }
  }
}

/// Keep the executed segment's subtree and make it the new root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reroot {
  refresh: RefreshPolicy,
}

impl Reroot {
  pub const NAME: &'static str = "reroot";

  pub fn new(refresh: RefreshPolicy) -> Self {
    Self { refresh }
  }

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    let name = params.get_str_or("refresh", "invalidate")?;
    let refresh = RefreshPolicy::parse(name).ok_or_else(|| ConfigError::InvalidValue {
      key: params.qualified("refresh"),
      reason: format!("`{name}` is not one of keep, invalidate, recompute"),
    })?;
    Ok(Self::new(refresh))
  }

  pub fn refresh(&self) -> RefreshPolicy {
    self.refresh
  }
}

impl EvaluatorUpdater for Reroot {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn update_segments(
    &self,
    tree: &mut SegmentTree,
    executed: SegmentId,
    parent: &TrajectoryEvaluator,
    map: &dyn MapQuery,
  ) -> Result<UpdateOutcome, EvaluationError> {
    let pruned = tree.reroot(executed)?;
    let retained = tree.len() - 1;

    match self.refresh {
      RefreshPolicy::Keep => {}
      RefreshPolicy::Invalidate => {
        tree.invalidate_subtree(executed)?;
      }
      RefreshPolicy::Recompute => {
        tree.invalidate_subtree(executed)?;
        let stats = parent.score_tree(tree, map)?;
        debug!(values = stats.values, failed = stats.failed, "rescored retained segments");
      }
    }

    Ok(UpdateOutcome::Rerooted { pruned, retained })
  }
}

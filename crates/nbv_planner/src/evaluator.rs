//! TrajectoryEvaluator - composes the strategies into one scoring pipeline.
//!
//! A planning cycle walks every candidate segment through the stages
//!
//! ```text
//!   Unscored ─► GainComputed ─► CostComputed ─► ValueComputed ─► selected
//!      ▲                                                            │
//!      └───────────── update_segments (after execution) ◄───────────┘
//! ```
//!
//! [`score_tree`](TrajectoryEvaluator::score_tree) runs the stages in bulk.
//! Gain has no data dependency between segments, so all pending gains run in
//! one parallel batch. Cumulative cost needs the parent's cost, so costs run
//! level by level, parallel within a level. Workers only read the tree and the
//! map; results are written back sequentially.

use rayon::prelude::*;
use tracing::{debug, info_span, trace};
use web_time::Instant;

use crate::bounds::BoundingVolume;
use crate::error::EvaluationError;
use crate::map::MapQuery;
use crate::ray_caster::RayCaster;
use crate::segment::{SegmentId, SegmentTree, TrajectorySegment};
use crate::strategies::{
  CostComputer, EvaluatorUpdater, GainComputer, NextSelector, ScoringContext, StrategyKind,
  UpdateOutcome, ValueComputer,
};

/// Counters from one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringStats {
  /// Gains computed this pass.
  pub gains: usize,
  /// Costs computed this pass.
  pub costs: usize,
  /// Values computed this pass.
  pub values: usize,
  /// Segments that failed a stage this pass.
  pub failed: usize,
  /// Gain stage time in microseconds.
  pub gain_us: u64,
  /// Cost stage time in microseconds.
  pub cost_us: u64,
  /// Value stage time in microseconds.
  pub value_us: u64,
}

impl ScoringStats {
  pub fn total_us(&self) -> u64 {
    self.gain_us + self.cost_us + self.value_us
  }
}

/// Scores, selects and maintains candidate trajectory segments.
#[derive(Debug)]
pub struct TrajectoryEvaluator {
  gain: Box<dyn GainComputer>,
  cost: Option<Box<dyn CostComputer>>,
  value: Option<Box<dyn ValueComputer>>,
  selector: Option<Box<dyn NextSelector>>,
  updater: Option<Box<dyn EvaluatorUpdater>>,
  ray_caster: RayCaster,
  bounds: BoundingVolume,
  parallel: bool,
}

impl TrajectoryEvaluator {
  /// Create an evaluator with only a gain strategy.
  ///
  /// Operations that need another strategy fail with
  /// [`EvaluationError::MissingStrategy`] until it is set.
  pub fn new(gain: Box<dyn GainComputer>, ray_caster: RayCaster) -> Self {
    Self {
      gain,
      cost: None,
      value: None,
      selector: None,
      updater: None,
      ray_caster,
      bounds: BoundingVolume::Unbounded,
      parallel: true,
    }
  }

  pub fn with_cost(mut self, cost: Box<dyn CostComputer>) -> Self {
    self.cost = Some(cost);
    self
  }

  pub fn with_value(mut self, value: Box<dyn ValueComputer>) -> Self {
    self.value = Some(value);
    self
  }

  pub fn with_selector(mut self, selector: Box<dyn NextSelector>) -> Self {
    self.selector = Some(selector);
    self
  }

  pub fn with_updater(mut self, updater: Box<dyn EvaluatorUpdater>) -> Self {
    self.updater = Some(updater);
    self
  }

  pub fn with_bounds(mut self, bounds: BoundingVolume) -> Self {
    self.bounds = bounds;
    self
  }

  /// Run scoring stages on the rayon pool (default) or the calling thread.
  pub fn with_parallel(mut self, parallel: bool) -> Self {
    self.parallel = parallel;
    self
  }

  // ===========================================================================
  // Accessors
  // ===========================================================================

  pub fn gain_computer(&self) -> &dyn GainComputer {
    self.gain.as_ref()
  }

  pub fn cost_computer(&self) -> Option<&dyn CostComputer> {
    self.cost.as_deref()
  }

  pub fn value_computer(&self) -> Option<&dyn ValueComputer> {
    self.value.as_deref()
  }

  pub fn next_selector(&self) -> Option<&dyn NextSelector> {
    self.selector.as_deref()
  }

  pub fn evaluator_updater(&self) -> Option<&dyn EvaluatorUpdater> {
    self.updater.as_deref()
  }

  pub fn ray_caster(&self) -> &RayCaster {
    &self.ray_caster
  }

  pub fn bounds(&self) -> &BoundingVolume {
    &self.bounds
  }

  pub fn is_parallel(&self) -> bool {
    self.parallel
  }

  /// Read-only inputs handed to gain strategies.
  pub fn scoring_context<'a>(&'a self, map: &'a dyn MapQuery) -> ScoringContext<'a> {
    ScoringContext {
      map,
      ray_caster: &self.ray_caster,
      bounds: &self.bounds,
    }
  }

  fn require_cost(&self) -> Result<&dyn CostComputer, EvaluationError> {
    self
      .cost
      .as_deref()
      .ok_or(EvaluationError::MissingStrategy(StrategyKind::Cost))
  }

  fn require_value(&self) -> Result<&dyn ValueComputer, EvaluationError> {
    self
      .value
      .as_deref()
      .ok_or(EvaluationError::MissingStrategy(StrategyKind::Value))
  }

  // ===========================================================================
  // Single-segment stages
  // ===========================================================================

  /// Compute and store the gain of one segment.
  ///
  /// Failures are recorded on the segment and returned.
  pub fn compute_gain(
    &self,
    tree: &mut SegmentTree,
    id: SegmentId,
    map: &dyn MapQuery,
  ) -> Result<f64, EvaluationError> {
    let result = self
      .gain
      .compute_gain(tree.segment(id)?, &self.scoring_context(map));
    record(tree, id, result, Stage::Gain)
  }

  /// Compute and store the cost of one segment.
  ///
  /// Failures are recorded on the segment and returned.
  pub fn compute_cost(&self, tree: &mut SegmentTree, id: SegmentId) -> Result<f64, EvaluationError> {
    let cost = self.require_cost()?;
    tree.segment(id)?;
    let result = cost.compute_cost(tree, id);
    record(tree, id, result, Stage::Cost)
  }

  /// Derive and store the value of a segment whose gain and cost are known.
  ///
  /// A segment that already failed reports its recorded failure.
  pub fn compute_value(&self, tree: &mut SegmentTree, id: SegmentId) -> Result<f64, EvaluationError> {
    let value_computer = self.require_value()?;
    let segment = tree.segment(id)?;
    if let Some(failure) = segment.failure() {
      return Err(failure.clone());
    }
    let scored = segment.scored().ok_or(EvaluationError::NotScored(id))?;
    let value = value_computer.compute_value(&scored);
    record(tree, id, Ok(value), Stage::Value)
  }

  /// Index of the most promising child of `root`.
  ///
  /// Fails with [`EvaluationError::NoCandidates`] when no child is
  /// selectable; the caller should regrow the tree.
  pub fn select_next_best(&self, tree: &SegmentTree, root: SegmentId) -> Result<usize, EvaluationError> {
    let selector = self
      .selector
      .as_deref()
      .ok_or(EvaluationError::MissingStrategy(StrategyKind::Selector))?;
    tree.segment(root)?;
    selector
      .select_next_best(tree, root)
      .ok_or(EvaluationError::NoCandidates(root))
  }

  /// Reconcile the tree after `executed` has been flown.
  pub fn update_segments(
    &self,
    tree: &mut SegmentTree,
    executed: SegmentId,
    map: &dyn MapQuery,
  ) -> Result<UpdateOutcome, EvaluationError> {
    let updater = self
      .updater
      .as_deref()
      .ok_or(EvaluationError::MissingStrategy(StrategyKind::Updater))?;
    let _span = info_span!("update_segments", updater = updater.name()).entered();

    let outcome = updater.update_segments(tree, executed, self, map)?;
    debug!(?outcome, segments = tree.len(), "tree updated");
    Ok(outcome)
  }

  // ===========================================================================
  // Whole-tree scoring
  // ===========================================================================

  /// Score every non-root segment that has no value yet.
  ///
  /// Segments that already failed are left alone. A failing segment does not
  /// abort the pass; only a missing strategy does.
  pub fn score_tree(&self, tree: &mut SegmentTree, map: &dyn MapQuery) -> Result<ScoringStats, EvaluationError> {
    let cost = self.require_cost()?;
    let value_computer = self.require_value()?;
    let _span = info_span!("score_tree", segments = tree.len(), parallel = self.parallel).entered();

    let mut stats = ScoringStats::default();
    let root = tree.root();
    let levels = tree.levels();

    // Stage 1: gains for every pending segment
    let gain_start = Instant::now();
    {
      let _span = info_span!("gain_stage").entered();
      let pending = pending_ids(tree, levels.iter().flatten().copied(), |s| s.gain().is_none());
      let ctx = self.scoring_context(map);
      let snapshot: &SegmentTree = tree;
      let results = self.run_batch(&pending, |id| {
        self.gain.compute_gain(snapshot.segment(id)?, &ctx)
      });
      let failed = write_back(tree, results, Stage::Gain)?;
      stats.gains = pending.len() - failed;
      stats.failed += failed;
    }
    stats.gain_us = gain_start.elapsed().as_micros() as u64;

    // Stage 2: costs, one level at a time so parents finish first
    let cost_start = Instant::now();
    {
      let _span = info_span!("cost_stage", levels = levels.len()).entered();
      for level in &levels {
        let pending = pending_ids(tree, level.iter().copied(), |s| s.cost().is_none());
        let snapshot: &SegmentTree = tree;
        let results = self.run_batch(&pending, |id| cost.compute_cost(snapshot, id));
        let failed = write_back(tree, results, Stage::Cost)?;
        stats.costs += pending.len() - failed;
        stats.failed += failed;
      }
    }
    stats.cost_us = cost_start.elapsed().as_micros() as u64;

    // Stage 3: values
    let value_start = Instant::now();
    {
      let _span = info_span!("value_stage").entered();
      for id in tree.descendants(root) {
        let segment = tree.segment(id)?;
        if segment.failure().is_some() || segment.value().is_some() {
          continue;
        }
        if let Some(scored) = segment.scored() {
          let value = value_computer.compute_value(&scored);
          record(tree, id, Ok(value), Stage::Value)?;
          stats.values += 1;
        }
      }
    }
    stats.value_us = value_start.elapsed().as_micros() as u64;

    debug!(
      gains = stats.gains,
      costs = stats.costs,
      values = stats.values,
      failed = stats.failed,
      total_us = stats.total_us(),
      "scored tree"
    );
    Ok(stats)
  }

  /// Clear every score below the root and score the whole tree again.
  pub fn rescore_tree(&self, tree: &mut SegmentTree, map: &dyn MapQuery) -> Result<ScoringStats, EvaluationError> {
    let root = tree.root();
    for child in tree.children(root).to_vec() {
      tree.invalidate_subtree(child)?;
    }
    self.score_tree(tree, map)
  }

  /// Run `f` for every id, on the rayon pool when enabled.
  fn run_batch<F>(&self, ids: &[SegmentId], f: F) -> Vec<(SegmentId, Result<f64, EvaluationError>)>
  where
    F: Fn(SegmentId) -> Result<f64, EvaluationError> + Sync + Send,
  {
    if self.parallel {
      ids.par_iter().map(|id| (*id, f(*id))).collect()
    } else {
      ids.iter().map(|id| (*id, f(*id))).collect()
    }
  }
}

#[derive(Clone, Copy, Debug)]
enum Stage {
  Gain,
  Cost,
  Value,
}

/// Ids among `candidates` that have not failed and still need a stage.
fn pending_ids(
  tree: &SegmentTree,
  candidates: impl Iterator<Item = SegmentId>,
  needs: impl Fn(&TrajectorySegment) -> bool,
) -> Vec<SegmentId> {
  candidates
    .filter(|id| {
      tree
        .get(*id)
        .is_some_and(|segment| segment.failure().is_none() && needs(segment))
    })
    .collect()
}

/// Store a stage result on its segment, recording failures.
fn record(
  tree: &mut SegmentTree,
  id: SegmentId,
  result: Result<f64, EvaluationError>,
  stage: Stage,
) -> Result<f64, EvaluationError> {
  store(tree.segment_mut(id)?, id, result, stage)
}

fn store(
  segment: &mut TrajectorySegment,
  id: SegmentId,
  result: Result<f64, EvaluationError>,
  stage: Stage,
) -> Result<f64, EvaluationError> {
  match result {
    Ok(score) => {
      match stage {
        Stage::Gain => segment.set_gain(score),
        Stage::Cost => segment.set_cost(score),
        Stage::Value => segment.set_value(score),
      }
      Ok(score)
    }
    Err(error) => {
      trace!(segment = %id, ?stage, %error, "segment failed");
      segment.set_failure(error.clone());
      Err(error)
    }
  }
}

/// Record a batch of results. Returns how many failed.
fn write_back(
  tree: &mut SegmentTree,
  results: Vec<(SegmentId, Result<f64, EvaluationError>)>,
  stage: Stage,
) -> Result<usize, EvaluationError> {
  let mut failed = 0;
  for (id, result) in results {
    if store(tree.segment_mut(id)?, id, result, stage).is_err() {
      failed += 1;
    }
  }
  Ok(failed)
}

#[cfg(test)]
#[path = "evaluator_test.rs"]
mod evaluator_test;

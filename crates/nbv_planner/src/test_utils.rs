//! Test utilities for evaluator and strategy tests.
//!
//! Provides a small evaluator, scripted strategies and tree fixtures.

use glam::{DQuat, DVec3};

use crate::error::EvaluationError;
use crate::evaluator::TrajectoryEvaluator;
use crate::map::MapQuery;
use crate::ray_caster::{RayCaster, RayCasterConfig};
use crate::segment::{SegmentId, SegmentTree, TrajectoryPoint, TrajectorySegment};
use crate::strategies::{
  GainComputer, ImmediateBest, Linear, Reroot, ScoringContext, SegmentLength, VoxelWeight,
};

/// Where every fixture tree starts.
pub const START: DVec3 = DVec3::splat(0.5);

// =============================================================================
// Trajectories
// =============================================================================

/// Two-point trajectory from `from` to `to`, facing the direction of travel.
/// Time advances one second per unit of distance.
pub fn straight(from: DVec3, to: DVec3, start_time: f64) -> Vec<TrajectoryPoint> {
  let delta = to - from;
  let orientation = if delta.length_squared() > 0.0 {
    DQuat::from_rotation_arc(DVec3::X, delta.normalize())
  } else {
    DQuat::IDENTITY
  };
  vec![
    TrajectoryPoint::new(from, orientation, start_time),
    TrajectoryPoint::new(to, orientation, start_time + delta.length()),
  ]
}

// =============================================================================
// Strategies
// =============================================================================

/// Gain looked up by terminal position. Unlisted positions have zero gain.
#[derive(Debug, Default)]
pub struct ScriptedGain {
  gains: Vec<(DVec3, f64)>,
}

impl ScriptedGain {
  pub fn new(gains: &[(DVec3, f64)]) -> Self {
    Self {
      gains: gains.to_vec(),
    }
  }
}

impl GainComputer for ScriptedGain {
  fn name(&self) -> &'static str {
    "scripted"
  }

  fn compute_gain(
    &self,
    segment: &TrajectorySegment,
    _ctx: &ScoringContext<'_>,
  ) -> Result<f64, EvaluationError> {
    let terminal = segment
      .terminal_state()
      .ok_or(EvaluationError::EmptyTrajectory)?;
    Ok(self
      .gains
      .iter()
      .find(|(position, _)| position.distance(terminal.position) < 1e-9)
      .map_or(0.0, |(_, gain)| *gain))
  }
}

/// Small camera so tests stay fast.
pub fn small_caster() -> RayCaster {
  RayCaster::new(RayCasterConfig {
    ray_length: 3.0,
    focal_length: 2.0,
    ray_step: 0.25,
    resolution_x: 4,
    resolution_y: 3,
  })
}

/// Fully configured evaluator: voxel gain, cumulative length cost, linear
/// value, immediate selection, re-rooting updater.
pub fn test_evaluator() -> TrajectoryEvaluator {
  with_defaults(TrajectoryEvaluator::new(Box::new(VoxelWeight::default()), small_caster()))
}

/// Evaluator that takes gains from a table instead of the map.
pub fn scripted_evaluator(gains: &[(DVec3, f64)]) -> TrajectoryEvaluator {
  with_defaults(TrajectoryEvaluator::new(
    Box::new(ScriptedGain::new(gains)),
    small_caster(),
  ))
}

fn with_defaults(evaluator: TrajectoryEvaluator) -> TrajectoryEvaluator {
  evaluator
    .with_cost(Box::new(SegmentLength::new(true)))
    .with_value(Box::new(Linear::default()))
    .with_selector(Box::new(ImmediateBest))
    .with_updater(Box::new(Reroot::default()))
}

// =============================================================================
// Trees
// =============================================================================

/// ```text
/// root ── a (+x, 2) ── a0 (+x, 1)
///      └─ b (+y, 1) ── b0 (+y, 1)
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Fixture {
  pub a: SegmentId,
  pub a0: SegmentId,
  pub b: SegmentId,
  pub b0: SegmentId,
}

impl Fixture {
  pub fn a_end() -> DVec3 {
    START + DVec3::new(2.0, 0.0, 0.0)
  }

  pub fn b_end() -> DVec3 {
    START + DVec3::new(0.0, 1.0, 0.0)
  }
}

pub fn fixture_tree() -> (SegmentTree, Fixture) {
  let mut tree = SegmentTree::new(TrajectoryPoint::at(START));
  let root = tree.root();
  let a_end = Fixture::a_end();
  let b_end = Fixture::b_end();

  let a = tree.add_child(root, straight(START, a_end, 0.0)).unwrap();
  let a0 = tree
    .add_child(a, straight(a_end, a_end + DVec3::X, 2.0))
    .unwrap();
  let b = tree.add_child(root, straight(START, b_end, 0.0)).unwrap();
  let b0 = tree
    .add_child(b, straight(b_end, b_end + DVec3::Y, 1.0))
    .unwrap();

  (tree, Fixture { a, a0, b, b0 })
}

/// Fixture tree after one full scoring pass.
pub fn scored_fixture(evaluator: &TrajectoryEvaluator, map: &dyn MapQuery) -> (SegmentTree, Fixture) {
  let (mut tree, fixture) = fixture_tree();
  evaluator.score_tree(&mut tree, map).unwrap();
  (tree, fixture)
}

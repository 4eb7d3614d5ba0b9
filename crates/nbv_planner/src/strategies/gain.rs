//! Gain strategies built on visibility ray casting.
//!
//! A segment is viewed from one or more poses along its trajectory (see
//! `sampling_interval`). The visible voxels of all poses are merged before
//! weighting, so a voxel seen twice counts once. Voxels outside the bounding
//! volume contribute nothing.

use std::collections::HashSet;

use glam::DVec3;

use super::{GainComputer, ScoringContext};
use crate::config::{ConfigError, ParamMap};
use crate::error::EvaluationError;
use crate::map::{VoxelState, FACE_OFFSETS};
use crate::segment::{TrajectoryPoint, TrajectorySegment};

/// Voxel count weighted by observation state.
///
/// With default weights this is the number of unknown voxels the segment
/// would observe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelWeight {
  pub unknown_weight: f64,
  pub free_weight: f64,
  pub occupied_weight: f64,
  /// Seconds between view poses. 0 uses the terminal pose only.
  pub sampling_interval: f64,
}

impl VoxelWeight {
  pub const NAME: &'static str = "voxel_weight";

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    Ok(Self {
      unknown_weight: params.get_non_negative_f64_or("unknown_weight", 1.0)?,
      free_weight: params.get_non_negative_f64_or("free_weight", 0.0)?,
      occupied_weight: params.get_non_negative_f64_or("occupied_weight", 0.0)?,
      sampling_interval: params.get_non_negative_f64_or("sampling_interval", 0.0)?,
    })
  }
}

impl Default for VoxelWeight {
  fn default() -> Self {
    Self {
      unknown_weight: 1.0,
      free_weight: 0.0,
      occupied_weight: 0.0,
      sampling_interval: 0.0,
    }
  }
}

impl GainComputer for VoxelWeight {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn compute_gain(
    &self,
    segment: &TrajectorySegment,
    ctx: &ScoringContext<'_>,
  ) -> Result<f64, EvaluationError> {
    let visible = visible_from_segment(segment, self.sampling_interval, ctx)?;
    let gain = visible
      .iter()
      .filter(|center| ctx.bounds.contains_point(**center))
      .map(|center| {
        let query = ctx.map.query_voxel(*center);
        if query.is_occupied() {
          self.occupied_weight
        } else if query.state == VoxelState::Free {
          self.free_weight
        } else {
          self.unknown_weight
        }
      })
      .sum();
    Ok(gain)
  }
}

/// Visible unknown voxels that border known free space.
///
/// Frontier voxels are where new free space is most likely to be revealed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frontier {
  pub frontier_weight: f64,
  pub sampling_interval: f64,
}

impl Frontier {
  pub const NAME: &'static str = "frontier";

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    Ok(Self {
      frontier_weight: params.get_non_negative_f64_or("frontier_weight", 1.0)?,
      sampling_interval: params.get_non_negative_f64_or("sampling_interval", 0.0)?,
    })
  }
}

impl Default for Frontier {
  fn default() -> Self {
    Self {
      frontier_weight: 1.0,
      sampling_interval: 0.0,
    }
  }
}

impl GainComputer for Frontier {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn compute_gain(
    &self,
    segment: &TrajectorySegment,
    ctx: &ScoringContext<'_>,
  ) -> Result<f64, EvaluationError> {
    let visible = visible_from_segment(segment, self.sampling_interval, ctx)?;
    let voxel_size = ctx.map.voxel_size();
    let frontier = visible
      .iter()
      .filter(|center| ctx.bounds.contains_point(**center))
      .filter(|center| ctx.map.query_voxel(**center).state == VoxelState::Unknown)
      .filter(|center| {
        FACE_OFFSETS.iter().any(|offset| {
          let neighbour = **center + offset.as_dvec3() * voxel_size;
          let query = ctx.map.query_voxel(neighbour);
          query.state == VoxelState::Free && !query.is_occupied()
        })
      })
      .count();
    Ok(frontier as f64 * self.frontier_weight)
  }
}

/// Poses to cast from: the terminal pose, then earlier poses at least
/// `interval` seconds apart, walking backwards.
pub fn view_poses(
  trajectory: &[TrajectoryPoint],
  interval: f64,
) -> Result<Vec<&TrajectoryPoint>, EvaluationError> {
  let terminal = trajectory.last().ok_or(EvaluationError::EmptyTrajectory)?;
  let mut poses = vec![terminal];
  if interval <= 0.0 {
    return Ok(poses);
  }

  let mut last_time = terminal.time;
  for point in trajectory.iter().rev().skip(1) {
    if last_time - point.time >= interval {
      poses.push(point);
      last_time = point.time;
    }
  }
  Ok(poses)
}

fn visible_from_segment(
  segment: &TrajectorySegment,
  interval: f64,
  ctx: &ScoringContext<'_>,
) -> Result<Vec<DVec3>, EvaluationError> {
  let mut seen = HashSet::new();
  let mut visible = Vec::new();
  for pose in view_poses(&segment.trajectory, interval)? {
    ctx
      .ray_caster
      .collect_visible_voxels(ctx.map, pose.position, pose.orientation, &mut seen, &mut visible)?;
  }
  Ok(visible)
}

//! Synthetic world: a hidden ground-truth grid and the robot's belief grid.

use anyhow::Result;
use glam::DVec3;
use nbv_planner::{MapQuery, RayCaster, TrajectoryPoint, VoxelGrid, VoxelState};

use crate::config::SceneConfig;

/// Ground truth plus what the robot has observed so far.
pub struct Scene {
	/// Full world. Only read through the ray caster.
	pub truth: VoxelGrid,
	/// Map the planner scores against.
	pub belief: VoxelGrid,
	pub start: DVec3,
	world_min: DVec3,
	world_max: DVec3,
}

impl Scene {
	pub fn build(config: &SceneConfig) -> Self {
		let world_min = DVec3::from_array(config.world_min);
		let world_max = DVec3::from_array(config.world_max);
		let mut truth = VoxelGrid::new(config.voxel_size);
		truth.fill_box(world_min, world_max, VoxelState::Free);
		for obstacle in &config.obstacles {
			truth.fill_box(
				DVec3::from_array(obstacle.min),
				DVec3::from_array(obstacle.max),
				VoxelState::Occupied,
			);
		}

		let start = DVec3::from_array(config.start);
		let mut belief = VoxelGrid::new(config.voxel_size);
		belief.fill_sphere(start, config.known_radius, VoxelState::Free);

		Self {
			truth,
			belief,
			start,
			world_min,
			world_max,
		}
	}

	/// Copy the truth of every voxel visible from `pose` into the belief.
	/// Returns how many belief voxels changed.
	pub fn observe(&mut self, caster: &RayCaster, pose: &TrajectoryPoint) -> Result<usize> {
		let visible = caster.get_visible_voxels(&self.truth, pose.position, pose.orientation)?;
		let mut changed = 0;
		for center in visible {
			let state = self.truth.state_at(center);
			if state != VoxelState::Unknown && self.belief.observe(center, state) {
				changed += 1;
			}
		}
		Ok(changed)
	}

	/// Fraction of the truth's known voxels that the belief has observed.
	pub fn coverage(&self) -> f64 {
		let total = self.truth.observed_count();
		if total == 0 {
			return 1.0;
		}
		self.belief.observed_count() as f64 / total as f64
	}

	/// Whether `point` is blocked according to the belief.
	pub fn is_blocked(&self, point: DVec3) -> bool {
		self.belief.state_at(point) == VoxelState::Occupied
	}

	/// Inside the world and not known to be blocked.
	pub fn is_traversable(&self, point: DVec3) -> bool {
		point.cmpge(self.world_min).all() && point.cmple(self.world_max).all() && !self.is_blocked(point)
	}

	pub fn voxel_size(&self) -> f64 {
		self.belief.voxel_size()
	}
}

//! Candidate generator: grows a fan of straight segments under every
//! shallow leaf of the tree.

use std::f64::consts::TAU;

use anyhow::Result;
use glam::{DQuat, DVec3};
use nbv_planner::{SegmentId, SegmentTree, TrajectoryPoint};

use crate::config::GeneratorConfig;
use crate::scene::Scene;

/// Expand every segment shallower than `config.depth` that has no children.
///
/// Headings are spread evenly around the vertical axis. Candidates that leave
/// the world or pass through known obstacles are skipped. Returns the number
/// of segments added.
pub fn grow(tree: &mut SegmentTree, scene: &Scene, config: &GeneratorConfig) -> Result<usize> {
	let mut added = 0;
	let mut frontier: Vec<(SegmentId, usize)> = vec![(tree.root(), 0)];

	while let Some((id, depth)) = frontier.pop() {
		if depth >= config.depth {
			continue;
		}
		if tree.children(id).is_empty() {
			let Some(start) = tree.get(id).and_then(|s| s.terminal_state()).copied() else {
				continue;
			};
			for branch in 0..config.branches {
				let yaw = TAU * branch as f64 / config.branches as f64;
				let trajectory = straight_segment(&start, yaw, config);
				if trajectory.iter().all(|p| scene.is_traversable(p.position))
					&& is_clear(scene, &trajectory)
				{
					tree.add_child(id, trajectory)?;
					added += 1;
				}
			}
		}
		frontier.extend(tree.children(id).iter().map(|child| (*child, depth + 1)));
	}

	Ok(added)
}

/// Evenly spaced points from `start` along heading `yaw`, timed by speed.
pub fn straight_segment(start: &TrajectoryPoint, yaw: f64, config: &GeneratorConfig) -> Vec<TrajectoryPoint> {
	let orientation = DQuat::from_rotation_z(yaw);
	let direction = orientation * DVec3::X;
	let last = (config.points_per_segment - 1).max(1) as f64;

	(0..config.points_per_segment)
		.map(|i| {
			let travelled = config.segment_length * i as f64 / last;
			TrajectoryPoint::new(
				start.position + direction * travelled,
				orientation,
				start.time + travelled / config.speed,
			)
		})
		.collect()
}

/// Check the straight path between consecutive points at half-voxel steps.
fn is_clear(scene: &Scene, trajectory: &[TrajectoryPoint]) -> bool {
	let step = scene.voxel_size() * 0.5;
	trajectory.windows(2).all(|pair| {
		let (from, to) = (pair[0].position, pair[1].position);
		let steps = (from.distance(to) / step).ceil() as usize;
		(0..=steps).all(|k| {
			let t = if steps == 0 { 0.0 } else { k as f64 / steps as f64 };
			scene.is_traversable(from.lerp(to, t))
		})
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{BoxConfig, SceneConfig};

	fn scene(obstacles: Vec<BoxConfig>) -> Scene {
		Scene::build(&SceneConfig {
			voxel_size: 0.25,
			start: [0.0, 0.0, 1.0],
			known_radius: 3.0,
			world_min: [-10.0, -10.0, 0.0],
			world_max: [10.0, 10.0, 2.0],
			obstacles,
		})
	}

	fn generator(branches: usize, depth: usize) -> GeneratorConfig {
		GeneratorConfig {
			branches,
			depth,
			segment_length: 1.0,
			points_per_segment: 3,
			speed: 2.0,
		}
	}

	#[test]
	fn test_straight_segment_spacing_and_time() {
		let start = TrajectoryPoint::at(DVec3::new(1.0, 0.0, 1.0));
		let points = straight_segment(&start, std::f64::consts::FRAC_PI_2, &generator(1, 1));

		assert_eq!(points.len(), 3);
		assert!(points[0].position.distance(start.position) < 1e-12);
		assert!(points[2].position.distance(DVec3::new(1.0, 1.0, 1.0)) < 1e-9);
		assert!((points[1].time - 0.25).abs() < 1e-12);
		assert!((points[2].time - 0.5).abs() < 1e-12);
	}

	#[test]
	fn test_grow_full_fan() {
		let scene = scene(Vec::new());
		let mut tree = SegmentTree::new(TrajectoryPoint::at(scene.start));

		let added = grow(&mut tree, &scene, &generator(4, 2)).unwrap();

		assert_eq!(added, 4 + 16);
		assert_eq!(tree.len(), 1 + 20);
		assert_eq!(tree.levels().len(), 2);
		assert_eq!(grow(&mut tree, &scene, &generator(4, 2)).unwrap(), 0, "already grown");
	}

	#[test]
	fn test_grow_extends_retained_subtree() {
		let scene = scene(Vec::new());
		let mut tree = SegmentTree::new(TrajectoryPoint::at(scene.start));
		grow(&mut tree, &scene, &generator(3, 2)).unwrap();

		let first = tree.child(tree.root(), 0).unwrap();
		tree.reroot(first).unwrap();
		assert_eq!(tree.len(), 4);

		let added = grow(&mut tree, &scene, &generator(3, 2)).unwrap();
		assert_eq!(added, 9, "three new leaves below each retained child");
	}

	#[test]
	fn test_grow_skips_blocked_headings() {
		let scene = {
			let mut scene = scene(Vec::new());
			// Only known obstacles stop the generator.
			scene.belief.fill_box(
				DVec3::new(0.5, -0.2, 0.0),
				DVec3::new(0.8, 0.2, 2.0),
				nbv_planner::VoxelState::Occupied,
			);
			scene
		};
		let mut tree = SegmentTree::new(TrajectoryPoint::at(scene.start));

		let added = grow(&mut tree, &scene, &generator(4, 1)).unwrap();

		assert_eq!(added, 3, "the +x heading runs into the wall");
	}
}

//! Configuration parsing for the planning-cycle harness.

use anyhow::{Context, Result};
use nbv_planner::PlannerConfig;
use serde::Deserialize;
use std::path::Path;

/// Root configuration: synthetic scene, candidate generator and planner.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	/// Ground-truth world the robot explores.
	pub scene: SceneConfig,
	/// Candidate fan grown every cycle.
	#[serde(default)]
	pub generator: GeneratorConfig,
	/// Evaluator sections (`[planner.ray_caster]`, `[planner.gain]`, ...).
	pub planner: PlannerConfig,
}

/// Synthetic world description.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
	/// Map resolution in meters.
	pub voxel_size: f64,
	/// Start position [x, y, z].
	pub start: [f64; 3],
	/// Radius around the start that is known free before the first cycle.
	#[serde(default = "default_known_radius")]
	pub known_radius: f64,
	/// Free space of the world, min corner.
	pub world_min: [f64; 3],
	/// Free space of the world, max corner.
	pub world_max: [f64; 3],
	/// Occupied boxes inside the world.
	#[serde(default)]
	pub obstacles: Vec<BoxConfig>,
}

/// Axis-aligned box given by two corners.
#[derive(Debug, Deserialize)]
pub struct BoxConfig {
	pub min: [f64; 3],
	pub max: [f64; 3],
}

/// Fan generator parameters.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
	/// Headings per expanded segment.
	#[serde(default = "default_branches")]
	pub branches: usize,
	/// Tree depth kept below the root.
	#[serde(default = "default_depth")]
	pub depth: usize,
	/// Straight-line length of every segment.
	#[serde(default = "default_segment_length")]
	pub segment_length: f64,
	/// Trajectory points per segment, both ends included.
	#[serde(default = "default_points_per_segment")]
	pub points_per_segment: usize,
	/// Travel speed in m/s, sets trajectory timestamps.
	#[serde(default = "default_speed")]
	pub speed: f64,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			branches: default_branches(),
			depth: default_depth(),
			segment_length: default_segment_length(),
			points_per_segment: default_points_per_segment(),
			speed: default_speed(),
		}
	}
}

fn default_known_radius() -> f64 {
	1.0
}

fn default_branches() -> usize {
	6
}

fn default_depth() -> usize {
	2
}

fn default_segment_length() -> f64 {
	1.5
}

fn default_points_per_segment() -> usize {
	4
}

fn default_speed() -> f64 {
	1.0
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate configuration text.
	pub fn parse(content: &str) -> Result<Self> {
		let mut config: Config =
			toml::from_str(content).with_context(|| "Failed to parse config TOML")?;
		config.planner.assign_namespaces();

		let scene = &config.scene;
		if !(scene.voxel_size > 0.0) {
			anyhow::bail!("scene.voxel_size must be positive, got {}", scene.voxel_size);
		}
		if (0..3).any(|axis| scene.world_min[axis] > scene.world_max[axis]) {
			anyhow::bail!("scene.world_min must not exceed scene.world_max");
		}
		let generator = &config.generator;
		if generator.branches == 0 || generator.depth == 0 {
			anyhow::bail!("generator.branches and generator.depth must be at least 1");
		}
		if generator.points_per_segment < 2 {
			anyhow::bail!(
				"generator.points_per_segment must be at least 2, got {}",
				generator.points_per_segment
			);
		}
		if !(generator.segment_length > 0.0 && generator.speed > 0.0) {
			anyhow::bail!("generator.segment_length and generator.speed must be positive");
		}

		Ok(config)
	}
}

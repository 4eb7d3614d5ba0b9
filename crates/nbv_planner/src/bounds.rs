//! Bounding volume of interest that masks information gain.

use glam::DVec3;

use crate::config::{ConfigError, ParamMap};

/// Region whose voxels count towards information gain.
///
/// Voxels outside the volume contribute zero gain. An unconfigured volume
/// contains every point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum BoundingVolume {
	/// Every point is inside.
	#[default]
	Unbounded,
	/// Axis-aligned box, both corners inclusive.
	Aabb {
		/// Minimum corner.
		min: DVec3,
		/// Maximum corner.
		max: DVec3,
	},
}

impl BoundingVolume {
	/// Box between two corners; `min` must not exceed `max` on any axis.
	pub fn new(min: DVec3, max: DVec3) -> Self {
		debug_assert!(min.cmple(max).all(), "inverted bounding volume");
		Self::Aabb { min, max }
	}

	/// Read `x_min .. z_max` from a parameter section.
	///
	/// An empty section yields [`BoundingVolume::Unbounded`]. Once any extent
	/// is given, all six are required.
	pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
		if params.is_empty() {
			return Ok(Self::Unbounded);
		}

		let min = DVec3::new(
			params.get_f64("x_min")?,
			params.get_f64("y_min")?,
			params.get_f64("z_min")?,
		);
		let max = DVec3::new(
			params.get_f64("x_max")?,
			params.get_f64("y_max")?,
			params.get_f64("z_max")?,
		);

		for (axis, lo, hi) in [("x", min.x, max.x), ("y", min.y, max.y), ("z", min.z, max.z)] {
			if !(lo <= hi) {
				return Err(ConfigError::InvalidValue {
					key: params.qualified(&format!("{axis}_max")),
					reason: format!("{axis}_max ({hi}) must not be below {axis}_min ({lo})"),
				});
			}
		}

		Ok(Self::Aabb { min, max })
	}

	/// Whether a volume was actually configured.
	#[inline]
	pub fn is_bounded(&self) -> bool {
		matches!(self, Self::Aabb { .. })
	}

	/// Whether `point` lies inside, boundary included.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		match self {
			Self::Unbounded => true,
			Self::Aabb { min, max } => point.cmpge(*min).all() && point.cmple(*max).all(),
		}
	}
}

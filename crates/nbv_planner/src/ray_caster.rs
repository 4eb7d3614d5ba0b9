//! Visibility ray casting for a simple pinhole camera.
//!
//! The camera looks along the local +x axis of the pose orientation. Rays are
//! spread evenly in angle over both fields of view and marched in fixed steps
//! until they leave the sensor range or hit an occupied voxel:
//!
//! ```text
//!              fov_x
//!         ╲    ───    ╱
//!          ╲  ray i  ╱        t = 0, step, 2·step, ... < ray_length
//!           ╲   │   ╱
//!            ╲  │  ╱          sample ──► voxel center (dedup)
//!             ╲ │ ╱           occupied sample ends the ray (inclusive)
//!              ╲│╱
//!             camera ──► +x
//! ```
//!
//! Nearby rays revisit the same voxels; the result is deduplicated per call.
//! Sample count is `resolution_x * resolution_y * ray_length / ray_step`, which
//! bounds the latency of every gain evaluation.

use std::collections::HashSet;

use glam::{DQuat, DVec3, I64Vec3};

use crate::config::{ConfigError, ParamMap};
use crate::error::EvaluationError;
use crate::map::{voxel_center, voxel_index, MapQuery};

/// Quaternions shorter than this cannot be normalized into a rotation.
const MIN_ORIENTATION_NORM_SQUARED: f64 = 1e-12;

/// Camera model parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayCasterConfig {
  /// Maximum sensing range in world units.
  pub ray_length: f64,
  /// Focal length in pixels.
  pub focal_length: f64,
  /// Distance between samples along a ray.
  pub ray_step: f64,
  /// Horizontal ray count.
  pub resolution_x: u32,
  /// Vertical ray count.
  pub resolution_y: u32,
}

impl RayCasterConfig {
  /// Read the camera model from a parameter section.
  ///
  /// `focal_length` may be replaced by `field_of_view_x` (degrees), from which
  /// the focal length is derived using `resolution_x`.
  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    let ray_length = params.get_f64("ray_length")?;
    let ray_step = params.get_f64("ray_step")?;
    let resolution_x = params.get_u32("resolution_x")?;
    let resolution_y = params.get_u32("resolution_y")?;

    params.ensure(
      "ray_length",
      ray_length,
      ray_length.is_finite() && ray_length >= 0.0,
      "must be finite and >= 0",
    )?;
    params.ensure("ray_step", ray_step, ray_step.is_finite() && ray_step > 0.0, "must be finite and > 0")?;
    params.ensure("resolution_x", resolution_x, resolution_x > 0, "must be at least 1")?;
    params.ensure("resolution_y", resolution_y, resolution_y > 0, "must be at least 1")?;

    let focal_length = if params.contains("focal_length") || !params.contains("field_of_view_x") {
      let focal_length = params.get_f64("focal_length")?;
      params.ensure(
        "focal_length",
        focal_length,
        focal_length.is_finite() && focal_length > 0.0,
        "must be finite and > 0",
      )?
    } else {
      let fov_deg = params.get_f64("field_of_view_x")?;
      params.ensure(
        "field_of_view_x",
        fov_deg,
        fov_deg > 0.0 && fov_deg < 180.0,
        "must lie strictly between 0 and 180 degrees",
      )?;
      resolution_x as f64 / (2.0 * (fov_deg.to_radians() * 0.5).tan())
    };

    Ok(Self {
      ray_length,
      focal_length,
      ray_step,
      resolution_x,
      resolution_y,
    })
  }

  /// Upper bound on map queries for a single pose.
  pub fn sample_budget(&self) -> u64 {
    let steps = if self.ray_step > 0.0 {
      (self.ray_length / self.ray_step).ceil() as u64
    } else {
      0
    };
    u64::from(self.resolution_x) * u64::from(self.resolution_y) * steps
  }

  fn degenerate_reason(&self) -> Option<&'static str> {
    if self.resolution_x == 0 || self.resolution_y == 0 {
      Some("zero resolution")
    } else if !(self.ray_step.is_finite() && self.ray_step > 0.0) {
      Some("ray step must be positive")
    } else if !(self.focal_length.is_finite() && self.focal_length > 0.0) {
      Some("focal length must be positive")
    } else if !(self.ray_length.is_finite() && self.ray_length >= 0.0) {
      Some("ray length must be finite and non-negative")
    } else {
      None
    }
  }
}

impl Default for RayCasterConfig {
  fn default() -> Self {
    Self {
      ray_length: 5.0,
      focal_length: 320.0,
      ray_step: 0.1,
      resolution_x: 32,
      resolution_y: 24,
    }
  }
}

/// Finds the voxels visible from a pose.
#[derive(Clone, Debug)]
pub struct RayCaster {
  config: RayCasterConfig,
  field_of_view_x: f64,
  field_of_view_y: f64,
}

impl RayCaster {
  /// Create a ray caster, caching the field-of-view angles.
  ///
  /// Degenerate parameters are accepted here and reported by
  /// [`get_visible_voxels`](Self::get_visible_voxels).
  pub fn new(config: RayCasterConfig) -> Self {
    Self {
      config,
      field_of_view_x: field_of_view(config.resolution_x, config.focal_length),
      field_of_view_y: field_of_view(config.resolution_y, config.focal_length),
    }
  }

  pub fn config(&self) -> &RayCasterConfig {
    &self.config
  }

  /// Horizontal field of view in radians.
  pub fn field_of_view_x(&self) -> f64 {
    self.field_of_view_x
  }

  /// Vertical field of view in radians.
  pub fn field_of_view_y(&self) -> f64 {
    self.field_of_view_y
  }

  /// Unit ray directions in the camera frame, row-major over pixels.
  pub fn ray_directions(&self) -> impl Iterator<Item = DVec3> + '_ {
    let res_x = self.config.resolution_x;
    let res_y = self.config.resolution_y;
    (0..res_x).flat_map(move |i| {
      (0..res_y).map(move |j| {
        let yaw = self.field_of_view_x * (0.5 - (i as f64 + 0.5) / res_x as f64);
        let pitch = self.field_of_view_y * (0.5 - (j as f64 + 0.5) / res_y as f64);
        DVec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), pitch.sin())
      })
    })
  }

  /// Centers of all voxels visible from the pose.
  ///
  /// Every returned center lies within `ray_length` of `position` and no
  /// center lies behind the first occupied voxel of its ray.
  pub fn get_visible_voxels(
    &self,
    map: &dyn MapQuery,
    position: DVec3,
    orientation: DQuat,
  ) -> Result<Vec<DVec3>, EvaluationError> {
    let mut seen = HashSet::new();
    let mut visible = Vec::new();
    self.collect_visible_voxels(map, position, orientation, &mut seen, &mut visible)?;
    Ok(visible)
  }

  /// Accumulate visible voxel centers, skipping indices already in `seen`.
  ///
  /// Lets callers merge several poses into one deduplicated set.
  pub fn collect_visible_voxels(
    &self,
    map: &dyn MapQuery,
    position: DVec3,
    orientation: DQuat,
    seen: &mut HashSet<I64Vec3>,
    visible: &mut Vec<DVec3>,
  ) -> Result<(), EvaluationError> {
    if let Some(reason) = self.config.degenerate_reason() {
      return Err(EvaluationError::DegenerateCamera(reason));
    }
    if !position.is_finite() || !orientation.is_finite() {
      return Err(EvaluationError::DegenerateCamera("pose is not finite"));
    }
    if orientation.length_squared() < MIN_ORIENTATION_NORM_SQUARED {
      return Err(EvaluationError::DegenerateCamera("orientation is not a rotation"));
    }

    let voxel_size = map.voxel_size();
    let ray_length = self.config.ray_length;
    let ray_step = self.config.ray_step;
    let orientation = orientation.normalize();

    for local in self.ray_directions() {
      let direction = orientation * local;

      let mut step = 0u64;
      loop {
        // Multiply instead of accumulating so long rays do not drift.
        let distance = step as f64 * ray_step;
        if distance >= ray_length {
          break;
        }
        step += 1;

        let sample = position + direction * distance;
        let index = voxel_index(sample, voxel_size);
        let center = voxel_center(index, voxel_size);
        if center.distance(position) <= ray_length && seen.insert(index) {
          visible.push(center);
        }

        if map.query_voxel(sample).is_occupied() {
          break;
        }
      }
    }

    Ok(())
  }
}

fn field_of_view(resolution: u32, focal_length: f64) -> f64 {
  2.0 * (resolution as f64 / (2.0 * focal_length)).atan()
}

#[cfg(test)]
#[path = "ray_caster_test.rs"]
mod ray_caster_test;

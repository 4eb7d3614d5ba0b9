//! Map query interface.
//!
//! The volumetric map is an external collaborator. The evaluator only needs
//! per-point occupancy (plus an optional signed distance) and the voxel
//! resolution. The map is handed to every scoring pass as a read-only
//! capability, so implementations must tolerate concurrent queries.
//!
//! ```text
//!  voxel_index(p) = floor(p / voxel_size)
//!  voxel_center(i) = (i + 0.5) * voxel_size
//! ```

use glam::{DVec3, I64Vec3};

pub mod grid;
pub use grid::VoxelGrid;

/// Observation state of a single voxel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoxelState {
  /// Never observed.
  Unknown,
  /// Observed and traversable.
  Free,
  /// Observed and blocked.
  Occupied,
}

/// Result of a point query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelQuery {
  pub state: VoxelState,
  /// Signed distance to the nearest obstacle, if the map keeps a distance
  /// field. Negative inside obstacles.
  pub distance: Option<f64>,
}

impl VoxelQuery {
  pub const UNKNOWN: Self = Self {
    state: VoxelState::Unknown,
    distance: None,
  };

  pub fn new(state: VoxelState) -> Self {
    Self {
      state,
      distance: None,
    }
  }

  pub fn with_distance(mut self, distance: f64) -> Self {
    self.distance = Some(distance);
    self
  }

  /// Whether the voxel blocks line of sight.
  ///
  /// A negative distance counts as occupied even when the occupancy layer
  /// has not caught up.
  #[inline]
  pub fn is_occupied(&self) -> bool {
    self.state == VoxelState::Occupied || self.distance.is_some_and(|d| d < 0.0)
  }
}

/// Read-only access to the volumetric map.
pub trait MapQuery: Send + Sync {
  /// Occupancy and distance at a world-space point.
  fn query_voxel(&self, point: DVec3) -> VoxelQuery;

  /// Edge length of one voxel. Constant for a map instance.
  fn voxel_size(&self) -> f64;

  /// Edge length of one storage block. Constant for a map instance.
  fn block_size(&self) -> f64;
}

/// Integer index of the voxel containing `point`.
#[inline]
pub fn voxel_index(point: DVec3, voxel_size: f64) -> I64Vec3 {
  (point / voxel_size).floor().as_i64vec3()
}

/// World-space center of the voxel at `index`.
#[inline]
pub fn voxel_center(index: I64Vec3, voxel_size: f64) -> DVec3 {
  (index.as_dvec3() + DVec3::splat(0.5)) * voxel_size
}

/// Face-neighbour offsets.
pub const FACE_OFFSETS: [I64Vec3; 6] = [
  I64Vec3::new(-1, 0, 0), // -X
  I64Vec3::new(1, 0, 0),  // +X
  I64Vec3::new(0, -1, 0), // -Y
  I64Vec3::new(0, 1, 0),  // +Y
  I64Vec3::new(0, 0, -1), // -Z
  I64Vec3::new(0, 0, 1),  // +Z
];

//! VoxelGrid - sparse in-memory occupancy map.
//!
//! Stores only observed voxels; everything else reads as `Unknown`.
//! Used by tests, benchmarks and simulation harnesses that need a concrete
//! [`MapQuery`] without a full mapping stack.

use std::collections::HashMap;

use glam::{DVec3, I64Vec3};

use super::{voxel_center, voxel_index, MapQuery, VoxelQuery, VoxelState};

/// Voxels per block edge, used to report `block_size`.
pub const VOXELS_PER_SIDE: usize = 16;

/// Sparse occupancy grid keyed by voxel index.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
  voxel_size: f64,
  voxels: HashMap<I64Vec3, VoxelState>,
}

impl VoxelGrid {
  /// Create an empty grid where every voxel is unknown.
  ///
  /// # Panics
  /// Debug-asserts that `voxel_size` is positive.
  pub fn new(voxel_size: f64) -> Self {
    debug_assert!(voxel_size > 0.0, "voxel size must be positive");
    Self {
      voxel_size,
      voxels: HashMap::new(),
    }
  }

  /// Number of observed (non-unknown) voxels.
  pub fn observed_count(&self) -> usize {
    self.voxels.len()
  }

  /// Count of stored voxels in the given state.
  pub fn count(&self, state: VoxelState) -> usize {
    self.voxels.values().filter(|s| **s == state).count()
  }

  /// State of the voxel containing `point`.
  pub fn state_at(&self, point: DVec3) -> VoxelState {
    self.state_at_index(voxel_index(point, self.voxel_size))
  }

  /// State of the voxel at `index`.
  pub fn state_at_index(&self, index: I64Vec3) -> VoxelState {
    self
      .voxels
      .get(&index)
      .copied()
      .unwrap_or(VoxelState::Unknown)
  }

  /// Set the voxel containing `point`.
  pub fn set(&mut self, point: DVec3, state: VoxelState) {
    self.set_index(voxel_index(point, self.voxel_size), state);
  }

  /// Set the voxel at `index`. Setting `Unknown` forgets the voxel.
  pub fn set_index(&mut self, index: I64Vec3, state: VoxelState) {
    match state {
      VoxelState::Unknown => {
        self.voxels.remove(&index);
      }
      _ => {
        self.voxels.insert(index, state);
      }
    }
  }

  /// Set every voxel whose center lies in the box `[min, max]`.
  pub fn fill_box(&mut self, min: DVec3, max: DVec3, state: VoxelState) {
    let lo = voxel_index(min, self.voxel_size);
    let hi = voxel_index(max, self.voxel_size);
    for x in lo.x..=hi.x {
      for y in lo.y..=hi.y {
        for z in lo.z..=hi.z {
          let index = I64Vec3::new(x, y, z);
          let center = voxel_center(index, self.voxel_size);
          if center.cmpge(min).all() && center.cmple(max).all() {
            self.set_index(index, state);
          }
        }
      }
    }
  }

  /// Set every voxel whose center lies within `radius` of `center`.
  pub fn fill_sphere(&mut self, center: DVec3, radius: f64, state: VoxelState) {
    let lo = voxel_index(center - DVec3::splat(radius), self.voxel_size);
    let hi = voxel_index(center + DVec3::splat(radius), self.voxel_size);
    for x in lo.x..=hi.x {
      for y in lo.y..=hi.y {
        for z in lo.z..=hi.z {
          let index = I64Vec3::new(x, y, z);
          if voxel_center(index, self.voxel_size).distance(center) <= radius {
            self.set_index(index, state);
          }
        }
      }
    }
  }

  /// Record an observation of the voxel containing `point`.
  ///
  /// Occupied voxels stay occupied. Returns whether the stored state changed.
  pub fn observe(&mut self, point: DVec3, state: VoxelState) -> bool {
    let index = voxel_index(point, self.voxel_size);
    match self.state_at_index(index) {
      VoxelState::Occupied => false,
      current if current == state => false,
      _ => {
        self.set_index(index, state);
        true
      }
    }
  }
}

impl MapQuery for VoxelGrid {
  fn query_voxel(&self, point: DVec3) -> VoxelQuery {
    VoxelQuery::new(self.state_at(point))
  }

  fn voxel_size(&self) -> f64 {
    self.voxel_size
  }

  fn block_size(&self) -> f64 {
    self.voxel_size * VOXELS_PER_SIDE as f64
  }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod grid_test;

use super::*;
use crate::map::{VoxelGrid, VoxelQuery, VoxelState};

fn single_ray(ray_length: f64, ray_step: f64) -> RayCaster {
  RayCaster::new(RayCasterConfig {
    ray_length,
    focal_length: 1.0,
    ray_step,
    resolution_x: 1,
    resolution_y: 1,
  })
}

fn camera_origin() -> DVec3 {
  DVec3::splat(0.5)
}

/// Half-space map whose signed distance turns negative past `x = wall`.
struct DistanceWall {
  wall: f64,
}

impl MapQuery for DistanceWall {
  fn query_voxel(&self, point: DVec3) -> VoxelQuery {
    VoxelQuery::new(VoxelState::Unknown).with_distance(self.wall - point.x)
  }

  fn voxel_size(&self) -> f64 {
    1.0
  }

  fn block_size(&self) -> f64 {
    16.0
  }
}

// =========================================================================
// Camera model
// =========================================================================

/// Field of view follows from resolution and focal length.
#[test]
fn test_field_of_view_from_focal_length() {
  let caster = RayCaster::new(RayCasterConfig {
    focal_length: 8.0,
    resolution_x: 16,
    resolution_y: 8,
    ..Default::default()
  });

  assert!((caster.field_of_view_x() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
  assert!((caster.field_of_view_y() - 2.0 * 0.5f64.atan()).abs() < 1e-12);
}

/// A horizontal field of view in degrees is converted into a focal length.
#[test]
fn test_config_from_field_of_view() {
  let params = ParamMap::new("ray_caster")
    .with("ray_length", 4.0)
    .with("field_of_view_x", 90.0)
    .with("ray_step", 0.2)
    .with("resolution_x", 16)
    .with("resolution_y", 12);

  let config = RayCasterConfig::from_params(&params).unwrap();
  assert!((config.focal_length - 8.0).abs() < 1e-9, "got {}", config.focal_length);
}

/// Without focal length or field of view the focal length is reported missing.
#[test]
fn test_config_requires_focal_length() {
  let params = ParamMap::new("ray_caster")
    .with("ray_length", 4.0)
    .with("ray_step", 0.2)
    .with("resolution_x", 16)
    .with("resolution_y", 12);

  assert_eq!(
    RayCasterConfig::from_params(&params),
    Err(ConfigError::MissingKey("ray_caster.focal_length".to_string()))
  );
}

/// Out-of-range camera values are configuration errors.
#[test]
fn test_config_rejects_invalid_values() {
  let base = ParamMap::new("ray_caster")
    .with("ray_length", 4.0)
    .with("focal_length", 8.0)
    .with("ray_step", 0.2)
    .with("resolution_x", 16)
    .with("resolution_y", 12);

  for (key, value) in [
    ("ray_step", 0.0),
    ("focal_length", -1.0),
    ("ray_length", -0.5),
  ] {
    let params = base.clone().with(key, value);
    assert!(
      matches!(
        RayCasterConfig::from_params(&params),
        Err(ConfigError::InvalidValue { key: ref k, .. }) if *k == format!("ray_caster.{key}")
      ),
      "{key} = {value} should be rejected"
    );
  }

  let params = base.with("resolution_y", 0);
  assert!(RayCasterConfig::from_params(&params).is_err());
}

/// The sample budget counts rays times steps.
#[test]
fn test_sample_budget() {
  let config = RayCasterConfig {
    ray_length: 1.0,
    ray_step: 0.25,
    resolution_x: 4,
    resolution_y: 3,
    ..Default::default()
  };
  assert_eq!(config.sample_budget(), 48);
}

/// A single ray looks straight down the camera axis.
#[test]
fn test_single_ray_points_forward() {
  let directions: Vec<_> = single_ray(1.0, 0.1).ray_directions().collect();
  assert_eq!(directions, vec![DVec3::X]);
}

// =========================================================================
// Visibility
// =========================================================================

/// One ray toward an occupied voxel stops there, inclusively.
#[test]
fn test_single_ray_stops_at_occupied_voxel() {
  let mut map = VoxelGrid::new(1.0);
  map.set_index(I64Vec3::new(4, 0, 0), VoxelState::Occupied);

  let visible = single_ray(10.0, 0.25)
    .get_visible_voxels(&map, camera_origin(), DQuat::IDENTITY)
    .unwrap();

  let expected: Vec<_> = (0..5).map(|i| DVec3::new(i as f64 + 0.5, 0.5, 0.5)).collect();
  assert_eq!(visible, expected, "voxels up to and including the hit");
}

/// Negative signed distance blocks rays like occupancy does.
#[test]
fn test_negative_distance_stops_ray() {
  let map = DistanceWall { wall: 2.0 };

  let visible = single_ray(10.0, 0.25)
    .get_visible_voxels(&map, camera_origin(), DQuat::IDENTITY)
    .unwrap();

  let xs: Vec<_> = visible.iter().map(|c| c.x).collect();
  assert_eq!(xs, vec![0.5, 1.5, 2.5]);
}

/// Orientation rotates the camera axis.
#[test]
fn test_orientation_rotates_rays() {
  let map = VoxelGrid::new(1.0);
  let yaw_left = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2);

  let visible = single_ray(3.0, 0.5)
    .get_visible_voxels(&map, camera_origin(), yaw_left)
    .unwrap();

  assert!(!visible.is_empty());
  for center in &visible {
    assert!((center.x - 0.5).abs() < 1e-12, "ray should travel along +y, got {center}");
    assert!(center.y >= 0.5);
  }
}

/// A zero-length sensor sees nothing and does not fail.
#[test]
fn test_zero_ray_length_is_empty() {
  let map = VoxelGrid::new(1.0);
  let visible = single_ray(0.0, 0.1)
    .get_visible_voxels(&map, camera_origin(), DQuat::IDENTITY)
    .unwrap();
  assert!(visible.is_empty());
}

/// Degenerate camera models are reported instead of returning nothing.
#[test]
fn test_degenerate_camera_fails() {
  let map = VoxelGrid::new(1.0);

  let no_rays = RayCaster::new(RayCasterConfig {
    resolution_x: 0,
    ..Default::default()
  });
  assert!(matches!(
    no_rays.get_visible_voxels(&map, DVec3::ZERO, DQuat::IDENTITY),
    Err(EvaluationError::DegenerateCamera(_))
  ));

  let no_step = single_ray(1.0, 0.0);
  assert!(matches!(
    no_step.get_visible_voxels(&map, DVec3::ZERO, DQuat::IDENTITY),
    Err(EvaluationError::DegenerateCamera(_))
  ));

  let nan_pose = single_ray(1.0, 0.1);
  assert!(matches!(
    nan_pose.get_visible_voxels(&map, DVec3::NAN, DQuat::IDENTITY),
    Err(EvaluationError::DegenerateCamera(_))
  ));
}

/// A zero quaternion has no rotation to apply to the rays.
#[test]
fn test_zero_orientation_fails() {
  let map = VoxelGrid::new(1.0);
  let caster = single_ray(2.0, 0.1);

  let result = caster.get_visible_voxels(&map, camera_origin(), DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0));

  assert_eq!(
    result,
    Err(EvaluationError::DegenerateCamera("orientation is not a rotation"))
  );
}

/// Unnormalized orientations are accepted and behave like their unit form.
#[test]
fn test_scaled_orientation_matches_unit() {
  let map = VoxelGrid::new(0.5);
  let caster = single_ray(2.0, 0.1);
  let scaled = caster.get_visible_voxels(&map, camera_origin(), DQuat::IDENTITY * 2.0).unwrap();
  let expected = caster.get_visible_voxels(&map, camera_origin(), DQuat::IDENTITY).unwrap();

  assert_eq!(scaled, expected);
}

/// Returned centers never exceed the sensor range.
#[test]
fn test_visible_voxels_within_ray_length() {
  let mut map = VoxelGrid::new(0.25);
  map.fill_sphere(DVec3::new(2.0, 1.0, 0.0), 0.6, VoxelState::Occupied);

  let ray_length = 3.3;
  let caster = RayCaster::new(RayCasterConfig {
    ray_length,
    focal_length: 6.0,
    ray_step: 0.1,
    resolution_x: 12,
    resolution_y: 9,
  });
  let position = DVec3::new(0.1, 0.2, 0.3);

  let visible = caster.get_visible_voxels(&map, position, DQuat::IDENTITY).unwrap();
  assert!(!visible.is_empty());
  for center in &visible {
    assert!(
      center.distance(position) <= ray_length,
      "{center} lies {} away",
      center.distance(position)
    );
  }
}

/// Nothing behind a wall is visible.
#[test]
fn test_wall_occludes() {
  let mut map = VoxelGrid::new(1.0);
  map.fill_box(DVec3::new(3.0, -20.0, -20.0), DVec3::new(3.99, 20.0, 20.0), VoxelState::Occupied);

  let caster = RayCaster::new(RayCasterConfig {
    ray_length: 10.0,
    focal_length: 8.0,
    ray_step: 0.1,
    resolution_x: 8,
    resolution_y: 8,
  });

  let visible = caster
    .get_visible_voxels(&map, camera_origin(), DQuat::IDENTITY)
    .unwrap();

  assert!(visible.iter().any(|c| c.x == 3.5), "wall itself is visible");
  assert!(
    visible.iter().all(|c| c.x < 4.0),
    "no voxel behind the wall may be visible"
  );
}

/// Output is deduplicated and identical across calls.
#[test]
fn test_visible_voxels_deduplicated_and_deterministic() {
  let map = VoxelGrid::new(0.5);
  let caster = RayCaster::new(RayCasterConfig {
    ray_length: 2.0,
    focal_length: 4.0,
    ray_step: 0.05,
    resolution_x: 6,
    resolution_y: 4,
  });

  let first = caster.get_visible_voxels(&map, DVec3::ZERO, DQuat::IDENTITY).unwrap();
  let second = caster.get_visible_voxels(&map, DVec3::ZERO, DQuat::IDENTITY).unwrap();
  assert_eq!(first, second);

  let unique: HashSet<_> = first.iter().map(|c| voxel_index(*c, 0.5)).collect();
  assert_eq!(unique.len(), first.len(), "duplicates in output");
}

/// A shared `seen` set merges several poses without repeats.
#[test]
fn test_collect_merges_poses() {
  let map = VoxelGrid::new(1.0);
  let caster = single_ray(3.0, 0.5);
  let mut seen = HashSet::new();
  let mut visible = Vec::new();

  caster
    .collect_visible_voxels(&map, camera_origin(), DQuat::IDENTITY, &mut seen, &mut visible)
    .unwrap();
  let after_first = visible.len();
  caster
    .collect_visible_voxels(&map, camera_origin(), DQuat::IDENTITY, &mut seen, &mut visible)
    .unwrap();

  assert_eq!(visible.len(), after_first, "same pose adds nothing new");
}

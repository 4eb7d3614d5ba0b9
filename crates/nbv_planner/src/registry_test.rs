use super::*;
use crate::error::EvaluationError;
use crate::segment::TrajectorySegment;
use crate::strategies::ScoringContext;

const FULL_CONFIG: &str = r#"
[evaluator]
parallel = false

[ray_caster]
ray_length = 4.0
field_of_view_x = 90.0
ray_step = 0.2
resolution_x = 8
resolution_y = 6

[bounding_volume]
x_min = -10.0
x_max = 10.0
y_min = -10.0
y_max = 10.0
z_min = 0.0
z_max = 4.0

[gain]
type = "frontier"

[cost]
type = "segment_time"
accumulate = false

[value]
type = "exponential_discount"
cost_rate = 0.25

[selector]
type = "subsequent_best"

[updater]
type = "reroot"
refresh = "recompute"
"#;

#[derive(Debug)]
struct ConstantGain(f64);

impl GainComputer for ConstantGain {
  fn name(&self) -> &'static str {
    "constant"
  }

  fn compute_gain(
    &self,
    _segment: &TrajectorySegment,
    _ctx: &ScoringContext<'_>,
  ) -> Result<f64, EvaluationError> {
    Ok(self.0)
  }
}

/// All five kinds have built-in implementations.
#[test]
fn test_defaults_cover_every_kind() {
  let registry = StrategyRegistry::with_defaults();

  assert_eq!(registry.names(StrategyKind::Gain), vec!["frontier", "voxel_weight"]);
  assert_eq!(registry.names(StrategyKind::Cost), vec!["segment_length", "segment_time"]);
  assert_eq!(
    registry.names(StrategyKind::Value),
    vec!["efficiency", "exponential_discount", "linear"]
  );
  assert_eq!(
    registry.names(StrategyKind::Selector),
    vec!["immediate_best", "subsequent_best"]
  );
  assert_eq!(registry.names(StrategyKind::Updater), vec!["reroot", "reset_tree"]);
}

/// A complete configuration produces a complete evaluator.
#[test]
fn test_build_evaluator_from_toml() {
  let config = PlannerConfig::from_toml_str(FULL_CONFIG).unwrap();
  let evaluator = StrategyRegistry::with_defaults().build_evaluator(&config).unwrap();

  assert_eq!(evaluator.gain_computer().name(), "frontier");
  assert_eq!(evaluator.cost_computer().map(|c| c.name()), Some("segment_time"));
  assert_eq!(evaluator.value_computer().map(|v| v.name()), Some("exponential_discount"));
  assert_eq!(evaluator.next_selector().map(|s| s.name()), Some("subsequent_best"));
  assert_eq!(evaluator.evaluator_updater().map(|u| u.name()), Some("reroot"));
  assert!(!evaluator.is_parallel());
  assert!(evaluator.bounds().is_bounded());
  let caster = evaluator.ray_caster();
  assert!((caster.config().focal_length - 4.0).abs() < 1e-9);
  assert!((caster.field_of_view_x().to_degrees() - 90.0).abs() < 1e-9);
  assert!((caster.field_of_view_y() - 2.0 * 0.75f64.atan()).abs() < 1e-12);
  let budget = caster.config().sample_budget();
  assert!((960..=1008).contains(&budget), "8 x 6 rays of about 20 steps, got {budget}");
}

/// Unknown names are reported with their kind.
#[test]
fn test_unknown_strategy_name() {
  let registry = StrategyRegistry::with_defaults();
  let params = ParamMap::new("selector").with("type", "random");

  let err = registry.build_selector(&params).unwrap_err();
  assert_eq!(
    err,
    ConfigError::UnknownStrategy {
      kind: StrategyKind::Selector,
      name: "random".to_string(),
    }
  );
  assert_eq!(err.to_string(), "unknown selector strategy `random`");
}

/// A missing section fails on its `type` key.
#[test]
fn test_missing_section() {
  let content = FULL_CONFIG.replace("[updater]\ntype = \"reroot\"\nrefresh = \"recompute\"\n", "");
  let config = PlannerConfig::from_toml_str(&content).unwrap();

  assert_eq!(
    StrategyRegistry::with_defaults().build_evaluator(&config).unwrap_err(),
    ConfigError::MissingKey("updater.type".to_string())
  );
}

/// Camera keys are required.
#[test]
fn test_missing_ray_caster_key() {
  let content = FULL_CONFIG.replace("ray_step = 0.2\n", "");
  let config = PlannerConfig::from_toml_str(&content).unwrap();

  assert_eq!(
    StrategyRegistry::with_defaults().build_evaluator(&config).unwrap_err(),
    ConfigError::MissingKey("ray_caster.ray_step".to_string())
  );
}

/// Strategy parameter errors surface through the registry.
#[test]
fn test_strategy_parameter_error() {
  let content = FULL_CONFIG.replace("cost_rate = 0.25", "cost_rate = -1.0");
  let config = PlannerConfig::from_toml_str(&content).unwrap();

  assert!(matches!(
    StrategyRegistry::with_defaults().build_evaluator(&config),
    Err(ConfigError::InvalidValue { ref key, .. }) if key == "value.cost_rate"
  ));
}

/// Custom strategies plug in by name.
#[test]
fn test_register_custom_gain() {
  let mut registry = StrategyRegistry::with_defaults();
  registry.register_gain("constant", |p| Ok(Box::new(ConstantGain(p.get_f64_or("amount", 1.0)?))));

  let params = ParamMap::new("gain").with("type", "constant").with("amount", 4);
  let gain = registry.build_gain(&params).unwrap();
  assert_eq!(gain.name(), "constant");
  assert!(registry.names(StrategyKind::Gain).contains(&"constant"));
}

/// An empty registry knows nothing.
#[test]
fn test_empty_registry() {
  let registry = StrategyRegistry::new();
  let params = ParamMap::new("gain").with("type", "voxel_weight");
  assert!(matches!(
    registry.build_gain(&params),
    Err(ConfigError::UnknownStrategy { kind: StrategyKind::Gain, .. })
  ));
}

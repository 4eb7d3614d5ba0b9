//! StrategyRegistry - builds strategies and evaluators from configuration.
//!
//! Every strategy section names its implementation with a `type` key. The
//! registry maps `(kind, name)` to a factory that reads the remaining keys of
//! the section. Custom strategies are added with the `register_*` methods and
//! need no change to the evaluator.

use std::collections::BTreeMap;
use std::fmt;

use crate::bounds::BoundingVolume;
use crate::config::{ConfigError, ParamMap, PlannerConfig};
use crate::evaluator::TrajectoryEvaluator;
use crate::ray_caster::{RayCaster, RayCasterConfig};
use crate::strategies::{
  CostComputer, Efficiency, EvaluatorUpdater, ExponentialDiscount, Frontier, GainComputer,
  ImmediateBest, Linear, NextSelector, ResetTree, Reroot, SegmentLength, SegmentTime,
  StrategyKind, SubsequentBest, ValueComputer, VoxelWeight,
};

type Factory<T> = Box<dyn Fn(&ParamMap) -> Result<Box<T>, ConfigError> + Send + Sync>;

/// Name-keyed factories for every strategy kind.
#[derive(Default)]
pub struct StrategyRegistry {
  gains: BTreeMap<String, Factory<dyn GainComputer>>,
  costs: BTreeMap<String, Factory<dyn CostComputer>>,
  values: BTreeMap<String, Factory<dyn ValueComputer>>,
  selectors: BTreeMap<String, Factory<dyn NextSelector>>,
  updaters: BTreeMap<String, Factory<dyn EvaluatorUpdater>>,
}

impl StrategyRegistry {
  /// Registry with no strategies.
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry with every built-in strategy.
  pub fn with_defaults() -> Self {
    let mut registry = Self::new();

    registry.register_gain(VoxelWeight::NAME, |p| Ok(Box::new(VoxelWeight::from_params(p)?)));
    registry.register_gain(Frontier::NAME, |p| Ok(Box::new(Frontier::from_params(p)?)));

    registry.register_cost(SegmentLength::NAME, |p| Ok(Box::new(SegmentLength::from_params(p)?)));
    registry.register_cost(SegmentTime::NAME, |p| Ok(Box::new(SegmentTime::from_params(p)?)));

    registry.register_value(Linear::NAME, |p| Ok(Box::new(Linear::from_params(p)?)));
    registry.register_value(ExponentialDiscount::NAME, |p| {
      Ok(Box::new(ExponentialDiscount::from_params(p)?))
    });
    registry.register_value(Efficiency::NAME, |p| Ok(Box::new(Efficiency::from_params(p)?)));

    registry.register_selector(ImmediateBest::NAME, |_| Ok(Box::new(ImmediateBest)));
    registry.register_selector(SubsequentBest::NAME, |_| Ok(Box::new(SubsequentBest)));

    registry.register_updater(ResetTree::NAME, |_| Ok(Box::new(ResetTree)));
    registry.register_updater(Reroot::NAME, |p| Ok(Box::new(Reroot::from_params(p)?)));

    registry
  }

  // ===========================================================================
  // Registration
  // ===========================================================================

  pub fn register_gain<F>(&mut self, name: &str, factory: F)
  where
    F: Fn(&ParamMap) -> Result<Box<dyn GainComputer>, ConfigError> + Send + Sync + 'static,
  {
    self.gains.insert(name.to_string(), Box::new(factory));
  }

  pub fn register_cost<F>(&mut self, name: &str, factory: F)
  where
    F: Fn(&ParamMap) -> Result<Box<dyn CostComputer>, ConfigError> + Send + Sync + 'static,
  {
    self.costs.insert(name.to_string(), Box::new(factory));
  }

  pub fn register_value<F>(&mut self, name: &str, factory: F)
  where
    F: Fn(&ParamMap) -> Result<Box<dyn ValueComputer>, ConfigError> + Send + Sync + 'static,
  {
    self.values.insert(name.to_string(), Box::new(factory));
  }

  pub fn register_selector<F>(&mut self, name: &str, factory: F)
  where
    F: Fn(&ParamMap) -> Result<Box<dyn NextSelector>, ConfigError> + Send + Sync + 'static,
  {
    self.selectors.insert(name.to_string(), Box::new(factory));
  }

  pub fn register_updater<F>(&mut self, name: &str, factory: F)
  where
    F: Fn(&ParamMap) -> Result<Box<dyn EvaluatorUpdater>, ConfigError> + Send + Sync + 'static,
  {
    self.updaters.insert(name.to_string(), Box::new(factory));
  }

  /// Registered names for one kind, sorted.
  pub fn names(&self, kind: StrategyKind) -> Vec<&str> {
    match kind {
      StrategyKind::Gain => self.gains.keys().map(String::as_str).collect(),
      StrategyKind::Cost => self.costs.keys().map(String::as_str).collect(),
      StrategyKind::Value => self.values.keys().map(String::as_str).collect(),
      StrategyKind::Selector => self.selectors.keys().map(String::as_str).collect(),
      StrategyKind::Updater => self.updaters.keys().map(String::as_str).collect(),
    }
  }

  // ===========================================================================
  // Construction
  // ===========================================================================

  pub fn build_gain(&self, params: &ParamMap) -> Result<Box<dyn GainComputer>, ConfigError> {
    build(StrategyKind::Gain, &self.gains, params)
  }

  pub fn build_cost(&self, params: &ParamMap) -> Result<Box<dyn CostComputer>, ConfigError> {
    build(StrategyKind::Cost, &self.costs, params)
  }

  pub fn build_value(&self, params: &ParamMap) -> Result<Box<dyn ValueComputer>, ConfigError> {
    build(StrategyKind::Value, &self.values, params)
  }

  pub fn build_selector(&self, params: &ParamMap) -> Result<Box<dyn NextSelector>, ConfigError> {
    build(StrategyKind::Selector, &self.selectors, params)
  }

  pub fn build_updater(&self, params: &ParamMap) -> Result<Box<dyn EvaluatorUpdater>, ConfigError> {
    build(StrategyKind::Updater, &self.updaters, params)
  }

  /// Build a fully configured evaluator. Every strategy section is required.
  pub fn build_evaluator(&self, config: &PlannerConfig) -> Result<TrajectoryEvaluator, ConfigError> {
    let ray_caster = RayCaster::new(RayCasterConfig::from_params(&config.ray_caster)?);
    let bounds = BoundingVolume::from_params(&config.bounding_volume)?;
    let parallel = config.evaluator.get_bool_or("parallel", true)?;

    let evaluator = TrajectoryEvaluator::new(self.build_gain(&config.gain)?, ray_caster)
      .with_cost(self.build_cost(&config.cost)?)
      .with_value(self.build_value(&config.value)?)
      .with_selector(self.build_selector(&config.selector)?)
      .with_updater(self.build_updater(&config.updater)?)
      .with_bounds(bounds)
      .with_parallel(parallel);

    let caster = evaluator.ray_caster();
    tracing::info!(
      fov_x_deg = caster.field_of_view_x().to_degrees(),
      fov_y_deg = caster.field_of_view_y().to_degrees(),
      samples_per_pose = caster.config().sample_budget(),
      "ray caster ready"
    );
    tracing::info!(
      gain = evaluator.gain_computer().name(),
      cost = config.cost.strategy_name()?,
      value = config.value.strategy_name()?,
      selector = config.selector.strategy_name()?,
      updater = config.updater.strategy_name()?,
      bounded = bounds.is_bounded(),
      parallel,
      "built trajectory evaluator"
    );
    Ok(evaluator)
  }
}

fn build<T: ?Sized>(
  kind: StrategyKind,
  factories: &BTreeMap<String, Factory<T>>,
  params: &ParamMap,
) -> Result<Box<T>, ConfigError> {
  let name = params.strategy_name()?;
  let factory = factories
    .get(name)
    .ok_or_else(|| ConfigError::UnknownStrategy {
      kind,
      name: name.to_string(),
    })?;
  factory(params)
}

impl fmt::Debug for StrategyRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StrategyRegistry")
      .field("gain", &self.names(StrategyKind::Gain))
      .field("cost", &self.names(StrategyKind::Cost))
      .field("value", &self.names(StrategyKind::Value))
      .field("selector", &self.names(StrategyKind::Selector))
      .field("updater", &self.names(StrategyKind::Updater))
      .finish()
  }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

//! Planner configuration: flat per-component parameter maps.
//!
//! Each component reads its own [`ParamMap`] section. A `PlannerConfig` is
//! usually loaded from TOML:
//!
//! ```toml
//! [ray_caster]
//! ray_length = 5.0
//! focal_length = 8.0
//! ray_step = 0.1
//! resolution_x = 16
//! resolution_y = 12
//!
//! [gain]
//! type = "voxel_weight"
//!
//! [cost]
//! type = "segment_length"
//! accumulate = true
//!
//! [value]
//! type = "linear"
//!
//! [selector]
//! type = "immediate_best"
//!
//! [updater]
//! type = "reroot"
//! refresh = "invalidate"
//! ```
//!
//! Required keys never fall back to a default: a missing key fails with
//! [`ConfigError::MissingKey`] naming `section.key`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::strategies::StrategyKind;

/// Key naming the strategy implementation inside a strategy section.
pub const STRATEGY_TYPE_KEY: &str = "type";

/// Configuration failure. Fatal at planner start-up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
  /// A required key is absent.
  #[error("missing required parameter `{0}`")]
  MissingKey(String),

  /// A key is present with the wrong scalar type.
  #[error("parameter `{key}` must be {expected}")]
  WrongType {
    /// Fully qualified key.
    key: String,
    /// Human readable expected type.
    expected: &'static str,
  },

  /// A key is present but its value is out of range.
  #[error("invalid value for `{key}`: {reason}")]
  InvalidValue {
    /// Fully qualified key.
    key: String,
    /// Why the value was rejected.
    reason: String,
  },

  /// No factory is registered under the requested name.
  #[error("unknown {kind} strategy `{name}`")]
  UnknownStrategy {
    /// Strategy interface that was requested.
    kind: StrategyKind,
    /// Name given in the configuration.
    name: String,
  },

  /// The configuration file could not be read.
  #[error("failed to read config file {path}: {message}")]
  Io {
    /// File path.
    path: String,
    /// Underlying I/O error message.
    message: String,
  },

  /// The configuration file is not valid TOML or has the wrong shape.
  #[error("failed to parse config: {0}")]
  Parse(String),
}

// =============================================================================
// ParamValue / ParamMap
// =============================================================================

/// Scalar parameter value.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
}

impl From<bool> for ParamValue {
  fn from(v: bool) -> Self {
    ParamValue::Bool(v)
  }
}

impl From<i32> for ParamValue {
  fn from(v: i32) -> Self {
    ParamValue::Int(v.into())
  }
}

impl From<i64> for ParamValue {
  fn from(v: i64) -> Self {
    ParamValue::Int(v)
  }
}

impl From<u32> for ParamValue {
  fn from(v: u32) -> Self {
    ParamValue::Int(v.into())
  }
}

impl From<f64> for ParamValue {
  fn from(v: f64) -> Self {
    ParamValue::Float(v)
  }
}

impl From<&str> for ParamValue {
  fn from(v: &str) -> Self {
    ParamValue::Str(v.to_string())
  }
}

impl From<String> for ParamValue {
  fn from(v: String) -> Self {
    ParamValue::Str(v)
  }
}

/// Flat string-keyed parameters for one component.
///
/// The namespace only prefixes keys in error messages.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "BTreeMap<String, ParamValue>")]
pub struct ParamMap {
  namespace: String,
  values: BTreeMap<String, ParamValue>,
}

impl From<BTreeMap<String, ParamValue>> for ParamMap {
  fn from(values: BTreeMap<String, ParamValue>) -> Self {
    Self {
      namespace: String::new(),
      values,
    }
  }
}

impl ParamMap {
  /// Create an empty section.
  pub fn new(namespace: impl Into<String>) -> Self {
    Self {
      namespace: namespace.into(),
      values: BTreeMap::new(),
    }
  }

  /// Builder-style insert.
  pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
    self.insert(key, value);
    self
  }

  /// Insert or replace a value.
  pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
    self.values.insert(key.to_string(), value.into());
  }

  pub fn namespace(&self) -> &str {
    &self.namespace
  }

  pub(crate) fn set_namespace(&mut self, namespace: &str) {
    self.namespace = namespace.to_string();
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn contains(&self, key: &str) -> bool {
    self.values.contains_key(key)
  }

  pub fn get(&self, key: &str) -> Option<&ParamValue> {
    self.values.get(key)
  }

  /// Key prefixed with the section namespace, for error messages.
  pub fn qualified(&self, key: &str) -> String {
    if self.namespace.is_empty() {
      key.to_string()
    } else {
      format!("{}.{}", self.namespace, key)
    }
  }

  fn require(&self, key: &str) -> Result<&ParamValue, ConfigError> {
    self
      .values
      .get(key)
      .ok_or_else(|| ConfigError::MissingKey(self.qualified(key)))
  }

  fn wrong_type(&self, key: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
      key: self.qualified(key),
      expected,
    }
  }

  /// Required floating point value. Integers are widened.
  pub fn get_f64(&self, key: &str) -> Result<f64, ConfigError> {
    match self.require(key)? {
      ParamValue::Float(v) => Ok(*v),
      ParamValue::Int(v) => Ok(*v as f64),
      _ => Err(self.wrong_type(key, "a number")),
    }
  }

  /// Optional floating point value.
  pub fn get_f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
    if self.contains(key) {
      self.get_f64(key)
    } else {
      Ok(default)
    }
  }

  /// Required unsigned integer value.
  pub fn get_u32(&self, key: &str) -> Result<u32, ConfigError> {
    match self.require(key)? {
      ParamValue::Int(v) => u32::try_from(*v).map_err(|_| ConfigError::InvalidValue {
        key: self.qualified(key),
        reason: format!("{v} is outside 0..={}", u32::MAX),
      }),
      _ => Err(self.wrong_type(key, "a non-negative integer")),
    }
  }

  /// Optional boolean value.
  pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
    match self.values.get(key) {
      None => Ok(default),
      Some(ParamValue::Bool(v)) => Ok(*v),
      Some(_) => Err(self.wrong_type(key, "a boolean")),
    }
  }

  /// Required string value.
  pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
    match self.require(key)? {
      ParamValue::Str(v) => Ok(v.as_str()),
      _ => Err(self.wrong_type(key, "a string")),
    }
  }

  /// Optional string value.
  pub fn get_str_or<'a>(&'a self, key: &str, default: &'a str) -> Result<&'a str, ConfigError> {
    if self.contains(key) {
      self.get_str(key)
    } else {
      Ok(default)
    }
  }

  /// Optional value that must be finite and strictly positive.
  pub fn get_positive_f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
    let value = self.get_f64_or(key, default)?;
    self.ensure(key, value, value.is_finite() && value > 0.0, "must be finite and > 0")
  }

  /// Optional value that must be finite and non-negative.
  pub fn get_non_negative_f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
    let value = self.get_f64_or(key, default)?;
    self.ensure(key, value, value.is_finite() && value >= 0.0, "must be finite and >= 0")
  }

  /// Pass `value` through, or report it as invalid for `key`.
  pub fn ensure<T: std::fmt::Display>(
    &self,
    key: &str,
    value: T,
    ok: bool,
    reason: &str,
  ) -> Result<T, ConfigError> {
    if ok {
      Ok(value)
    } else {
      Err(ConfigError::InvalidValue {
        key: self.qualified(key),
        reason: format!("{value} {reason}"),
      })
    }
  }

  /// Name of the strategy implementation selected by this section.
  pub fn strategy_name(&self) -> Result<&str, ConfigError> {
    self.get_str(STRATEGY_TYPE_KEY)
  }
}

// =============================================================================
// PlannerConfig
// =============================================================================

/// Parameter sections for every evaluator component.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlannerConfig {
  /// Evaluator-wide switches (`parallel`).
  #[serde(default)]
  pub evaluator: ParamMap,
  /// Camera model for visibility ray casting.
  #[serde(default)]
  pub ray_caster: ParamMap,
  /// Extents of the volume of interest. Empty = unbounded.
  #[serde(default)]
  pub bounding_volume: ParamMap,
  /// Gain strategy.
  #[serde(default)]
  pub gain: ParamMap,
  /// Cost strategy.
  #[serde(default)]
  pub cost: ParamMap,
  /// Value strategy.
  #[serde(default)]
  pub value: ParamMap,
  /// Next-best selection strategy.
  #[serde(default)]
  pub selector: ParamMap,
  /// Tree update strategy.
  #[serde(default)]
  pub updater: ParamMap,
}

impl PlannerConfig {
  /// Parse a configuration from TOML text.
  pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
    let mut config: PlannerConfig =
      toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.assign_namespaces();
    Ok(config)
  }

  /// Load a configuration from a TOML file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;
    Self::from_toml_str(&content)
  }

  /// Name every section after its field so errors read `section.key`.
  pub fn assign_namespaces(&mut self) {
    self.evaluator.set_namespace("evaluator");
    self.ray_caster.set_namespace("ray_caster");
    self.bounding_volume.set_namespace("bounding_volume");
    self.gain.set_namespace("gain");
    self.cost.set_namespace("cost");
    self.value.set_namespace("value");
    self.selector.set_namespace("selector");
    self.updater.set_namespace("updater");
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

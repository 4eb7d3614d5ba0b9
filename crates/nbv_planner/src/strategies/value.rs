//! Value strategies combining gain and cost into one utility.

use super::ValueComputer;
use crate::config::{ConfigError, ParamMap};
use crate::segment::ScoredSegment;

/// `gain_weight * gain - cost_weight * cost`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Linear {
  gain_weight: f64,
  cost_weight: f64,
}

impl Linear {
  pub const NAME: &'static str = "linear";

  pub fn new(gain_weight: f64, cost_weight: f64) -> Self {
    debug_assert!(gain_weight > 0.0 && cost_weight > 0.0, "weights must be positive");
    Self {
      gain_weight,
      cost_weight,
    }
  }

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    Ok(Self::new(
      params.get_positive_f64_or("gain_weight", 1.0)?,
      params.get_positive_f64_or("cost_weight", 1.0)?,
    ))
  }
}

impl Default for Linear {
  fn default() -> Self {
    Self::new(1.0, 1.0)
  }
}

impl ValueComputer for Linear {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn compute_value(&self, scored: &ScoredSegment<'_>) -> f64 {
    self.gain_weight * scored.gain() - self.cost_weight * scored.cost()
  }
}

/// `gain * exp(-cost_rate * cost)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialDiscount {
  cost_rate: f64,
}

impl ExponentialDiscount {
  pub const NAME: &'static str = "exponential_discount";

  pub fn new(cost_rate: f64) -> Self {
    debug_assert!(cost_rate > 0.0, "cost rate must be positive");
    Self { cost_rate }
  }

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    Ok(Self::new(params.get_positive_f64_or("cost_rate", 1.0)?))
  }
}

impl ValueComputer for ExponentialDiscount {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn compute_value(&self, scored: &ScoredSegment<'_>) -> f64 {
    scored.gain() * (-self.cost_rate * scored.cost()).exp()
  }
}

/// Gain per unit of cost: `gain / (1 + cost_weight * cost)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Efficiency {
  cost_weight: f64,
}

impl Efficiency {
  pub const NAME: &'static str = "efficiency";

  pub fn new(cost_weight: f64) -> Self {
    debug_assert!(cost_weight > 0.0, "cost weight must be positive");
    Self { cost_weight }
  }

  pub fn from_params(params: &ParamMap) -> Result<Self, ConfigError> {
    Ok(Self::new(params.get_positive_f64_or("cost_weight", 1.0)?))
  }
}

impl ValueComputer for Efficiency {
  fn name(&self) -> &'static str {
    Self::NAME
  }

  fn compute_value(&self, scored: &ScoredSegment<'_>) -> f64 {
    scored.gain() / (1.0 + self.cost_weight * scored.cost())
  }
}

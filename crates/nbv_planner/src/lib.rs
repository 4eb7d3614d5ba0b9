//! nbv_planner - Next-best-view trajectory evaluation
//!
//! This crate is the decision core of an exploration planner. A robot keeps a
//! tree of candidate trajectories rooted at its current pose. Every planning
//! cycle the evaluator scores each candidate by expected information gain
//! against travel cost, picks the most valuable child of the root, and after
//! execution reconciles the tree for the next cycle.
//!
//! ```text
//!   generator ──add_child──► SegmentTree
//!                               │
//!          score_tree ◄─────────┤   gain (ray casting against MapQuery)
//!                               │   cost (level by level)
//!                               │   value
//!          select_next_best ◄───┤
//!                               │
//!          update_segments ◄────┘   reroot / reset after execution
//! ```
//!
//! # Features
//!
//! - **Pluggable strategies**: gain, cost, value, selection and update are
//!   traits chosen by name from configuration
//! - **Visibility ray casting**: pinhole camera model sampled against any
//!   [`MapQuery`] implementation
//! - **Arena tree**: generational segment ids, cheap re-rooting and pruning
//! - **Parallel scoring**: rayon batches for independent segments
//!
//! # Example
//!
//! ```ignore
//! use nbv_planner::{PlannerConfig, StrategyRegistry, SegmentTree, TrajectoryPoint, VoxelGrid};
//!
//! let config = PlannerConfig::load("planner.toml".as_ref())?;
//! let evaluator = StrategyRegistry::with_defaults().build_evaluator(&config)?;
//! let map = VoxelGrid::new(0.2);
//!
//! let mut tree = SegmentTree::new(TrajectoryPoint::at(glam::DVec3::ZERO));
//! // ... grow candidates with tree.add_child(..) ...
//! evaluator.score_tree(&mut tree, &map)?;
//! let best = evaluator.select_next_best(&tree, tree.root())?;
//! ```

pub mod bounds;
pub mod config;
pub mod error;

pub use bounds::BoundingVolume;
pub use config::{ConfigError, ParamMap, ParamValue, PlannerConfig};
pub use error::EvaluationError;

// Map interface and in-memory grid
pub mod map;
pub use map::{MapQuery, VoxelGrid, VoxelQuery, VoxelState};

// Visibility
pub mod ray_caster;
pub use ray_caster::{RayCaster, RayCasterConfig};

// Candidate tree
pub mod segment;
pub use segment::{
  ScoreStage, ScoredSegment, SegmentId, SegmentTree, TrajectoryPoint, TrajectorySegment,
};

// Strategy interfaces and built-in implementations
pub mod strategies;
pub use strategies::{
  CostComputer, EvaluatorUpdater, GainComputer, NextSelector, ScoringContext, StrategyKind,
  UpdateOutcome, ValueComputer,
};

pub mod evaluator;
pub use evaluator::{ScoringStats, TrajectoryEvaluator};

// Component factory
pub mod registry;
pub use registry::StrategyRegistry;

#[cfg(test)]
pub(crate) mod test_utils;
